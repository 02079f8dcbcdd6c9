//! Observed weather views.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};

use super::{parse_city, DashboardState, DaysQuery};
use crate::dashboard::{DailyView, HourlyView};
use crate::error::AppError;

pub fn create_weather_router(state: DashboardState) -> Router {
    Router::new()
        .route("/weather/:city/daily", get(daily_weather))
        .route("/weather/:city/hourly", get(hourly_weather))
        .with_state(state)
}

/// Last 30 days of daily facts with the summary cards.
async fn daily_weather(
    State(service): State<DashboardState>,
    Path(city): Path<String>,
) -> Result<Json<DailyView>, AppError> {
    let city = parse_city(&city)?;
    Ok(Json(service.daily(city).await?))
}

async fn hourly_weather(
    State(service): State<DashboardState>,
    Path(city): Path<String>,
    Query(params): Query<DaysQuery>,
) -> Result<Json<HourlyView>, AppError> {
    let city = parse_city(&city)?;
    let days = params.resolve()?;
    Ok(Json(service.hourly(city, days).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::dashboard::test_support::{populated, service, MockWarehouse};

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn daily_returns_rows_and_summary() {
        let app = create_weather_router(Arc::new(service(populated())));
        let (status, json) = get_json(app, "/weather/hanoi/daily").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["city"], "ha_noi");
        assert_eq!(json["days"].as_array().unwrap().len(), 2);
        assert_eq!(json["days"][0]["date"], "2024-01-01");
        assert_eq!(json["summary"]["max_temperature"], 27.0);
    }

    #[tokio::test]
    async fn hourly_serializes_vietnam_offset() {
        let app = create_weather_router(Arc::new(service(populated())));
        let (status, json) = get_json(app, "/weather/hanoi/hourly?days=2").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["days"], 2);
        assert_eq!(json["hours"][0]["timestamp"], "2024-01-01T09:00:00+07:00");
    }

    #[tokio::test]
    async fn hourly_rejects_out_of_range_days() {
        let app = create_weather_router(Arc::new(service(populated())));
        let (status, json) = get_json(app, "/weather/hanoi/hourly?days=45").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn unknown_city_is_404() {
        let app = create_weather_router(Arc::new(service(populated())));
        let (status, _) = get_json(app, "/weather/hue/daily").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn warehouse_failure_is_502() {
        let app = create_weather_router(Arc::new(service(MockWarehouse::default())));
        let (status, json) = get_json(app, "/weather/danang/daily").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(json["error"].as_str().unwrap().contains("daily_weather"));
    }
}
