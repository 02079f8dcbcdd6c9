use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};

use super::{parse_city, DashboardState};
use crate::dashboard::OverviewView;
use crate::error::AppError;

pub fn create_overview_router(state: DashboardState) -> Router {
    Router::new()
        .route("/overview/:city", get(city_overview))
        .with_state(state)
}

async fn city_overview(
    State(service): State<DashboardState>,
    Path(city): Path<String>,
) -> Result<Json<OverviewView>, AppError> {
    let city = parse_city(&city)?;
    Ok(Json(service.overview(city).await?))
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

    use crate::dashboard::test_support::{populated, service};

    #[tokio::test]
    async fn overview_returns_every_panel() {
        let app = create_overview_router(Arc::new(service(populated())));
        let resp = app
            .oneshot(Request::builder().uri("/overview/hanoi").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["accuracy_days"], 3);
        assert_eq!(json["accuracy"]["matched"], 2);
        assert!(json["rain_gauge"]["risk_label"].is_string());
        assert_eq!(json["daily_summary"]["days"], 2);
        assert!(json["temperature_forecast"]["forecasts"].is_array());
    }
}
