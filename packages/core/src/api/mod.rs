//! HTTP surface of the dashboard.
//!
//! Every view route takes a city slug (`hanoi`, `hochiminh`, `danang`) and
//! renders fresh from the warehouse.

pub mod forecast;
pub mod health;
pub mod overview;
pub mod weather;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, StatusCode},
    middleware,
    response::{Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::dashboard::DashboardService;
use crate::error::AppError;
use crate::metrics::{track_http, AppMetrics};
use crate::weather::City;

/// Shared state of the view routes.
pub type DashboardState = Arc<DashboardService>;

pub const DEFAULT_DAYS: u32 = 7;
pub const MAX_DAYS: u32 = 30;

/// `?days=N` on windowed views.
#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    pub days: Option<u32>,
}

impl DaysQuery {
    pub fn resolve(&self) -> Result<u32, AppError> {
        match self.days {
            None => Ok(DEFAULT_DAYS),
            Some(days) if (1..=MAX_DAYS).contains(&days) => Ok(days),
            Some(days) => Err(AppError::BadRequest(format!(
                "days must be between 1 and {}, got {}",
                MAX_DAYS, days
            ))),
        }
    }
}

pub fn parse_city(slug: &str) -> Result<City, AppError> {
    slug.parse::<City>().map_err(AppError::NotFound)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CityInfo {
    pub slug: String,
    pub name: String,
    pub warehouse_name: String,
}

pub async fn list_cities() -> Json<Vec<CityInfo>> {
    Json(
        City::ALL
            .iter()
            .map(|city| CityInfo {
                slug: city.slug().to_string(),
                name: city.display_name().to_string(),
                warehouse_name: city.warehouse_name().to_string(),
            })
            .collect(),
    )
}

fn metrics_response(metrics: &AppMetrics) -> Response {
    match metrics.render() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
            .body(Body::from(body)),
        Err(err) => {
            tracing::error!("Failed to render metrics: {}", err);
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::from("metrics error"))
        }
    }
    .unwrap_or_default()
}

/// Assemble the full application router.
pub fn create_router(service: DashboardState, metrics: Arc<AppMetrics>) -> Router {
    let metrics_for_handler = metrics.clone();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/health", get(health::health))
        .route(
            "/metrics",
            get(move || {
                let m = metrics_for_handler.clone();
                async move { metrics_response(&m) }
            }),
        )
        .route("/cities", get(list_cities))
        .merge(weather::create_weather_router(service.clone()))
        .merge(forecast::create_forecast_router(service.clone()))
        .merge(overview::create_overview_router(service))
        .layer(middleware::from_fn_with_state(metrics, track_http))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
