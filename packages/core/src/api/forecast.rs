//! LSTM forecast views and forecast accuracy.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};

use super::{parse_city, DashboardState, DaysQuery};
use crate::dashboard::{RainView, TemperatureForecastView};
use crate::error::AppError;
use crate::weather::Reconciliation;

pub fn create_forecast_router(state: DashboardState) -> Router {
    Router::new()
        .route("/forecast/:city/temperature", get(temperature_forecast))
        .route("/forecast/:city/rain", get(rain_forecast))
        .route("/forecast/:city/accuracy", get(forecast_accuracy))
        .with_state(state)
}

async fn temperature_forecast(
    State(service): State<DashboardState>,
    Path(city): Path<String>,
) -> Result<Json<TemperatureForecastView>, AppError> {
    let city = parse_city(&city)?;
    Ok(Json(service.temperature_forecast(city).await?))
}

async fn rain_forecast(
    State(service): State<DashboardState>,
    Path(city): Path<String>,
) -> Result<Json<RainView>, AppError> {
    let city = parse_city(&city)?;
    Ok(Json(service.rain(city).await?))
}

/// Predicted vs. actual over the last `days` (default 7) with MAE and RMSE.
async fn forecast_accuracy(
    State(service): State<DashboardState>,
    Path(city): Path<String>,
    Query(params): Query<DaysQuery>,
) -> Result<Json<Reconciliation>, AppError> {
    let city = parse_city(&city)?;
    let days = params.resolve()?;
    Ok(Json(service.accuracy(city, days).await?))
}
