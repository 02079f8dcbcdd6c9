use axum::{
    http::header,
    response::IntoResponse,
};

/// Liveness check. Does not touch the warehouse.
pub async fn health() -> impl IntoResponse {
    ([(header::CACHE_CONTROL, "no-store")], "ok")
}
