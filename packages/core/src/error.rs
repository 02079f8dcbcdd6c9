use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::weather::IngestError;

/// Unified application error.
///
/// This ensures all layers (config, warehouse, parsing, request validation)
/// fail in a predictable and debuggable way.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Warehouse error: {0}")]
    Warehouse(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            // Upstream fetch failed; the render is lost but the service is fine.
            AppError::Network(_) | AppError::Warehouse(_) | AppError::Parse(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_) | AppError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Warehouse(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("{}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_failures_map_to_bad_gateway() {
        assert_eq!(AppError::Network("down".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(AppError::Warehouse("FAILED".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            AppError::from(IngestError::missing_column("ds_location")).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn request_errors_map_to_client_statuses() {
        assert_eq!(AppError::NotFound("city".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::BadRequest("days".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn display_keeps_layer_prefix() {
        assert_eq!(AppError::Config("missing".into()).to_string(), "Config error: missing");
    }
}
