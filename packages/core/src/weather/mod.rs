//! Weather domain
//!
//! Typed observation and forecast rows, timezone normalization, ingestion of
//! warehouse result sets, forecast reconciliation, the rain gauge and the
//! summary figures shown on each dashboard view.

pub mod error;
pub mod ingest;
pub mod rain;
pub mod reconcile;
pub mod summary;
pub mod timezone;
pub mod types;


pub use error::{IngestError, TimestampError};
pub use rain::RainThresholds;
pub use reconcile::ForecastReconciler;
pub use types::*;
