use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize structured logging for the dashboard.
///
/// Reads `RUST_LOG`, falling back to `info` plus request spans from
/// `tower_http`. Must be called once at startup (in main.rs).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Logging initialized");
}
