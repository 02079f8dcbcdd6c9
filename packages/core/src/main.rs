use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;

use vn_weather_dashboard::api::create_router;
use vn_weather_dashboard::cli::Cli;
use vn_weather_dashboard::config::{Config, WarehouseBackend};
use vn_weather_dashboard::dashboard::DashboardService;
use vn_weather_dashboard::db;
use vn_weather_dashboard::error::AppError;
use vn_weather_dashboard::logging::init_logging;
use vn_weather_dashboard::metrics::AppMetrics;
use vn_weather_dashboard::services::databricks::DatabricksClient;
use vn_weather_dashboard::services::local::LocalWarehouse;
use vn_weather_dashboard::services::warehouse::WarehouseClient;

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    if let Err(err) = run(Cli::parse()).await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = Config::load(&cli).map_err(AppError::Config)?;
    tracing::info!("Service started with config: {:?}", config);

    let warehouse: Arc<dyn WarehouseClient + Send + Sync> = match &config.backend {
        WarehouseBackend::Databricks(settings) => {
            Arc::new(DatabricksClient::new(settings.clone())?)
        }
        WarehouseBackend::Sqlite { url } => {
            Arc::new(LocalWarehouse::new(db::create_pool(url).await?))
        }
    };
    tracing::info!("Using {} warehouse", warehouse.name());

    let metrics = Arc::new(AppMetrics::new().map_err(|err| AppError::Unknown(err.to_string()))?);
    let service = Arc::new(DashboardService::new(
        warehouse,
        config.rain_thresholds,
        metrics.clone(),
    ));
    let app = create_router(service, metrics);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|err| AppError::Config(format!("Cannot bind {}: {}", config.bind_addr, err)))?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Unknown(err.to_string()))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
