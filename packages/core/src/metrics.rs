//! Prometheus metrics registry for the weather dashboard.
//!
//! [`AppMetrics`] owns all registered metrics and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and pass it
//! to the dashboard service and HTTP middleware.
//!
//! Exposed at `GET /metrics` in Prometheus text exposition format
//! (`text/plain; version=0.0.4`).

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use prometheus::{
    Counter, CounterVec, GaugeVec, Histogram, HistogramOpts, Opts, Registry,
};

/// All application-level Prometheus metrics.
pub struct AppMetrics {
    /// Warehouse statements issued, labelled by query kind.
    pub warehouse_queries_total: CounterVec,
    /// Warehouse statements that failed, labelled by query kind.
    pub warehouse_errors_total: CounterVec,
    /// Rows dropped during ingestion, labelled by table kind.
    pub skipped_rows_total: CounterVec,
    /// Forecast/observation pairs produced by reconciliation.
    pub reconciled_points_total: Counter,
    /// MAE of the most recent accuracy render, per city.
    pub last_mae: GaugeVec,
    /// RMSE of the most recent accuracy render, per city.
    pub last_rmse: GaugeVec,
    /// HTTP request count, labelled by method, path, and status code.
    pub http_requests_total: CounterVec,
    /// HTTP request latency histogram in seconds.
    pub http_request_duration: Histogram,
    /// The registry that owns all of the above metrics.
    pub registry: Registry,
}

impl AppMetrics {
    /// Create and register all metrics. Returns an error if any metric
    /// name is invalid or duplicated.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let warehouse_queries_total = CounterVec::new(
            Opts::new(
                "weather_dashboard_warehouse_queries_total",
                "Warehouse statements issued by query kind",
            ),
            &["kind"],
        )?;

        let warehouse_errors_total = CounterVec::new(
            Opts::new(
                "weather_dashboard_warehouse_errors_total",
                "Failed warehouse statements by query kind",
            ),
            &["kind"],
        )?;

        let skipped_rows_total = CounterVec::new(
            Opts::new(
                "weather_dashboard_skipped_rows_total",
                "Malformed rows dropped during ingestion",
            ),
            &["kind"],
        )?;

        let reconciled_points_total = Counter::with_opts(Opts::new(
            "weather_dashboard_reconciled_points_total",
            "Matched forecast/observation pairs",
        ))?;

        let last_mae = GaugeVec::new(
            Opts::new(
                "weather_dashboard_forecast_mae",
                "Mean absolute error of the latest accuracy render",
            ),
            &["city"],
        )?;

        let last_rmse = GaugeVec::new(
            Opts::new(
                "weather_dashboard_forecast_rmse",
                "Root mean squared error of the latest accuracy render",
            ),
            &["city"],
        )?;

        let http_requests_total = CounterVec::new(
            Opts::new(
                "weather_dashboard_http_requests_total",
                "HTTP requests by method, path, and status",
            ),
            &["method", "path", "status"],
        )?;

        let http_request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "weather_dashboard_http_request_duration_seconds",
                "HTTP request latency in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;

        registry.register(Box::new(warehouse_queries_total.clone()))?;
        registry.register(Box::new(warehouse_errors_total.clone()))?;
        registry.register(Box::new(skipped_rows_total.clone()))?;
        registry.register(Box::new(reconciled_points_total.clone()))?;
        registry.register(Box::new(last_mae.clone()))?;
        registry.register(Box::new(last_rmse.clone()))?;
        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;

        Ok(Self {
            warehouse_queries_total,
            warehouse_errors_total,
            skipped_rows_total,
            reconciled_points_total,
            last_mae,
            last_rmse,
            http_requests_total,
            http_request_duration,
            registry,
        })
    }

    /// Render all metrics as Prometheus text format (for the `/metrics` endpoint).
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}

/// Axum middleware recording request count and latency.
///
/// The matched route template (`/weather/:city/daily`) is used as the path
/// label so city slugs do not multiply label sets.
pub async fn track_http(
    State(metrics): State<Arc<AppMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let started = Instant::now();
    let response = next.run(request).await;

    metrics
        .http_requests_total
        .with_label_values(&[method.as_str(), path.as_str(), response.status().as_str()])
        .inc();
    metrics
        .http_request_duration
        .observe(started.elapsed().as_secs_f64());

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_metrics_register_without_error() {
        let metrics = AppMetrics::new();
        assert!(metrics.is_ok(), "AppMetrics::new() failed: {:?}", metrics.err());
    }

    #[test]
    fn render_contains_labelled_series_after_increment() {
        let metrics = AppMetrics::new().unwrap();
        metrics
            .warehouse_queries_total
            .with_label_values(&["daily_weather"])
            .inc();
        let output = metrics.render().unwrap();
        assert!(
            output.contains("weather_dashboard_warehouse_queries_total{kind=\"daily_weather\"} 1")
        );
    }

    #[test]
    fn accuracy_gauges_are_per_city() {
        let metrics = AppMetrics::new().unwrap();
        metrics.last_mae.with_label_values(&["hanoi"]).set(0.5);
        metrics.last_mae.with_label_values(&["danang"]).set(1.5);
        assert!((metrics.last_mae.with_label_values(&["hanoi"]).get() - 0.5).abs() < f64::EPSILON);
        assert!((metrics.last_mae.with_label_values(&["danang"]).get() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn counters_increment_correctly() {
        let metrics = AppMetrics::new().unwrap();
        metrics.reconciled_points_total.inc_by(3.0);
        metrics
            .skipped_rows_total
            .with_label_values(&["observations"])
            .inc();
        assert!((metrics.reconciled_points_total.get() - 3.0).abs() < f64::EPSILON);
        assert!(
            (metrics.skipped_rows_total.with_label_values(&["observations"]).get() - 1.0).abs()
                < f64::EPSILON
        );
    }
}
