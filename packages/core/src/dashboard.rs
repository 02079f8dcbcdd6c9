//! Per-render pipelines behind the HTTP views.
//!
//! Each method fetches the tables a view needs, ingests them into typed rows,
//! and computes the view's figures. Nothing is kept between calls.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::metrics::AppMetrics;
use crate::services::warehouse::{
    ResultSet, WarehouseClient, WeatherQuery, DAILY_LIMIT, RAIN_FORECAST_LIMIT,
    TEMPERATURE_FORECAST_LIMIT,
};
use crate::weather::ingest::{
    ingest_daily, ingest_forecasts, ingest_hourly, ingest_observations, ingest_rain, Ingested,
};
use crate::weather::summary::{
    summarize_daily, summarize_forecast, summarize_hourly, DailySummary, ForecastSummary,
    HourlySummary,
};
use crate::weather::{
    AccuracyMetrics, City, DailyWeather, Forecast, ForecastReconciler, HourlyWeather,
    RainForecast, RainGauge, RainThresholds, Reconciliation,
};

/// Accuracy window used on the overview page.
pub const OVERVIEW_ACCURACY_DAYS: u32 = 3;

/// How far back, as a multiple of the requested window, accuracy renders
/// look for pairs. Observations land hours after their forecasts, so the
/// newest matched pairs can sit well before now.
const ACCURACY_LOOKBACK_FACTOR: u32 = 2;

#[derive(Debug, Serialize, Deserialize)]
pub struct DailyView {
    pub city: City,
    pub days: Vec<DailyWeather>,
    pub summary: DailySummary,
    pub skipped_rows: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HourlyView {
    pub city: City,
    pub days: u32,
    pub hours: Vec<HourlyWeather>,
    pub summary: HourlySummary,
    pub skipped_rows: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TemperatureForecastView {
    pub city: City,
    pub forecasts: Vec<Forecast>,
    pub summary: Option<ForecastSummary>,
    pub skipped_rows: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RainView {
    pub city: City,
    pub forecasts: Vec<RainForecast>,
    /// Gauge for the nearest forecast date.
    pub gauge: Option<RainGauge>,
    pub skipped_rows: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OverviewView {
    pub city: City,
    pub temperature_forecast: TemperatureForecastView,
    pub rain_gauge: Option<RainGauge>,
    pub daily_summary: DailySummary,
    pub accuracy_days: u32,
    pub accuracy: AccuracyMetrics,
}

pub struct DashboardService {
    warehouse: Arc<dyn WarehouseClient + Send + Sync>,
    thresholds: RainThresholds,
    reconciler: ForecastReconciler,
    metrics: Arc<AppMetrics>,
}

impl DashboardService {
    pub fn new(
        warehouse: Arc<dyn WarehouseClient + Send + Sync>,
        thresholds: RainThresholds,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            warehouse,
            thresholds,
            reconciler: ForecastReconciler::new(),
            metrics,
        }
    }

    async fn fetch(&self, query: WeatherQuery) -> Result<ResultSet, AppError> {
        let kind = query.kind();
        self.metrics
            .warehouse_queries_total
            .with_label_values(&[kind])
            .inc();

        match self.warehouse.fetch(&query).await {
            Ok(rs) => {
                tracing::debug!(
                    "{} returned {} rows for {} from {}",
                    kind,
                    rs.len(),
                    query.city(),
                    self.warehouse.name()
                );
                Ok(rs)
            }
            Err(err) => {
                self.metrics
                    .warehouse_errors_total
                    .with_label_values(&[kind])
                    .inc();
                tracing::warn!("{} failed for {}: {}", kind, query.city(), err);
                Err(err)
            }
        }
    }

    fn count_skipped<T>(&self, kind: &str, ingested: &Ingested<T>) {
        if ingested.skipped > 0 {
            self.metrics
                .skipped_rows_total
                .with_label_values(&[kind])
                .inc_by(ingested.skipped as f64);
        }
    }

    /// Last 30 days of daily facts, oldest first.
    pub async fn daily(&self, city: City) -> Result<DailyView, AppError> {
        let rs = self
            .fetch(WeatherQuery::DailyWeather { city, limit: DAILY_LIMIT })
            .await?;
        let ingested = ingest_daily(&rs)?;
        self.count_skipped("daily", &ingested);

        let mut days: Vec<DailyWeather> = ingested
            .rows
            .into_iter()
            .filter(|row| row.city == city)
            .collect();
        days.sort_by_key(|row| row.date);

        Ok(DailyView {
            city,
            summary: summarize_daily(&days),
            days,
            skipped_rows: ingested.skipped,
        })
    }

    /// Last `days * 24` hourly facts, oldest first.
    pub async fn hourly(&self, city: City, days: u32) -> Result<HourlyView, AppError> {
        let rs = self
            .fetch(WeatherQuery::HourlyWeather { city, hours: days * 24 })
            .await?;
        let ingested = ingest_hourly(&rs)?;
        self.count_skipped("hourly", &ingested);

        let mut hours: Vec<HourlyWeather> = ingested
            .rows
            .into_iter()
            .filter(|row| row.city == city)
            .collect();
        hours.sort_by_key(|row| row.timestamp);

        Ok(HourlyView {
            city,
            days,
            summary: summarize_hourly(&hours),
            hours,
            skipped_rows: ingested.skipped,
        })
    }

    /// Next 24 hourly temperature predictions.
    pub async fn temperature_forecast(
        &self,
        city: City,
    ) -> Result<TemperatureForecastView, AppError> {
        let rs = self
            .fetch(WeatherQuery::TemperatureForecast {
                city,
                limit: TEMPERATURE_FORECAST_LIMIT,
            })
            .await?;
        let ingested = ingest_forecasts(&rs)?;
        self.count_skipped("forecasts", &ingested);

        let mut forecasts: Vec<Forecast> = ingested
            .rows
            .into_iter()
            .filter(|row| row.source_city == city)
            .collect();
        forecasts.sort_by_key(|row| row.target_timestamp);

        Ok(TemperatureForecastView {
            city,
            summary: summarize_forecast(&forecasts),
            forecasts,
            skipped_rows: ingested.skipped,
        })
    }

    /// Upcoming rain predictions and the gauge for the nearest one.
    pub async fn rain(&self, city: City) -> Result<RainView, AppError> {
        let rs = self
            .fetch(WeatherQuery::RainForecast { city, limit: RAIN_FORECAST_LIMIT })
            .await?;
        let ingested = ingest_rain(&rs)?;
        self.count_skipped("rain", &ingested);

        let mut forecasts: Vec<RainForecast> = ingested
            .rows
            .into_iter()
            .filter(|row| row.city == city)
            .collect();
        forecasts.sort_by_key(|row| row.forecast_date);

        Ok(RainView {
            city,
            gauge: forecasts.first().map(|f| self.thresholds.gauge(f)),
            forecasts,
            skipped_rows: ingested.skipped,
        })
    }

    /// Reconcile the newest `days * 24` forecast/observation pairs.
    ///
    /// Both tables are read over twice that span so lagging observations
    /// still fill the window; the join is then cut to its newest pairs.
    pub async fn accuracy(&self, city: City, days: u32) -> Result<Reconciliation, AppError> {
        let hours = days * 24;
        let lookback = hours * ACCURACY_LOOKBACK_FACTOR;
        let (forecast_rs, observation_rs) = tokio::try_join!(
            self.fetch(WeatherQuery::ComparisonForecasts { city, hours: lookback }),
            self.fetch(WeatherQuery::ComparisonObservations { city, hours: lookback }),
        )?;

        let forecasts = ingest_forecasts(&forecast_rs)?;
        let observations = ingest_observations(&observation_rs)?;
        self.count_skipped("forecasts", &forecasts);
        self.count_skipped("observations", &observations);

        let (mut points, _) = self.reconciler.reconcile(&forecasts.rows, &observations.rows, city);
        // Points are ascending; keep the newest `hours` of them.
        let excess = points.len().saturating_sub(hours as usize);
        points.drain(..excess);
        let metrics = crate::weather::reconcile::accuracy(&points);

        self.metrics
            .reconciled_points_total
            .inc_by(points.len() as f64);
        self.record_accuracy(city, &metrics);
        tracing::info!(
            "Reconciled {} points for {} over {} days",
            points.len(),
            city,
            days
        );

        Ok(Reconciliation {
            city,
            points,
            metrics,
            skipped_rows: forecasts.skipped + observations.skipped,
        })
    }

    /// Publish the latest MAE/RMSE for `city`. A render with no pairs
    /// removes the city's series instead of leaving the previous value.
    fn record_accuracy(&self, city: City, metrics: &AccuracyMetrics) {
        let labels = [city.slug()];
        match (metrics.mae, metrics.rmse) {
            (Some(mae), Some(rmse)) => {
                self.metrics.last_mae.with_label_values(&labels).set(mae);
                self.metrics.last_rmse.with_label_values(&labels).set(rmse);
            }
            _ => {
                // Absent series are not an error.
                let _ = self.metrics.last_mae.remove_label_values(&labels);
                let _ = self.metrics.last_rmse.remove_label_values(&labels);
            }
        }
    }

    /// Everything the landing page shows, fetched concurrently.
    pub async fn overview(&self, city: City) -> Result<OverviewView, AppError> {
        let (temperature_forecast, rain, daily, accuracy) = tokio::try_join!(
            self.temperature_forecast(city),
            self.rain(city),
            self.daily(city),
            self.accuracy(city, OVERVIEW_ACCURACY_DAYS),
        )?;

        Ok(OverviewView {
            city,
            temperature_forecast,
            rain_gauge: rain.gauge,
            daily_summary: daily.summary,
            accuracy_days: OVERVIEW_ACCURACY_DAYS,
            accuracy: accuracy.metrics,
        })
    }
}
