//! Local SQLite mirror of the lakehouse tables.
//!
//! Used for development without warehouse credentials and by the integration
//! tests. It answers the same [`WeatherQuery`] shapes as the Databricks client
//! with equivalent SQLite SQL, and offers insert helpers for seeding.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error::AppError;
use crate::services::warehouse::{ResultSet, WarehouseClient, WeatherQuery};
use crate::weather::timezone::to_local;
use crate::weather::types::{DailyWeather, Forecast, HourlyWeather, Observation, RainForecast};

const DAILY_COLUMNS: &[&str] = &[
    "dt_date_record",
    "ds_location",
    "nr_temperature_2m_mean",
    "nr_temperature_2m_max",
    "nr_temperature_2m_min",
    "nr_rain_sum",
    "nr_precipitation_sum",
    "nr_relative_humidity_2m_mean",
];

const HOURLY_COLUMNS: &[&str] = &[
    "dt_date_record",
    "ds_location",
    "nr_temperature_2m",
    "nr_humidity",
    "nr_wind_speed",
];

const FORECAST_COLUMNS: &[&str] = &[
    "forecast_time",
    "predicted_temperature",
    "location",
    "model_run_time",
];

const RAIN_COLUMNS: &[&str] = &[
    "forecast_date",
    "rain_probability",
    "rain_label",
    "location",
    "model_run_time",
];

const LATEST_FORECAST: &str = "SELECT dt_forecast_time AS forecast_time,
            nr_predicted_temperature AS predicted_temperature,
            ds_location AS location,
            dt_model_run_time AS model_run_time,
            ROW_NUMBER() OVER (
                PARTITION BY dt_forecast_time, ds_location
                ORDER BY dt_model_run_time DESC
            ) AS rn
     FROM lstm_weather_24h
     WHERE ds_location = ?";

/// UTC RFC 3339 text with nanosecond precision, the storage format of every
/// timestamp column. The fraction is always nine digits so text order
/// matches time order.
pub fn utc_text<Tz: TimeZone>(instant: &DateTime<Tz>) -> String {
    instant
        .with_timezone(&Utc)
        .format("%Y-%m-%dT%H:%M:%S%.9fZ")
        .to_string()
}

/// SQLite-backed warehouse.
pub struct LocalWarehouse {
    pool: SqlitePool,
}

impl LocalWarehouse {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Bulk-insert hourly facts in a single transaction.
    pub async fn insert_hourly(&self, rows: &[HourlyWeather]) -> Result<(), sqlx::Error> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for row in rows {
            sqlx::query(
                "INSERT INTO fact_vn_weather_hourly
                 (dt_date_record, ds_location, nr_temperature_2m, nr_humidity, nr_wind_speed)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(utc_text(&row.timestamp))
            .bind(row.city.warehouse_name())
            .bind(row.values.get("nr_temperature_2m").copied())
            .bind(row.values.get("nr_humidity").copied())
            .bind(row.values.get("nr_wind_speed").copied())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Insert bare temperature observations as hourly facts.
    pub async fn insert_observations(&self, rows: &[Observation]) -> Result<(), sqlx::Error> {
        let hourly: Vec<HourlyWeather> = rows
            .iter()
            .map(|o| HourlyWeather {
                timestamp: o.timestamp,
                city: o.source_city,
                values: [("nr_temperature_2m".to_string(), o.temperature)]
                    .into_iter()
                    .collect(),
            })
            .collect();
        self.insert_hourly(&hourly).await
    }

    pub async fn insert_daily(&self, rows: &[DailyWeather]) -> Result<(), sqlx::Error> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for row in rows {
            let value = |column: &str| row.values.get(column).copied();
            sqlx::query(
                "INSERT INTO fact_vn_weather_daily
                 (dt_date_record, ds_location, nr_temperature_2m_mean, nr_temperature_2m_max,
                  nr_temperature_2m_min, nr_rain_sum, nr_precipitation_sum,
                  nr_relative_humidity_2m_mean)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(row.date.format("%Y-%m-%d").to_string())
            .bind(row.city.warehouse_name())
            .bind(value("nr_temperature_2m_mean"))
            .bind(value("nr_temperature_2m_max"))
            .bind(value("nr_temperature_2m_min"))
            .bind(value("nr_rain_sum"))
            .bind(value("nr_precipitation_sum"))
            .bind(value("nr_relative_humidity_2m_mean"))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn insert_forecasts(&self, rows: &[Forecast]) -> Result<(), sqlx::Error> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for row in rows {
            sqlx::query(
                "INSERT INTO lstm_weather_24h
                 (dt_forecast_time, ds_location, nr_predicted_temperature, dt_model_run_time)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(utc_text(&row.target_timestamp))
            .bind(row.source_city.warehouse_name())
            .bind(row.predicted_temperature)
            .bind(utc_text(&row.model_run_timestamp))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn insert_rain(&self, rows: &[RainForecast]) -> Result<(), sqlx::Error> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for row in rows {
            sqlx::query(
                "INSERT INTO lstm_rain_daily
                 (dt_forecast_date, ds_location, prediction_probability, prediction_label,
                  dt_model_run_time)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(utc_text(&row.forecast_date))
            .bind(row.city.warehouse_name())
            .bind(row.probability)
            .bind(row.will_rain.map(i64::from))
            .bind(utc_text(&row.model_run_timestamp))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn run(
        &self,
        query: &WeatherQuery,
        now: DateTime<Utc>,
    ) -> Result<(&'static [&'static str], Vec<SqliteRow>), sqlx::Error> {
        let city = query.city().warehouse_name();
        let limit = i64::from(query.limit());
        let now_text = utc_text(&now);

        let (columns, rows) = match query {
            WeatherQuery::DailyWeather { .. } => {
                let sql = format!(
                    "SELECT {} FROM fact_vn_weather_daily
                     WHERE ds_location = ?
                     ORDER BY dt_date_record DESC LIMIT ?",
                    DAILY_COLUMNS.join(", ")
                );
                let rows = sqlx::query(&sql)
                    .bind(city)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?;
                (DAILY_COLUMNS, rows)
            }
            WeatherQuery::HourlyWeather { .. } => {
                let sql = format!(
                    "SELECT {} FROM fact_vn_weather_hourly
                     WHERE ds_location = ? AND dt_date_record <= ?
                     ORDER BY dt_date_record DESC LIMIT ?",
                    HOURLY_COLUMNS.join(", ")
                );
                let rows = sqlx::query(&sql)
                    .bind(city)
                    .bind(&now_text)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?;
                (HOURLY_COLUMNS, rows)
            }
            WeatherQuery::ComparisonObservations { hours, .. } => {
                let since = utc_text(&(now - Duration::hours(i64::from(*hours))));
                let sql = format!(
                    "SELECT {} FROM fact_vn_weather_hourly
                     WHERE ds_location = ? AND dt_date_record >= ? AND dt_date_record <= ?
                     ORDER BY dt_date_record DESC",
                    HOURLY_COLUMNS.join(", ")
                );
                let rows = sqlx::query(&sql)
                    .bind(city)
                    .bind(&since)
                    .bind(&now_text)
                    .fetch_all(&self.pool)
                    .await?;
                (HOURLY_COLUMNS, rows)
            }
            WeatherQuery::TemperatureForecast { .. } => {
                let sql = format!(
                    "SELECT {} FROM ({LATEST_FORECAST})
                     WHERE rn = 1 AND forecast_time >= ?
                     ORDER BY forecast_time ASC LIMIT ?",
                    FORECAST_COLUMNS.join(", ")
                );
                let rows = sqlx::query(&sql)
                    .bind(city)
                    .bind(&now_text)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?;
                (FORECAST_COLUMNS, rows)
            }
            WeatherQuery::ComparisonForecasts { hours, .. } => {
                let since = utc_text(&(now - Duration::hours(i64::from(*hours))));
                let sql = format!(
                    "SELECT {} FROM ({LATEST_FORECAST})
                     WHERE rn = 1 AND forecast_time >= ? AND forecast_time <= ?
                     ORDER BY forecast_time DESC",
                    FORECAST_COLUMNS.join(", ")
                );
                let rows = sqlx::query(&sql)
                    .bind(city)
                    .bind(&since)
                    .bind(&now_text)
                    .fetch_all(&self.pool)
                    .await?;
                (FORECAST_COLUMNS, rows)
            }
            WeatherQuery::RainForecast { .. } => {
                let today = to_local(&now).format("%Y-%m-%d").to_string();
                let sql = format!(
                    "SELECT {} FROM (
                        SELECT dt_forecast_date AS forecast_date,
                               prediction_probability AS rain_probability,
                               prediction_label AS rain_label,
                               ds_location AS location,
                               dt_model_run_time AS model_run_time,
                               ROW_NUMBER() OVER (
                                   PARTITION BY dt_forecast_date, ds_location
                                   ORDER BY dt_model_run_time DESC
                               ) AS rn
                        FROM lstm_rain_daily
                        WHERE ds_location = ? AND date(dt_forecast_date, '+7 hours') >= ?
                     )
                     WHERE rn = 1
                     ORDER BY forecast_date ASC LIMIT ?",
                    RAIN_COLUMNS.join(", ")
                );
                let rows = sqlx::query(&sql)
                    .bind(city)
                    .bind(&today)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?;
                (RAIN_COLUMNS, rows)
            }
        };

        Ok((columns, rows))
    }
}

/// Render any SQLite storage class as text.
fn cell_text(row: &SqliteRow, idx: usize) -> Option<String> {
    if let Ok(value) = row.try_get::<Option<String>, _>(idx) {
        return value;
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(idx) {
        return value.map(|v| v.to_string());
    }
    row.try_get::<Option<i64>, _>(idx)
        .ok()
        .flatten()
        .map(|v| v.to_string())
}

#[async_trait]
impl WarehouseClient for LocalWarehouse {
    async fn fetch(&self, query: &WeatherQuery) -> Result<ResultSet, AppError> {
        let (columns, rows) = self.run(query, Utc::now()).await?;

        Ok(ResultSet {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| (0..columns.len()).map(|idx| cell_text(row, idx)).collect())
                .collect(),
        })
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
