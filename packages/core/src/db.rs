//! SQLite pool and schema for the local warehouse mirror.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Schema mirroring the four lakehouse tables. Timestamps are stored as
/// UTC RFC 3339 text with a nine-digit fraction (`2024-01-01T02:00:00.000000000Z`) so
/// text comparison orders them.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS fact_vn_weather_daily (
        dt_date_record TEXT NOT NULL,
        ds_location TEXT NOT NULL,
        nr_temperature_2m_mean REAL,
        nr_temperature_2m_max REAL,
        nr_temperature_2m_min REAL,
        nr_rain_sum REAL,
        nr_precipitation_sum REAL,
        nr_relative_humidity_2m_mean REAL
    )",
    "CREATE TABLE IF NOT EXISTS fact_vn_weather_hourly (
        dt_date_record TEXT NOT NULL,
        ds_location TEXT NOT NULL,
        nr_temperature_2m REAL,
        nr_humidity REAL,
        nr_wind_speed REAL
    )",
    "CREATE TABLE IF NOT EXISTS lstm_weather_24h (
        dt_forecast_time TEXT NOT NULL,
        ds_location TEXT NOT NULL,
        nr_predicted_temperature REAL,
        dt_model_run_time TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS lstm_rain_daily (
        dt_forecast_date TEXT NOT NULL,
        ds_location TEXT NOT NULL,
        prediction_probability REAL,
        prediction_label INTEGER,
        dt_model_run_time TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_hourly_location_time
        ON fact_vn_weather_hourly (ds_location, dt_date_record)",
    "CREATE INDEX IF NOT EXISTS idx_lstm_location_time
        ON lstm_weather_24h (ds_location, dt_forecast_time)",
];

/// Open (creating if needed) the database at `url` and apply the schema.
///
/// A single connection is used: `sqlite::memory:` databases are private to
/// the connection that created them.
pub async fn create_pool(url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    for statement in SCHEMA {
        sqlx::query(statement).execute(&pool).await?;
    }

    tracing::info!("Local warehouse ready at {}", url);
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn schema_creates_all_four_tables() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(&pool)
            .await
            .unwrap();
        let names: Vec<String> = rows.iter().map(|r| r.get::<String, _>("name")).collect();

        assert_eq!(
            names,
            vec![
                "fact_vn_weather_daily",
                "fact_vn_weather_hourly",
                "lstm_rain_daily",
                "lstm_weather_24h"
            ]
        );
    }

    #[tokio::test]
    async fn schema_is_idempotent() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await.unwrap();
        }
    }
}
