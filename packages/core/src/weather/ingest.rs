//! Conversion of warehouse result sets into typed weather rows.
//!
//! Each `ingest_*` function resolves its required columns once, then walks the
//! rows. A row with a null or unparseable required cell, a timestamp without
//! an offset, a non-finite number, or an unknown location is skipped and
//! counted; it never aborts the batch.

use std::collections::BTreeMap;

use crate::services::warehouse::ResultSet;
use crate::weather::{
    error::IngestError,
    timezone::{parse_instant, parse_local_date},
    types::*,
};

/// Typed rows plus the number of rows that were dropped.
#[derive(Debug, Clone)]
pub struct Ingested<T> {
    pub rows: Vec<T>,
    pub skipped: usize,
}

impl<T> Ingested<T> {
    fn collect(kind: &str, total: usize, rows: Vec<T>) -> Self {
        let skipped = total - rows.len();
        if skipped > 0 {
            tracing::warn!("Skipped {} of {} {} rows during ingestion", skipped, total, kind);
        }
        Self { rows, skipped }
    }
}

pub const COL_RECORD_TIME: &str = "dt_date_record";
pub const COL_LOCATION: &str = "ds_location";
pub const COL_TEMPERATURE: &str = "nr_temperature_2m";
pub const COL_FORECAST_TIME: &str = "forecast_time";
pub const COL_PREDICTED_TEMPERATURE: &str = "predicted_temperature";
pub const COL_MODEL_RUN_TIME: &str = "model_run_time";
pub const COL_FORECAST_DATE: &str = "forecast_date";
pub const COL_RAIN_PROBABILITY: &str = "rain_probability";
pub const COL_RAIN_LABEL: &str = "rain_label";
pub const COL_ALIAS_LOCATION: &str = "location";

fn require(rs: &ResultSet, column: &str) -> Result<usize, IngestError> {
    rs.column_index(column)
        .ok_or_else(|| IngestError::missing_column(column))
}

fn cell(row: &[Option<String>], idx: usize) -> Option<&str> {
    row.get(idx)
        .and_then(|value| value.as_deref())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn number(row: &[Option<String>], idx: usize) -> Option<f64> {
    cell(row, idx)?
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn city(row: &[Option<String>], idx: usize) -> Option<City> {
    City::from_warehouse_name(cell(row, idx)?)
}

fn instant(row: &[Option<String>], idx: usize) -> Option<chrono::DateTime<chrono::FixedOffset>> {
    let raw = cell(row, idx)?;
    match parse_instant(raw) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            tracing::debug!("{}", err);
            None
        }
    }
}

fn flag(row: &[Option<String>], idx: usize) -> Option<bool> {
    match cell(row, idx)?.to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" => Some(true),
        "0" | "0.0" | "false" => Some(false),
        _ => None,
    }
}

/// Every parseable, finite numeric cell outside the excluded columns.
fn numeric_values(
    rs: &ResultSet,
    row: &[Option<String>],
    exclude: &[usize],
) -> BTreeMap<String, f64> {
    rs.columns
        .iter()
        .enumerate()
        .filter(|(idx, _)| !exclude.contains(idx))
        .filter_map(|(idx, name)| number(row, idx).map(|value| (name.clone(), value)))
        .collect()
}

/// Hourly observations: `dt_date_record`, `nr_temperature_2m`, `ds_location`.
pub fn ingest_observations(rs: &ResultSet) -> Result<Ingested<Observation>, IngestError> {
    let ts = require(rs, COL_RECORD_TIME)?;
    let temp = require(rs, COL_TEMPERATURE)?;
    let loc = require(rs, COL_LOCATION)?;

    let rows = rs
        .rows
        .iter()
        .filter_map(|row| {
            Some(Observation {
                timestamp: instant(row, ts)?,
                temperature: number(row, temp)?,
                source_city: city(row, loc)?,
            })
        })
        .collect();

    Ok(Ingested::collect("observation", rs.rows.len(), rows))
}

/// Temperature forecasts: `forecast_time`, `predicted_temperature`,
/// `model_run_time`, `location`.
pub fn ingest_forecasts(rs: &ResultSet) -> Result<Ingested<Forecast>, IngestError> {
    let target = require(rs, COL_FORECAST_TIME)?;
    let predicted = require(rs, COL_PREDICTED_TEMPERATURE)?;
    let run = require(rs, COL_MODEL_RUN_TIME)?;
    let loc = require(rs, COL_ALIAS_LOCATION)?;

    let rows = rs
        .rows
        .iter()
        .filter_map(|row| {
            Some(Forecast {
                target_timestamp: instant(row, target)?,
                predicted_temperature: number(row, predicted)?,
                model_run_timestamp: instant(row, run)?,
                source_city: city(row, loc)?,
            })
        })
        .collect();

    Ok(Ingested::collect("forecast", rs.rows.len(), rows))
}

/// Rain predictions: `forecast_date`, `rain_probability`, `rain_label`,
/// `location`, `model_run_time`. The label is optional.
pub fn ingest_rain(rs: &ResultSet) -> Result<Ingested<RainForecast>, IngestError> {
    let date = require(rs, COL_FORECAST_DATE)?;
    let probability = require(rs, COL_RAIN_PROBABILITY)?;
    let loc = require(rs, COL_ALIAS_LOCATION)?;
    let run = require(rs, COL_MODEL_RUN_TIME)?;
    let label = rs.column_index(COL_RAIN_LABEL);

    let rows = rs
        .rows
        .iter()
        .filter_map(|row| {
            Some(RainForecast {
                forecast_date: instant(row, date)?,
                probability: number(row, probability)?,
                will_rain: label.and_then(|idx| flag(row, idx)),
                city: city(row, loc)?,
                model_run_timestamp: instant(row, run)?,
            })
        })
        .collect();

    Ok(Ingested::collect("rain forecast", rs.rows.len(), rows))
}

/// Daily facts. The record column may be a DATE or an instant; every other
/// numeric column is carried through by name.
pub fn ingest_daily(rs: &ResultSet) -> Result<Ingested<DailyWeather>, IngestError> {
    let ts = require(rs, COL_RECORD_TIME)?;
    let loc = require(rs, COL_LOCATION)?;

    let rows = rs
        .rows
        .iter()
        .filter_map(|row| {
            let date = parse_local_date(cell(row, ts)?).ok()?;
            Some(DailyWeather {
                date,
                city: city(row, loc)?,
                values: numeric_values(rs, row, &[ts, loc]),
            })
        })
        .collect();

    Ok(Ingested::collect("daily weather", rs.rows.len(), rows))
}

/// Hourly facts with every numeric column carried through by name.
pub fn ingest_hourly(rs: &ResultSet) -> Result<Ingested<HourlyWeather>, IngestError> {
    let ts = require(rs, COL_RECORD_TIME)?;
    let loc = require(rs, COL_LOCATION)?;

    let rows = rs
        .rows
        .iter()
        .filter_map(|row| {
            Some(HourlyWeather {
                timestamp: instant(row, ts)?,
                city: city(row, loc)?,
                values: numeric_values(rs, row, &[ts, loc]),
            })
        })
        .collect();

    Ok(Ingested::collect("hourly weather", rs.rows.len(), rows))
}
