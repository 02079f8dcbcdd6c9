//! Headline figures for the daily, hourly and forecast views.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::weather::types::{DailyWeather, Forecast, HourlyWeather};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub days: usize,
    pub avg_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub total_rain_mm: Option<f64>,
    pub avg_humidity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlySummary {
    pub hours: usize,
    pub avg_temperature: Option<f64>,
    pub avg_humidity: Option<f64>,
    pub avg_wind_speed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub mean: f64,
    pub max: f64,
    pub min: f64,
}

const DAILY_MEAN_COLUMNS: &[&str] = &["nr_temperature_2m_mean", "nr_temperature_2m"];
const DAILY_MAX_COLUMN: &str = "nr_temperature_2m_max";
const DAILY_RAIN_COLUMNS: &[&str] = &["nr_rain_sum", "nr_precipitation_sum"];
const DAILY_HUMIDITY_COLUMN: &str = "nr_relative_humidity_2m_mean";

/// Rows that carry named numeric columns.
trait Columns {
    fn values(&self) -> &BTreeMap<String, f64>;
}

impl Columns for DailyWeather {
    fn values(&self) -> &BTreeMap<String, f64> {
        &self.values
    }
}

impl Columns for HourlyWeather {
    fn values(&self) -> &BTreeMap<String, f64> {
        &self.values
    }
}

/// First candidate column present in any row.
fn first_present<'a, T: Columns>(rows: &[T], candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .copied()
        .find(|column| rows.iter().any(|row| row.values().contains_key(*column)))
}

fn column<'r, T: Columns>(rows: &'r [T], column: &'r str) -> impl Iterator<Item = f64> + 'r {
    rows.iter().filter_map(move |row| row.values().get(column).copied())
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn max(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.reduce(f64::max)
}

fn sum(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.reduce(|a, b| a + b)
}

pub fn summarize_daily(rows: &[DailyWeather]) -> DailySummary {
    let mean_col = first_present(rows, DAILY_MEAN_COLUMNS);
    let max_col = first_present(rows, &[DAILY_MAX_COLUMN]).or(mean_col);
    let rain_col = first_present(rows, DAILY_RAIN_COLUMNS);

    DailySummary {
        days: rows.len(),
        avg_temperature: mean_col.and_then(|c| mean(column(rows, c))),
        max_temperature: max_col.and_then(|c| max(column(rows, c))),
        total_rain_mm: rain_col.and_then(|c| sum(column(rows, c))),
        avg_humidity: mean(column(rows, DAILY_HUMIDITY_COLUMN)),
    }
}

pub fn summarize_hourly(rows: &[HourlyWeather]) -> HourlySummary {
    HourlySummary {
        hours: rows.len(),
        avg_temperature: mean(column(rows, "nr_temperature_2m")),
        avg_humidity: mean(column(rows, "nr_humidity")),
        avg_wind_speed: mean(column(rows, "nr_wind_speed")),
    }
}

/// `None` when there are no predictions.
pub fn summarize_forecast(rows: &[Forecast]) -> Option<ForecastSummary> {
    let predicted = || rows.iter().map(|f| f.predicted_temperature);

    Some(ForecastSummary {
        mean: mean(predicted())?,
        max: max(predicted())?,
        min: predicted().reduce(f64::min)?,
    })
}
