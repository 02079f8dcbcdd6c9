//! Warehouse abstraction.
//!
//! The dashboard never talks SQL directly: it names a [`WeatherQuery`] and a
//! [`WarehouseClient`] renders it in its own dialect and returns an opaque
//! [`ResultSet`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::weather::City;

/// Tabular result: column names plus rows of nullable text cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl ResultSet {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Every request shape the dashboard issues against the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherQuery {
    /// Most recent daily facts.
    DailyWeather { city: City, limit: u32 },
    /// Most recent hourly facts.
    HourlyWeather { city: City, hours: u32 },
    /// Upcoming temperature predictions, latest model run per target hour.
    TemperatureForecast { city: City, limit: u32 },
    /// Rain predictions from today (Vietnam calendar) onward, latest run per date.
    RainForecast { city: City, limit: u32 },
    /// Past temperature predictions, latest run per target hour, newest first.
    ComparisonForecasts { city: City, hours: u32 },
    /// Past hourly observations, newest first.
    ComparisonObservations { city: City, hours: u32 },
}

pub const DAILY_LIMIT: u32 = 30;
pub const TEMPERATURE_FORECAST_LIMIT: u32 = 24;
pub const RAIN_FORECAST_LIMIT: u32 = 5;

impl WeatherQuery {
    /// Short label used in logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            WeatherQuery::DailyWeather { .. } => "daily_weather",
            WeatherQuery::HourlyWeather { .. } => "hourly_weather",
            WeatherQuery::TemperatureForecast { .. } => "temperature_forecast",
            WeatherQuery::RainForecast { .. } => "rain_forecast",
            WeatherQuery::ComparisonForecasts { .. } => "comparison_forecasts",
            WeatherQuery::ComparisonObservations { .. } => "comparison_observations",
        }
    }

    pub fn city(&self) -> City {
        match *self {
            WeatherQuery::DailyWeather { city, .. }
            | WeatherQuery::HourlyWeather { city, .. }
            | WeatherQuery::TemperatureForecast { city, .. }
            | WeatherQuery::RainForecast { city, .. }
            | WeatherQuery::ComparisonForecasts { city, .. }
            | WeatherQuery::ComparisonObservations { city, .. } => city,
        }
    }

    /// Lookback in hours for the time-bounded comparison queries. These
    /// return every row inside the window rather than a fixed row count.
    pub fn window_hours(&self) -> Option<u32> {
        match *self {
            WeatherQuery::ComparisonForecasts { hours, .. }
            | WeatherQuery::ComparisonObservations { hours, .. } => Some(hours),
            _ => None,
        }
    }

    /// Maximum number of rows requested, or the window length for
    /// comparison queries.
    pub fn limit(&self) -> u32 {
        match *self {
            WeatherQuery::DailyWeather { limit, .. }
            | WeatherQuery::TemperatureForecast { limit, .. }
            | WeatherQuery::RainForecast { limit, .. } => limit,
            WeatherQuery::HourlyWeather { hours, .. }
            | WeatherQuery::ComparisonForecasts { hours, .. }
            | WeatherQuery::ComparisonObservations { hours, .. } => hours,
        }
    }
}

/// Source of weather tables.
#[async_trait]
pub trait WarehouseClient {
    /// Execute `query` and return its rows. Any transport or statement
    /// failure is an error; an empty result is not.
    async fn fetch(&self, query: &WeatherQuery) -> Result<ResultSet, AppError>;

    /// Name of this backend for logging.
    fn name(&self) -> &str;
}
