//! Core data types for weather observations and forecasts

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// Cities tracked by the warehouse tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum City {
    HaNoi,
    HoChiMinh,
    DaNang,
}

impl City {
    pub const ALL: [City; 3] = [City::HaNoi, City::HoChiMinh, City::DaNang];

    /// Identifier used in request paths.
    pub fn slug(&self) -> &'static str {
        match self {
            City::HaNoi => "hanoi",
            City::HoChiMinh => "hochiminh",
            City::DaNang => "danang",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            City::HaNoi => "Hà Nội",
            City::HoChiMinh => "Hồ Chí Minh",
            City::DaNang => "Đà Nẵng",
        }
    }

    /// Value stored in the `ds_location` column.
    pub fn warehouse_name(&self) -> &'static str {
        match self {
            City::HaNoi => "Ha Noi City",
            City::HoChiMinh => "Ho Chi Minh City",
            City::DaNang => "Da Nang City",
        }
    }

    pub fn from_warehouse_name(name: &str) -> Option<City> {
        let name = name.trim();
        City::ALL
            .into_iter()
            .find(|city| city.warehouse_name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for City {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        City::ALL
            .into_iter()
            .find(|city| city.slug() == lowered)
            .ok_or_else(|| format!("Unknown city: {}", value))
    }
}

/// A single observed temperature reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<FixedOffset>,
    pub temperature: f64,
    pub source_city: City,
}

/// A single model prediction for a target hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub target_timestamp: DateTime<FixedOffset>,
    pub predicted_temperature: f64,
    pub model_run_timestamp: DateTime<FixedOffset>,
    pub source_city: City,
}

/// A forecast matched against the observation for the same instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledPoint {
    pub timestamp: DateTime<FixedOffset>,
    pub predicted: f64,
    pub actual: f64,
    pub absolute_error: f64,
}

/// Aggregate accuracy over all matched points. `None` means no data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    pub matched: usize,
    pub mae: Option<f64>,
    pub rmse: Option<f64>,
}

impl AccuracyMetrics {
    pub fn no_data() -> Self {
        Self {
            matched: 0,
            mae: None,
            rmse: None,
        }
    }
}

/// Output of one reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reconciliation {
    pub city: City,
    pub points: Vec<ReconciledPoint>,
    pub metrics: AccuracyMetrics,
    /// Input rows dropped during ingestion before the join.
    pub skipped_rows: usize,
}

/// One row of `fact_vn_weather_daily`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyWeather {
    pub date: NaiveDate,
    pub city: City,
    pub values: BTreeMap<String, f64>,
}

/// One row of `fact_vn_weather_hourly`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyWeather {
    pub timestamp: DateTime<FixedOffset>,
    pub city: City,
    pub values: BTreeMap<String, f64>,
}

/// One row of `lstm_rain_daily`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RainForecast {
    pub forecast_date: DateTime<FixedOffset>,
    pub probability: f64,
    pub will_rain: Option<bool>,
    pub city: City,
    pub model_run_timestamp: DateTime<FixedOffset>,
}

/// Qualitative rain band shown on the gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RainRisk {
    Low,
    Possible,
    High,
    VeryHigh,
}

impl RainRisk {
    pub fn label(&self) -> &'static str {
        match self {
            RainRisk::Low => "Ít khả năng mưa",
            RainRisk::Possible => "Có thể mưa",
            RainRisk::High => "Khả năng mưa cao",
            RainRisk::VeryHigh => "Rất có khả năng mưa",
        }
    }
}

/// Gauge reading for a single rain prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RainGauge {
    pub forecast_date: DateTime<FixedOffset>,
    pub probability_percent: f64,
    pub risk: RainRisk,
    pub risk_label: String,
    pub delta_from_reference: f64,
}
