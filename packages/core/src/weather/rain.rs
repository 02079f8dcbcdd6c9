//! Rain probability gauge.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::weather::types::{RainForecast, RainGauge, RainRisk};

/// Reference line drawn on the gauge, in percent.
pub const RAIN_REFERENCE_PERCENT: f64 = 50.0;

/// Upper bounds (exclusive, in percent) of the Low, Possible and High bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RainThresholds {
    pub possible: f64,
    pub high: f64,
    pub very_high: f64,
}

impl Default for RainThresholds {
    fn default() -> Self {
        Self {
            possible: 30.0,
            high: 50.0,
            very_high: 70.0,
        }
    }
}

impl RainThresholds {
    pub fn new(possible: f64, high: f64, very_high: f64) -> Result<Self, String> {
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if !(in_range(possible) && in_range(high) && in_range(very_high)) {
            return Err("rain thresholds must lie within 0..=100".to_string());
        }
        if !(possible < high && high < very_high) {
            return Err("rain thresholds must be strictly increasing".to_string());
        }
        Ok(Self {
            possible,
            high,
            very_high,
        })
    }

    pub fn classify(&self, percent: f64) -> RainRisk {
        if percent < self.possible {
            RainRisk::Low
        } else if percent < self.high {
            RainRisk::Possible
        } else if percent < self.very_high {
            RainRisk::High
        } else {
            RainRisk::VeryHigh
        }
    }

    /// Build the gauge reading for one prediction.
    pub fn gauge(&self, forecast: &RainForecast) -> RainGauge {
        let percent = forecast.probability.clamp(0.0, 1.0) * 100.0;
        let risk = self.classify(percent);

        RainGauge {
            forecast_date: forecast.forecast_date,
            probability_percent: percent,
            risk,
            risk_label: risk.label().to_string(),
            delta_from_reference: percent - RAIN_REFERENCE_PERCENT,
        }
    }
}

/// Parses `"30,50,70"`.
impl FromStr for RainThresholds {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts = value
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| format!("Invalid rain thresholds: {}", value))?;

        match parts.as_slice() {
            [possible, high, very_high] => Self::new(*possible, *high, *very_high),
            _ => Err(format!("Expected three rain thresholds, got: {}", value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::timezone::parse_instant;
    use crate::weather::types::City;

    fn rain(probability: f64) -> RainForecast {
        RainForecast {
            forecast_date: parse_instant("2024-01-02T00:00:00+07:00").unwrap(),
            probability,
            will_rain: None,
            city: City::HaNoi,
            model_run_timestamp: parse_instant("2024-01-01T00:00:00Z").unwrap(),
        }
    }

    #[test]
    fn band_boundaries_are_lower_inclusive() {
        let t = RainThresholds::default();
        assert_eq!(t.classify(0.0), RainRisk::Low);
        assert_eq!(t.classify(29.99), RainRisk::Low);
        assert_eq!(t.classify(30.0), RainRisk::Possible);
        assert_eq!(t.classify(49.99), RainRisk::Possible);
        assert_eq!(t.classify(50.0), RainRisk::High);
        assert_eq!(t.classify(69.99), RainRisk::High);
        assert_eq!(t.classify(70.0), RainRisk::VeryHigh);
        assert_eq!(t.classify(100.0), RainRisk::VeryHigh);
    }

    #[test]
    fn gauge_reports_percent_and_delta() {
        let gauge = RainThresholds::default().gauge(&rain(0.65));
        assert!((gauge.probability_percent - 65.0).abs() < 1e-9);
        assert!((gauge.delta_from_reference - 15.0).abs() < 1e-9);
        assert_eq!(gauge.risk, RainRisk::High);
        assert_eq!(gauge.risk_label, "Khả năng mưa cao");
    }

    #[test]
    fn out_of_range_probability_is_clamped() {
        let gauge = RainThresholds::default().gauge(&rain(1.4));
        assert_eq!(gauge.probability_percent, 100.0);
        assert_eq!(gauge.risk, RainRisk::VeryHigh);
    }

    #[test]
    fn thresholds_parse_from_env_style_string() {
        let t: RainThresholds = "20, 40, 80".parse().unwrap();
        assert_eq!(t, RainThresholds::new(20.0, 40.0, 80.0).unwrap());
        assert!("50,40,80".parse::<RainThresholds>().is_err());
        assert!("20,40".parse::<RainThresholds>().is_err());
        assert!("a,b,c".parse::<RainThresholds>().is_err());
    }
}
