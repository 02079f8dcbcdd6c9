//! Forecast vs. observation reconciliation.
//!
//! Joins a forecast series and an observation series for one city on the
//! exact instant (after normalization to UTC+7) and computes pointwise
//! absolute error plus MAE and RMSE. There is no tolerance window: a forecast
//! for 09:00 never matches an observation at 09:05.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};

use crate::weather::{timezone::to_local, types::*};

/// Stateless reconciler; one call per dashboard render.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForecastReconciler;

impl ForecastReconciler {
    pub fn new() -> Self {
        Self
    }

    /// Inner-join `forecasts` and `observations` for `city`.
    ///
    /// Rows for other cities are ignored. Several forecasts for the same target
    /// instant collapse to the latest model run; duplicate observations collapse
    /// to their mean. The output is ascending by timestamp and independent of
    /// input order. An empty join yields no points and [`AccuracyMetrics::no_data`].
    pub fn reconcile(
        &self,
        forecasts: &[Forecast],
        observations: &[Observation],
        city: City,
    ) -> (Vec<ReconciledPoint>, AccuracyMetrics) {
        let predicted = latest_forecasts(forecasts, city);
        let actual = mean_observations(observations, city);

        let points: Vec<ReconciledPoint> = predicted
            .iter()
            .filter_map(|(timestamp, predicted)| {
                let actual = *actual.get(timestamp)?;
                Some(ReconciledPoint {
                    timestamp: *timestamp,
                    predicted: *predicted,
                    actual,
                    absolute_error: (predicted - actual).abs(),
                })
            })
            .collect();

        let metrics = accuracy(&points);
        (points, metrics)
    }
}

/// Latest-model-run prediction per target instant, keyed in UTC+7.
fn latest_forecasts(forecasts: &[Forecast], city: City) -> BTreeMap<DateTime<FixedOffset>, f64> {
    let mut latest: BTreeMap<DateTime<FixedOffset>, (DateTime<FixedOffset>, f64)> = BTreeMap::new();

    for forecast in forecasts.iter().filter(|f| f.source_city == city) {
        let key = to_local(&forecast.target_timestamp);
        let candidate = (forecast.model_run_timestamp, forecast.predicted_temperature);

        latest
            .entry(key)
            .and_modify(|current| {
                let newer = candidate.0 > current.0
                    || (candidate.0 == current.0 && candidate.1.total_cmp(&current.1).is_gt());
                if newer {
                    *current = candidate;
                }
            })
            .or_insert(candidate);
    }

    latest.into_iter().map(|(key, (_, value))| (key, value)).collect()
}

/// Mean observed temperature per instant, keyed in UTC+7.
fn mean_observations(
    observations: &[Observation],
    city: City,
) -> BTreeMap<DateTime<FixedOffset>, f64> {
    let mut grouped: BTreeMap<DateTime<FixedOffset>, Vec<f64>> = BTreeMap::new();

    for observation in observations.iter().filter(|o| o.source_city == city) {
        grouped
            .entry(to_local(&observation.timestamp))
            .or_default()
            .push(observation.temperature);
    }

    grouped
        .into_iter()
        .map(|(key, mut values)| {
            // Sorted summation keeps the mean identical under input reordering.
            values.sort_by(f64::total_cmp);
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            (key, mean)
        })
        .collect()
}

/// MAE and RMSE over matched points.
pub fn accuracy(points: &[ReconciledPoint]) -> AccuracyMetrics {
    if points.is_empty() {
        return AccuracyMetrics::no_data();
    }

    let n = points.len() as f64;
    let mae = points.iter().map(|p| p.absolute_error).sum::<f64>() / n;
    let mse = points.iter().map(|p| p.absolute_error.powi(2)).sum::<f64>() / n;

    AccuracyMetrics {
        matched: points.len(),
        mae: Some(mae),
        rmse: Some(mse.sqrt()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::timezone::parse_instant;

    fn at(value: &str) -> DateTime<FixedOffset> {
        parse_instant(value).unwrap()
    }

    fn forecast(target: &str, value: f64) -> Forecast {
        forecast_run(target, value, "2024-01-01T00:00:00+07:00")
    }

    fn forecast_run(target: &str, value: f64, run: &str) -> Forecast {
        Forecast {
            target_timestamp: at(target),
            predicted_temperature: value,
            model_run_timestamp: at(run),
            source_city: City::HaNoi,
        }
    }

    fn observation(timestamp: &str, value: f64) -> Observation {
        Observation {
            timestamp: at(timestamp),
            temperature: value,
            source_city: City::HaNoi,
        }
    }

    #[test]
    fn single_match_scenario() {
        let forecasts = vec![forecast("2024-01-01T09:00:00+07:00", 25.0)];
        let observations = vec![observation("2024-01-01T09:00:00+07:00", 24.0)];

        let (points, metrics) =
            ForecastReconciler::new().reconcile(&forecasts, &observations, City::HaNoi);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].predicted, 25.0);
        assert_eq!(points[0].actual, 24.0);
        assert_eq!(points[0].absolute_error, 1.0);
        assert_eq!(metrics.mae, Some(1.0));
        assert_eq!(metrics.rmse, Some(1.0));
    }

    #[test]
    fn unmatched_forecast_is_dropped() {
        let forecasts = vec![
            forecast("2024-01-01T09:00:00+07:00", 25.0),
            forecast("2024-01-01T10:00:00+07:00", 26.0),
        ];
        let observations = vec![observation("2024-01-01T10:00:00+07:00", 25.5)];

        let (points, metrics) =
            ForecastReconciler::new().reconcile(&forecasts, &observations, City::HaNoi);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].timestamp, at("2024-01-01T10:00:00+07:00"));
        assert_eq!(metrics.mae, Some(0.5));
        assert_eq!(metrics.matched, 1);
    }

    #[test]
    fn mixed_offsets_match_the_same_instant() {
        let forecasts = vec![forecast("2024-01-01T02:00:00Z", 25.0)];
        let observations = vec![observation("2024-01-01T09:00:00+07:00", 25.0)];

        let (points, metrics) =
            ForecastReconciler::new().reconcile(&forecasts, &observations, City::HaNoi);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].timestamp.to_rfc3339(), "2024-01-01T09:00:00+07:00");
        assert_eq!(metrics.mae, Some(0.0));
    }

    #[test]
    fn no_overlap_returns_empty_and_no_data() {
        let forecasts = vec![forecast("2024-01-01T09:00:00+07:00", 25.0)];
        let observations = vec![observation("2024-01-01T09:05:00+07:00", 25.0)];

        let (points, metrics) =
            ForecastReconciler::new().reconcile(&forecasts, &observations, City::HaNoi);

        assert!(points.is_empty());
        assert_eq!(metrics, AccuracyMetrics::no_data());
    }

    #[test]
    fn empty_inputs_do_not_fail() {
        let (points, metrics) = ForecastReconciler::new().reconcile(&[], &[], City::DaNang);
        assert!(points.is_empty());
        assert!(metrics.mae.is_none());
    }

    #[test]
    fn other_cities_are_ignored() {
        let forecasts = vec![forecast("2024-01-01T09:00:00+07:00", 25.0)];
        let mut saigon = observation("2024-01-01T09:00:00+07:00", 30.0);
        saigon.source_city = City::HoChiMinh;

        let (points, _) = ForecastReconciler::new().reconcile(&forecasts, &[saigon], City::HaNoi);
        assert!(points.is_empty());
    }

    #[test]
    fn latest_model_run_wins_for_duplicate_targets() {
        let forecasts = vec![
            forecast_run("2024-01-01T09:00:00+07:00", 30.0, "2024-01-01T06:00:00+07:00"),
            forecast_run("2024-01-01T09:00:00+07:00", 25.0, "2024-01-01T08:00:00+07:00"),
            forecast_run("2024-01-01T09:00:00+07:00", 20.0, "2024-01-01T07:00:00+07:00"),
        ];
        let observations = vec![observation("2024-01-01T09:00:00+07:00", 24.0)];

        let (points, _) =
            ForecastReconciler::new().reconcile(&forecasts, &observations, City::HaNoi);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].predicted, 25.0);
    }

    #[test]
    fn duplicate_observations_collapse_to_mean() {
        let forecasts = vec![forecast("2024-01-01T09:00:00+07:00", 25.0)];
        let observations = vec![
            observation("2024-01-01T09:00:00+07:00", 24.0),
            observation("2024-01-01T02:00:00Z", 26.0),
        ];

        let (points, metrics) =
            ForecastReconciler::new().reconcile(&forecasts, &observations, City::HaNoi);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].actual, 25.0);
        assert_eq!(metrics.mae, Some(0.0));
    }

    #[test]
    fn points_are_sorted_ascending() {
        let forecasts = vec![
            forecast("2024-01-01T11:00:00+07:00", 27.0),
            forecast("2024-01-01T09:00:00+07:00", 25.0),
            forecast("2024-01-01T10:00:00+07:00", 26.0),
        ];
        let observations = vec![
            observation("2024-01-01T10:00:00+07:00", 26.0),
            observation("2024-01-01T11:00:00+07:00", 28.0),
            observation("2024-01-01T09:00:00+07:00", 24.0),
        ];

        let (points, metrics) =
            ForecastReconciler::new().reconcile(&forecasts, &observations, City::HaNoi);

        let hours: Vec<String> = points
            .iter()
            .map(|p| p.timestamp.format("%H").to_string())
            .collect();
        assert_eq!(hours, vec!["09", "10", "11"]);
        let mae = metrics.mae.unwrap();
        let rmse = metrics.rmse.unwrap();
        assert!((mae - 2.0 / 3.0).abs() < 1e-12);
        assert!((rmse - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }
}
