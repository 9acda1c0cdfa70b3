use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::models::{round2, AdoptionForecast, ConfidenceBand, ForecastPoint, HistoricalPoint};

pub const DEFAULT_FORECAST_PERIODS: i64 = 12;

const FALLBACK_BASE_RATE: f64 = 0.65;
const FALLBACK_GROWTH_RATE: f64 = 0.05;
const MIN_RATE: f64 = 0.10;
const MAX_RATE: f64 = 0.95;
const BAND_HALF_WIDTH: f64 = 0.05;
const PERIOD_DAYS: i64 = 30;

pub fn forecast_adoption(
    history: &[HistoricalPoint],
    forecast_periods: i64,
    as_of: DateTime<Utc>,
) -> Result<AdoptionForecast> {
    if forecast_periods < 1 {
        return Err(EngineError::Validation(format!(
            "forecast_periods must be at least 1, got {forecast_periods}"
        )));
    }
    let periods = u32::try_from(forecast_periods).map_err(|_| {
        EngineError::Validation(format!("forecast_periods {forecast_periods} is too large"))
    })?;

    // Reject horizons past the calendar before allocating anything.
    period_timestamp(as_of, periods)?;

    let rates = observed_rates(history)?;
    let (base_rate, growth_rate) = trend(&rates);
    debug!(base_rate, growth_rate, periods, "adoption trend");

    let mut predictions = Vec::with_capacity(periods as usize);
    let mut confidence_intervals = Vec::with_capacity(periods as usize);

    for period in 1..=periods {
        let rate = (base_rate + growth_rate * f64::from(period)).clamp(MIN_RATE, MAX_RATE);
        let timestamp = period_timestamp(as_of, period)?;

        predictions.push(ForecastPoint {
            period,
            adoption_rate: round2(rate * 100.0),
            timestamp,
        });
        confidence_intervals.push(ConfidenceBand {
            period,
            lower_bound: ((rate - BAND_HALF_WIDTH) * 100.0).clamp(0.0, 100.0),
            upper_bound: ((rate + BAND_HALF_WIDTH) * 100.0).clamp(0.0, 100.0),
        });
    }

    Ok(AdoptionForecast {
        predictions,
        confidence_intervals,
    })
}

fn period_timestamp(as_of: DateTime<Utc>, period: u32) -> Result<DateTime<Utc>> {
    TimeDelta::try_days(PERIOD_DAYS * i64::from(period))
        .and_then(|offset| as_of.checked_add_signed(offset))
        .ok_or_else(|| {
            EngineError::Validation(format!(
                "period {period} falls outside the representable date range"
            ))
        })
}

fn observed_rates(history: &[HistoricalPoint]) -> Result<Vec<f64>> {
    history
        .iter()
        .enumerate()
        .map(|(index, point)| match point.adoption_rate {
            Some(rate) if rate.is_finite() => Ok(rate),
            Some(rate) => Err(EngineError::Data(format!(
                "historical point {index} has non-finite adoption_rate {rate}"
            ))),
            None => Err(EngineError::Data(format!(
                "historical point {index} is missing adoption_rate"
            ))),
        })
        .collect()
}

fn trend(rates: &[f64]) -> (f64, f64) {
    match (rates.first(), rates.last()) {
        (Some(first), Some(last)) if rates.len() >= 2 => {
            let base = last / 100.0;
            let growth = (last - first) / rates.len() as f64 / 100.0;
            (base, growth)
        }
        _ => (FALLBACK_BASE_RATE, FALLBACK_GROWTH_RATE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn points(rates: &[f64]) -> Vec<HistoricalPoint> {
        rates
            .iter()
            .map(|rate| HistoricalPoint {
                adoption_rate: Some(*rate),
            })
            .collect()
    }

    #[test]
    fn extends_average_slope_of_window() {
        let forecast = forecast_adoption(&points(&[50.0, 70.0]), 2, as_of()).unwrap();
        assert_eq!(forecast.predictions.len(), 2);
        assert!((forecast.predictions[0].adoption_rate - 80.0).abs() < 1e-9);
        assert!((forecast.predictions[1].adoption_rate - 90.0).abs() < 1e-9);
        assert!((forecast.confidence_intervals[0].lower_bound - 75.0).abs() < 1e-9);
        assert!((forecast.confidence_intervals[0].upper_bound - 85.0).abs() < 1e-9);
    }

    #[test]
    fn bands_keep_full_precision() {
        // base 0.33337, growth 0.00002 per period
        let forecast = forecast_adoption(&points(&[33.333, 33.337]), 1, as_of()).unwrap();
        assert!((forecast.predictions[0].adoption_rate - 33.34).abs() < 1e-9);
        assert!((forecast.confidence_intervals[0].lower_bound - 28.339).abs() < 1e-9);
        assert!((forecast.confidence_intervals[0].upper_bound - 38.339).abs() < 1e-9);
    }

    #[test]
    fn short_history_uses_fallback_trend() {
        let forecast = forecast_adoption(&points(&[20.0]), 1, as_of()).unwrap();
        assert!((forecast.predictions[0].adoption_rate - 70.0).abs() < 1e-9);

        let empty = forecast_adoption(&[], 1, as_of()).unwrap();
        assert_eq!(empty.predictions, forecast.predictions);
    }

    #[test]
    fn periods_are_sequential_and_rates_bounded() {
        let forecast = forecast_adoption(&points(&[5.0, 90.0]), 24, as_of()).unwrap();
        assert_eq!(forecast.predictions.len(), 24);
        assert_eq!(forecast.confidence_intervals.len(), 24);
        for (index, point) in forecast.predictions.iter().enumerate() {
            assert_eq!(point.period as usize, index + 1);
            assert!(point.adoption_rate >= 10.0 && point.adoption_rate <= 95.0);
        }
        assert!((forecast.predictions[23].adoption_rate - 95.0).abs() < 1e-9);
        assert!((forecast.confidence_intervals[23].upper_bound - 100.0).abs() < 1e-9);
    }

    #[test]
    fn steep_decline_saturates_at_floor() {
        let forecast = forecast_adoption(&points(&[100.0, 0.0]), 3, as_of()).unwrap();
        for (point, band) in forecast
            .predictions
            .iter()
            .zip(forecast.confidence_intervals.iter())
        {
            assert!((point.adoption_rate - 10.0).abs() < 1e-9);
            assert!((band.lower_bound - 5.0).abs() < 1e-9);
            assert!(band.lower_bound >= 0.0);
        }
    }

    #[test]
    fn timestamps_step_thirty_days() {
        let forecast = forecast_adoption(&points(&[40.0, 45.0]), 3, as_of()).unwrap();
        for point in forecast.predictions.iter() {
            let expected = as_of() + TimeDelta::days(30 * i64::from(point.period));
            assert_eq!(point.timestamp, expected);
        }
    }

    #[test]
    fn rejects_non_positive_periods() {
        for periods in [0, -3] {
            let err = forecast_adoption(&points(&[10.0, 20.0]), periods, as_of()).unwrap_err();
            assert!(matches!(err, EngineError::Validation(_)));
        }
    }

    #[test]
    fn rejects_horizon_past_calendar() {
        let err = forecast_adoption(&[], i64::from(u32::MAX), as_of()).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        let err = forecast_adoption(&[], i64::MAX, as_of()).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn missing_rate_is_a_data_error() {
        let mut history = points(&[10.0, 20.0, 30.0]);
        history[1].adoption_rate = None;
        let err = forecast_adoption(&history, 4, as_of()).unwrap_err();
        assert_eq!(
            err,
            EngineError::Data("historical point 1 is missing adoption_rate".to_string())
        );
    }

    #[test]
    fn repeated_calls_are_identical() {
        let history = points(&[33.0, 41.5, 47.25]);
        let first = forecast_adoption(&history, 12, as_of()).unwrap();
        let second = forecast_adoption(&history, 12, as_of()).unwrap();
        assert_eq!(first, second);
    }
}
