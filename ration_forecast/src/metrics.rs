//! Metrics for evaluating forecast performance

use crate::error::{ForecastError, Result};
use crate::record::ForecastRecord;
use statrs::statistics::Statistics;

/// Calculate accuracy metrics for a forecast vs actual values
pub fn forecast_accuracy(forecast: &[f64], actual: &[f64]) -> Result<ForecastAccuracy> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(ForecastError::DataError(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    let n = forecast.len() as f64;

    let errors: Vec<f64> = forecast
        .iter()
        .zip(actual.iter())
        .map(|(&f, &a)| a - f)
        .collect();

    let mae = errors.iter().map(|e| e.abs()).mean();
    let mse = errors.iter().map(|e| e.powi(2)).mean();
    let rmse = mse.sqrt();

    // zero-demand days carry no percentage error
    let mape = actual
        .iter()
        .zip(errors.iter())
        .filter(|(&a, _)| a != 0.0)
        .map(|(&a, &e)| (e.abs() / a.abs()) * 100.0)
        .sum::<f64>()
        / n;

    let smape = actual
        .iter()
        .zip(forecast.iter())
        .map(|(&a, &f)| {
            let denom = a.abs() + f.abs();
            if denom == 0.0 {
                0.0
            } else {
                200.0 * (a - f).abs() / denom
            }
        })
        .sum::<f64>()
        / n;

    Ok(ForecastAccuracy {
        mae,
        mse,
        rmse,
        mape,
        smape,
    })
}

/// Forecast accuracy metrics
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastAccuracy {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error
    pub mape: f64,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
}

impl std::fmt::Display for ForecastAccuracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MAE {:.2}, RMSE {:.2}, MAPE {:.2}%, SMAPE {:.2}%",
            self.mae, self.rmse, self.mape, self.smape
        )
    }
}

/// Summary of stored errors over reconciled rows
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ReconciledAccuracy {
    /// Rows with both sides filled
    pub count: usize,
    /// Mean of the stored absolute errors
    pub mae: f64,
    /// Largest stored absolute error
    pub max_error: i64,
}

/// Summarise `absolute_error` over the reconciled rows in `records`.
///
/// Reads the store-computed column rather than recomputing it; `None` when
/// no row has been reconciled.
pub fn reconciled_accuracy(records: &[ForecastRecord]) -> Option<ReconciledAccuracy> {
    let errors: Vec<i64> = records.iter().filter_map(|r| r.absolute_error).collect();
    if errors.is_empty() {
        return None;
    }
    let mae = errors.iter().map(|&e| e as f64).mean();
    let max_error = errors.iter().copied().max().unwrap_or(0);
    Some(ReconciledAccuracy {
        count: errors.len(),
        mae,
        max_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MealCategory;
    use approx::assert_relative_eq;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn regression_metrics() {
        let actual = vec![10.0, 20.0, 30.0, 40.0, 50.0];
        let predicted = vec![12.0, 18.0, 33.0, 37.0, 52.0];

        let acc = forecast_accuracy(&predicted, &actual).unwrap();
        assert_relative_eq!(acc.mae, 2.4, epsilon = 1e-9);
        assert_relative_eq!(acc.mse, 6.0, epsilon = 1e-9);
        assert_relative_eq!(acc.rmse, 6.0_f64.sqrt(), epsilon = 1e-9);
        assert!(acc.mape > 0.0 && acc.mape < 15.0);
        assert!(acc.smape > 0.0 && acc.smape < 15.0);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert!(forecast_accuracy(&[1.0], &[1.0, 2.0]).is_err());
        assert!(forecast_accuracy(&[], &[]).is_err());
    }

    #[test]
    fn zero_actuals_do_not_blow_up() {
        let acc = forecast_accuracy(&[0.0, 5.0], &[0.0, 0.0]).unwrap();
        assert_eq!(acc.mape, 0.0);
        assert_relative_eq!(acc.smape, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn reconciled_summary_reads_stored_errors() {
        let record = |error: Option<i64>| ForecastRecord {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            meal: MealCategory::Lunch,
            predicted_servings: Some(210),
            actual_servings: error.map(|e| 210 - e),
            actual_scholarship_servings: None,
            actual_regular_servings: None,
            absolute_error: error,
            model_version: Some("v1_random_forest".into()),
            updated_at: Utc::now(),
        };
        let summary =
            reconciled_accuracy(&[record(Some(12)), record(None), record(Some(4))]).unwrap();
        assert_eq!(summary.count, 2);
        assert_relative_eq!(summary.mae, 8.0, epsilon = 1e-9);
        assert_eq!(summary.max_error, 12);
        assert!(reconciled_accuracy(&[record(None)]).is_none());
    }
}
