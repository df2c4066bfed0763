//! Trailing-mean reference model

use crate::error::{ForecastError, Result};
use crate::features::{FeatureVector, TrainingSet, MEAL_TRAILING_MEAN};
use crate::models::{RegressionModel, TrainedRegressor};

/// Predicts the same-meal trailing mean feature as-is
#[derive(Debug, Clone, Default)]
pub struct TrailingMeanBaseline;

/// Trained trailing-mean baseline
#[derive(Debug, Clone)]
pub struct TrainedTrailingMean;

impl RegressionModel for TrailingMeanBaseline {
    type Trained = TrainedTrailingMean;

    fn fit(&self, samples: &TrainingSet) -> Result<Self::Trained> {
        if samples.is_empty() {
            return Err(ForecastError::DataError(
                "Empty training set".to_string(),
            ));
        }
        Ok(TrainedTrailingMean)
    }

    fn name(&self) -> &str {
        "trailing_mean"
    }
}

impl TrainedRegressor for TrainedTrailingMean {
    fn predict(&self, features: &FeatureVector) -> f64 {
        features.get(MEAL_TRAILING_MEAN)
    }

    fn name(&self) -> &str {
        "trailing_mean"
    }
}
