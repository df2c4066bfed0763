//! Regression models for per-meal demand

use crate::error::Result;
use crate::features::{FeatureVector, TrainingSet};
use std::fmt::Debug;

/// Trained regression model
pub trait TrainedRegressor: Debug + Send + Sync {
    /// Point estimate for one feature vector
    fn predict(&self, features: &FeatureVector) -> f64;

    /// Name of the model
    fn name(&self) -> &str;

    /// Predict a batch of feature vectors
    fn predict_all(&self, features: &[FeatureVector]) -> Vec<f64> {
        features.iter().map(|f| self.predict(f)).collect()
    }
}

/// Regression model that can be fit on feature/target pairs
pub trait RegressionModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedRegressor + 'static;

    /// Fit the model
    fn fit(&self, samples: &TrainingSet) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

pub mod baseline;
pub mod forest;
pub mod tree;
