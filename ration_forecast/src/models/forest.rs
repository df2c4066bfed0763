//! Bagged regression-tree ensemble

use crate::config::ForestConfig;
use crate::error::{ForecastError, Result};
use crate::features::{FeatureVector, TrainingSet, FEATURE_COUNT};
use crate::models::tree::{RegressionTree, TreeParams};
use crate::models::{RegressionModel, TrainedRegressor};
use meal_math::BootstrapSampler;

/// Random forest regressor.
///
/// Every tree is grown on a bootstrap resample drawn from its own seeded
/// stream, so a fixed seed gives identical forests across runs.
#[derive(Debug, Clone)]
pub struct RandomForest {
    name: String,
    n_trees: usize,
    params: TreeParams,
    sampler: BootstrapSampler,
}

/// Trained random forest
#[derive(Debug, Clone)]
pub struct TrainedRandomForest {
    name: String,
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    /// Create a forest from its configuration
    pub fn new(config: &ForestConfig, name: impl Into<String>) -> Result<Self> {
        if config.n_trees == 0 {
            return Err(ForecastError::InvalidParameter(
                "Forest needs at least one tree".to_string(),
            ));
        }
        if config.min_samples_leaf == 0 {
            return Err(ForecastError::InvalidParameter(
                "min_samples_leaf must be positive".to_string(),
            ));
        }
        let max_features = config.max_features.unwrap_or(FEATURE_COUNT);
        if max_features == 0 || max_features > FEATURE_COUNT {
            return Err(ForecastError::InvalidParameter(format!(
                "max_features must be between 1 and {}",
                FEATURE_COUNT
            )));
        }

        Ok(Self {
            name: name.into(),
            n_trees: config.n_trees,
            params: TreeParams {
                max_depth: config.max_depth,
                min_samples_leaf: config.min_samples_leaf,
                max_features,
            },
            sampler: BootstrapSampler::new(config.seed),
        })
    }

    /// Number of trees
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }
}

impl RegressionModel for RandomForest {
    type Trained = TrainedRandomForest;

    fn fit(&self, samples: &TrainingSet) -> Result<Self::Trained> {
        if samples.is_empty() {
            return Err(ForecastError::DataError(
                "Empty training set".to_string(),
            ));
        }

        let mut trees = Vec::with_capacity(self.n_trees);
        for t in 0..self.n_trees {
            let mut rng = self.sampler.rng(t);
            let indices = BootstrapSampler::resample(&mut rng, samples.len())?;
            trees.push(RegressionTree::fit(samples, &indices, self.params, &mut rng)?);
        }

        Ok(TrainedRandomForest {
            name: self.name.clone(),
            trees,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedRandomForest {
    /// Number of fitted trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl TrainedRegressor for TrainedRandomForest {
    fn predict(&self, features: &FeatureVector) -> f64 {
        self.trees.iter().map(|t| t.predict(features)).sum::<f64>() / self.trees.len() as f64
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn weekly_pattern() -> TrainingSet {
        let mut set = TrainingSet::default();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for i in 0..42u64 {
            let weekday = (i % 7) as usize;
            let mut v = [0.0; FEATURE_COUNT];
            v[weekday] = 1.0;
            v[7] = if weekday >= 5 { 1.0 } else { 0.0 };
            set.dates.push(start + chrono::Days::new(i));
            set.features.push(FeatureVector(v));
            set.targets.push(if weekday >= 5 { 40.0 } else { 220.0 });
        }
        set
    }

    fn config(seed: u64) -> ForestConfig {
        ForestConfig {
            n_trees: 20,
            max_depth: 6,
            min_samples_leaf: 1,
            max_features: None,
            seed,
        }
    }

    #[test]
    fn fixed_seed_is_deterministic() {
        let data = weekly_pattern();
        let a = RandomForest::new(&config(42), "rf").unwrap().fit(&data).unwrap();
        let b = RandomForest::new(&config(42), "rf").unwrap().fit(&data).unwrap();
        for f in &data.features {
            assert_eq!(a.predict(f), b.predict(f));
        }
        assert_eq!(a.n_trees(), 20);
    }

    #[test]
    fn separates_weekends() {
        let data = weekly_pattern();
        let model = RandomForest::new(&config(7), "rf").unwrap().fit(&data).unwrap();
        assert!(model.predict(&data.features[5]) < 100.0);
        assert!(model.predict(&data.features[1]) > 150.0);
    }

    #[test]
    fn predictions_stay_within_target_range() {
        let data = weekly_pattern();
        let model = RandomForest::new(&config(1), "rf").unwrap().fit(&data).unwrap();
        for p in model.predict_all(&data.features) {
            assert!((40.0..=220.0).contains(&p));
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let mut bad = config(1);
        bad.n_trees = 0;
        assert!(RandomForest::new(&bad, "rf").is_err());
        let mut bad = config(1);
        bad.max_features = Some(FEATURE_COUNT + 1);
        assert!(RandomForest::new(&bad, "rf").is_err());
        assert!(RandomForest::new(&config(1), "rf")
            .unwrap()
            .fit(&TrainingSet::default())
            .is_err());
    }
}
