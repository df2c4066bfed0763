//! Model Trainer: one independent regressor per meal

use crate::data::{History, MealCategory};
use crate::error::{ForecastError, Result};
use crate::features::{FeatureBuilder, TrainingSet};
use crate::metrics::{forecast_accuracy, ForecastAccuracy};
use crate::models::baseline::TrailingMeanBaseline;
use crate::models::{RegressionModel, TrainedRegressor};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Holdout comparison of the model against the trailing-mean baseline
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub train_rows: usize,
    pub holdout_rows: usize,
    pub model: ForecastAccuracy,
    pub baseline: ForecastAccuracy,
}

/// Fitted models keyed by meal, plus the meals that could not be fit
#[derive(Debug, Default)]
pub struct TrainedModels {
    models: BTreeMap<MealCategory, Box<dyn TrainedRegressor>>,
    validation: BTreeMap<MealCategory, ValidationReport>,
    skipped: Vec<(MealCategory, ForecastError)>,
}

impl TrainedModels {
    /// Model for a meal, if it was fit
    pub fn get(&self, meal: MealCategory) -> Option<&dyn TrainedRegressor> {
        self.models.get(&meal).map(|m| m.as_ref())
    }

    /// Register a fitted model
    pub fn insert(&mut self, meal: MealCategory, model: Box<dyn TrainedRegressor>) {
        self.models.insert(meal, model);
    }

    /// Meals with a model, in serving order
    pub fn meals(&self) -> impl Iterator<Item = MealCategory> + '_ {
        self.models.keys().copied()
    }

    /// Holdout report for a meal
    pub fn validation(&self, meal: MealCategory) -> Option<&ValidationReport> {
        self.validation.get(&meal)
    }

    /// Meals skipped this run and why
    pub fn skipped(&self) -> &[(MealCategory, ForecastError)] {
        &self.skipped
    }

    /// Number of fitted models
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether no meal could be fit
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Fits `M` separately for every meal category
#[derive(Debug, Clone)]
pub struct ModelTrainer<M: RegressionModel> {
    model: M,
    features: FeatureBuilder,
    min_training_rows: usize,
    validation_fraction: f64,
}

impl<M: RegressionModel> ModelTrainer<M> {
    /// Create a trainer
    pub fn new(
        model: M,
        features: FeatureBuilder,
        min_training_rows: usize,
        validation_fraction: f64,
    ) -> Self {
        Self {
            model,
            features,
            min_training_rows,
            validation_fraction,
        }
    }

    /// Fit one model per meal; a failing meal is recorded and skipped
    pub fn train_all(&self, history: &History) -> TrainedModels {
        let mut trained = TrainedModels::default();
        for meal in MealCategory::ALL {
            match self.train_meal(history, meal) {
                Ok((model, report)) => {
                    if let Some(report) = report {
                        info!(
                            %meal,
                            model = self.model.name(),
                            train_rows = report.train_rows,
                            holdout_rows = report.holdout_rows,
                            model_mae = report.model.mae,
                            baseline_mae = report.baseline.mae,
                            "holdout validation"
                        );
                        trained.validation.insert(meal, report);
                    }
                    trained.insert(meal, Box::new(model));
                }
                Err(err) => {
                    warn!(%meal, kind = err.kind(), error = %err, "meal skipped for this run");
                    trained.skipped.push((meal, err));
                }
            }
        }
        trained
    }

    /// Fit the model for one meal, with a holdout report when there is room
    pub fn train_meal(
        &self,
        history: &History,
        meal: MealCategory,
    ) -> Result<(M::Trained, Option<ValidationReport>)> {
        let samples = self.features.training_set(history, meal)?;
        if samples.len() < self.min_training_rows {
            return Err(ForecastError::InsufficientHistory {
                meal,
                available: samples.len(),
                required: self.min_training_rows,
            });
        }

        let report = self.validate(&samples)?;
        let model = self.model.fit(&samples)?;
        Ok((model, report))
    }

    fn validate(&self, samples: &TrainingSet) -> Result<Option<ValidationReport>> {
        let holdout = ((samples.len() as f64 * self.validation_fraction).round() as usize).max(1);
        if samples.len() < holdout + 2 {
            return Ok(None);
        }

        let (train, test) = samples.split_tail(holdout);
        let model = self.model.fit(&train)?;
        let baseline = TrailingMeanBaseline.fit(&train)?;

        Ok(Some(ValidationReport {
            train_rows: train.len(),
            holdout_rows: test.len(),
            model: forecast_accuracy(&model.predict_all(&test.features), &test.targets)?,
            baseline: forecast_accuracy(&baseline.predict_all(&test.features), &test.targets)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForestConfig;
    use crate::data::Observation;
    use crate::models::forest::RandomForest;
    use chrono::{Days, NaiveDate};

    fn history(lunch_days: u64, dinner_days: u64) -> History {
        let start = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let mut rows = Vec::new();
        for i in 0..lunch_days {
            let date = start + Days::new(i);
            rows.push(Observation::observed(date, MealCategory::Lunch, 190 + (i % 7) as u32 * 5));
        }
        for i in 0..dinner_days {
            let date = start + Days::new(i);
            rows.push(Observation::observed(date, MealCategory::Dinner, 80));
        }
        History::new(rows)
    }

    fn trainer() -> ModelTrainer<RandomForest> {
        let forest = ForestConfig {
            n_trees: 10,
            ..ForestConfig::default()
        };
        ModelTrainer::new(
            RandomForest::new(&forest, "v1_random_forest").unwrap(),
            FeatureBuilder::new(7).unwrap(),
            14,
            0.2,
        )
    }

    #[test]
    fn short_meal_is_skipped_others_trained() {
        let trained = trainer().train_all(&history(30, 6));

        assert_eq!(trained.meals().collect::<Vec<_>>(), vec![MealCategory::Lunch]);
        let skipped: Vec<_> = trained.skipped().iter().map(|(m, e)| (*m, e.kind())).collect();
        assert_eq!(
            skipped,
            vec![
                (MealCategory::Breakfast, "insufficient_history"),
                (MealCategory::Dinner, "insufficient_history"),
            ]
        );
    }

    #[test]
    fn insufficient_history_reports_counts() {
        let err = trainer()
            .train_meal(&history(0, 10), MealCategory::Dinner)
            .unwrap_err();
        match err {
            ForecastError::InsufficientHistory {
                meal,
                available,
                required,
            } => {
                assert_eq!(meal, MealCategory::Dinner);
                assert_eq!(available, 9);
                assert_eq!(required, 14);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn holdout_is_the_chronological_tail() {
        let trained = trainer().train_all(&history(31, 0));
        let report = trained.validation(MealCategory::Lunch).unwrap();
        // 30 samples, 20% held out
        assert_eq!(report.holdout_rows, 6);
        assert_eq!(report.train_rows, 24);
        assert!(report.model.mae.is_finite());
        assert!(report.baseline.mae.is_finite());
    }
}
