//! Feature construction shared by training and prediction
//!
//! Both the trainer and the forecaster go through [`FeatureBuilder::build`],
//! so a feature is computed the same way whether the target date is a past
//! observation or a day in the forecast horizon. Only rows dated strictly
//! before the target date are visible to the builder.
//!
//! Fallbacks when history is short:
//! - trailing statistics over fewer than `k` rows use the rows that exist;
//! - variance over fewer than two rows is `0.0`;
//! - no same-meal rows at all: same-meal mean takes the all-meal mean;
//! - no rows at all: every history feature is `0.0`;
//! - previous value and same-weekday lag fall back to the same-meal mean;
//! - days since the last same-meal row is `0.0` when there is none.

use crate::data::{History, MealCategory, Observation};
use crate::error::Result;
use chrono::{Datelike, NaiveDate};
use meal_math::TrailingWindow;

/// Width of every feature vector.
///
/// Columns, in order: one-hot weekday (Mon..Sun), weekend flag, month,
/// same-meal trailing mean and variance, all-meals trailing mean,
/// previous same-meal value, same-weekday value, days since the meal was
/// last served.
pub const FEATURE_COUNT: usize = 15;

/// Index of the same-meal trailing mean column
pub const MEAL_TRAILING_MEAN: usize = 9;

/// Fixed-width numeric description of one (date, meal)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    /// Column values
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Value of one column
    pub fn get(&self, index: usize) -> f64 {
        self.0[index]
    }
}

/// Feature/target pairs for one meal, in date order
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub dates: Vec<NaiveDate>,
    pub features: Vec<FeatureVector>,
    pub targets: Vec<f64>,
}

impl TrainingSet {
    /// Number of samples
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Check if there are no samples
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Split chronologically, the second part holding the last `tail` samples
    pub fn split_tail(&self, tail: usize) -> (TrainingSet, TrainingSet) {
        let cut = self.len().saturating_sub(tail);
        let head = TrainingSet {
            dates: self.dates[..cut].to_vec(),
            features: self.features[..cut].to_vec(),
            targets: self.targets[..cut].to_vec(),
        };
        let rest = TrainingSet {
            dates: self.dates[cut..].to_vec(),
            features: self.features[cut..].to_vec(),
            targets: self.targets[cut..].to_vec(),
        };
        (head, rest)
    }

    fn push(&mut self, date: NaiveDate, features: FeatureVector, target: f64) {
        self.dates.push(date);
        self.features.push(features);
        self.targets.push(target);
    }
}

/// Builds feature vectors from observed history
#[derive(Debug, Clone, Copy)]
pub struct FeatureBuilder {
    rolling_window: usize,
}

impl FeatureBuilder {
    /// Create a builder with trailing window `k`
    pub fn new(rolling_window: usize) -> Result<Self> {
        // validates k > 0
        TrailingWindow::new(rolling_window)?;
        Ok(Self { rolling_window })
    }

    /// Features for `meal` on `date`, from rows strictly before `date`
    pub fn build(&self, history: &History, date: NaiveDate, meal: MealCategory) -> Result<FeatureVector> {
        let prior = history.before(date);
        let same_meal: Vec<&Observation> = prior.iter().filter(|o| o.meal == meal).collect();

        let mut v = [0.0; FEATURE_COUNT];

        let weekday = date.weekday().num_days_from_monday() as usize;
        v[weekday] = 1.0;
        v[7] = if weekday >= 5 { 1.0 } else { 0.0 };
        v[8] = date.month() as f64;

        let all_values: Vec<f64> = prior
            .iter()
            .map(|o| o.servings_total as f64)
            .collect();
        let all_meals = TrailingWindow::from_slice(self.rolling_window, &all_values)?;
        let all_mean = all_meals.mean().unwrap_or(0.0);

        let meal_values: Vec<f64> = same_meal.iter().map(|o| o.servings_total as f64).collect();
        let meal_window = TrailingWindow::from_slice(self.rolling_window, &meal_values)?;
        let meal_mean = meal_window.mean().unwrap_or(all_mean);

        v[MEAL_TRAILING_MEAN] = meal_mean;
        v[10] = meal_window.variance();
        v[11] = all_mean;
        v[12] = meal_window.last().unwrap_or(meal_mean);
        v[13] = same_meal
            .iter()
            .rev()
            .find(|o| o.date.weekday() == date.weekday())
            .map(|o| o.servings_total as f64)
            .unwrap_or(meal_mean);
        v[14] = same_meal
            .last()
            .map(|o| (date - o.date).num_days() as f64)
            .unwrap_or(0.0);

        Ok(FeatureVector(v))
    }

    /// Samples for every observation of `meal` that has an earlier same-meal row
    pub fn training_set(&self, history: &History, meal: MealCategory) -> Result<TrainingSet> {
        let mut set = TrainingSet::default();
        let mut seen_meal = false;
        for obs in history.for_meal(meal) {
            if !seen_meal {
                seen_meal = true;
                continue;
            }
            let features = self.build(history, obs.date, meal)?;
            set.push(obs.date, features, obs.servings_total as f64);
        }
        Ok(set)
    }
}
