//! Persisted forecast rows and the writes that produce them

use crate::data::{MealCategory, Observation};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One row of the forecast table, unique per (date, meal)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub date: NaiveDate,
    pub meal: MealCategory,
    pub predicted_servings: Option<i64>,
    pub actual_servings: Option<i64>,
    /// Realized scholarship share of `actual_servings`
    pub actual_scholarship_servings: Option<i64>,
    /// Realized regular share of `actual_servings`
    pub actual_regular_servings: Option<i64>,
    /// Computed by the store; writers never supply it
    pub absolute_error: Option<i64>,
    pub model_version: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ForecastRecord {
    /// Whether the realized value is still missing
    pub fn is_pending(&self) -> bool {
        self.actual_servings.is_none()
    }
}

/// Forecast-leg write: touches prediction columns only
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictionWrite {
    pub date: NaiveDate,
    pub meal: MealCategory,
    pub predicted_servings: i64,
    pub model_version: String,
}

/// Reconciliation-leg write: touches realized columns only
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RealizedWrite {
    pub date: NaiveDate,
    pub meal: MealCategory,
    pub actual_servings: i64,
    pub scholarship_servings: Option<i64>,
    pub regular_servings: Option<i64>,
}

impl RealizedWrite {
    /// Realized values of a closed observation
    pub fn from_observation(obs: &Observation) -> Self {
        Self {
            date: obs.date,
            meal: obs.meal,
            actual_servings: i64::from(obs.servings_total),
            scholarship_servings: obs.scholarship_rations.map(i64::from),
            regular_servings: obs.regular_rations.map(i64::from),
        }
    }
}
