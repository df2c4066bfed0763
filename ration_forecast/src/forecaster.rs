//! Forecaster: point estimates for the next N days

use crate::data::History;
use crate::error::Result;
use crate::features::FeatureBuilder;
use crate::record::PredictionWrite;
use crate::trainer::TrainedModels;
use chrono::{Days, NaiveDate};
use tracing::{info, warn};

/// Round a raw model output to a ration count, clamped at zero.
///
/// Non-finite outputs have no meaningful count and yield `None`.
pub fn to_servings(raw: f64) -> Option<i64> {
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().max(0.0) as i64)
}

/// Projects features over the horizon and queries each meal's model
#[derive(Debug, Clone)]
pub struct Forecaster {
    features: FeatureBuilder,
    horizon_days: u32,
    model_version: String,
}

impl Forecaster {
    /// Create a forecaster
    pub fn new(features: FeatureBuilder, horizon_days: u32, model_version: impl Into<String>) -> Self {
        Self {
            features,
            horizon_days,
            model_version: model_version.into(),
        }
    }

    /// Dates covered by a run as of `as_of`: `as_of .. as_of + N`
    pub fn horizon(&self, as_of: NaiveDate) -> Vec<NaiveDate> {
        (0..u64::from(self.horizon_days))
            .filter_map(|i| as_of.checked_add_days(Days::new(i)))
            .collect()
    }

    /// Predictions for every meal with a model and every horizon date.
    ///
    /// Features come from observed history only; earlier predictions of
    /// this run are never fed back in.
    pub fn forecast(
        &self,
        history: &History,
        models: &TrainedModels,
        as_of: NaiveDate,
    ) -> Result<Vec<PredictionWrite>> {
        let observed = History::new(history.before(as_of).to_vec());
        let mut writes = Vec::new();

        for meal in models.meals() {
            let Some(model) = models.get(meal) else {
                continue;
            };
            for date in self.horizon(as_of) {
                let features = self.features.build(&observed, date, meal)?;
                let raw = model.predict(&features);
                let Some(servings) = to_servings(raw) else {
                    warn!(%date, %meal, raw, "model produced a non-finite value, row skipped");
                    continue;
                };
                writes.push(PredictionWrite {
                    date,
                    meal,
                    predicted_servings: servings,
                    model_version: self.model_version.clone(),
                });
            }
        }

        writes.sort_by_key(|w| (w.date, w.meal));
        info!(%as_of, rows = writes.len(), meals = models.len(), "forecast produced");
        Ok(writes)
    }
}
