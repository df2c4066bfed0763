//! Offline evaluation against an exported demand file

use crate::config::PipelineConfig;
use crate::data::{History, MealCategory};
use crate::error::Result;
use crate::features::FeatureBuilder;
use crate::forecaster::Forecaster;
use crate::metrics::{forecast_accuracy, ForecastAccuracy};
use crate::models::forest::RandomForest;
use crate::trainer::ModelTrainer;
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use tracing::info;

/// One forecast row next to what was actually served
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BacktestRow {
    pub date: NaiveDate,
    pub meal: MealCategory,
    pub predicted: i64,
    pub actual: Option<i64>,
    pub absolute_error: Option<i64>,
}

/// Rows plus per-meal accuracy over the rows that have an actual value
#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub rows: Vec<BacktestRow>,
    pub accuracy: BTreeMap<MealCategory, ForecastAccuracy>,
}

/// Train on rows before `as_of` and forecast the horizon, exactly as a
/// pipeline run on that date would, then compare with the file's later rows.
pub fn run_backtest(history: &History, config: &PipelineConfig, as_of: NaiveDate) -> Result<BacktestReport> {
    config.validate()?;
    let features = FeatureBuilder::new(config.rolling_window)?;
    let model = RandomForest::new(&config.forest, config.model_version.clone())?;
    let trainer = ModelTrainer::new(
        model,
        features,
        config.min_training_rows,
        config.validation_fraction,
    );
    let forecaster = Forecaster::new(features, config.horizon_days, config.model_version.clone());

    let from = as_of
        .checked_sub_days(Days::new(u64::from(config.lookback_days)))
        .unwrap_or(NaiveDate::MIN);
    let training = History::new(history.between(from, as_of).to_vec());
    let models = trainer.train_all(&training);
    let writes = forecaster.forecast(&training, &models, as_of)?;

    let rows: Vec<BacktestRow> = writes
        .into_iter()
        .map(|w| {
            let actual = history
                .get(w.date, w.meal)
                .map(|o| i64::from(o.servings_total));
            BacktestRow {
                date: w.date,
                meal: w.meal,
                predicted: w.predicted_servings,
                actual,
                absolute_error: actual.map(|a| (w.predicted_servings - a).abs()),
            }
        })
        .collect();

    let mut accuracy = BTreeMap::new();
    for meal in MealCategory::ALL {
        let (predicted, actual): (Vec<f64>, Vec<f64>) = rows
            .iter()
            .filter(|r| r.meal == meal)
            .filter_map(|r| r.actual.map(|a| (r.predicted as f64, a as f64)))
            .unzip();
        if predicted.is_empty() {
            continue;
        }
        let acc = forecast_accuracy(&predicted, &actual)?;
        info!(%meal, rows = predicted.len(), mae = acc.mae, rmse = acc.rmse, "backtest accuracy");
        accuracy.insert(meal, acc);
    }

    Ok(BacktestReport { rows, accuracy })
}

/// Write backtest rows as CSV
pub fn write_csv<W: Write>(rows: &[BacktestRow], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
