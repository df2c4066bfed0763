//! One pipeline execution: reconcile the past, then forecast the future

use crate::config::PipelineConfig;
use crate::data::MealCategory;
use crate::error::Result;
use crate::features::FeatureBuilder;
use crate::forecaster::Forecaster;
use crate::history::HistoryReader;
use crate::metrics::{reconciled_accuracy, ReconciledAccuracy};
use crate::models::forest::RandomForest;
use crate::models::RegressionModel;
use crate::reconciler::{ReconcileSummary, Reconciler};
use crate::retry::RetryPolicy;
use crate::store::DemandStore;
use crate::trainer::ModelTrainer;
use crate::writer::ResultWriter;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of the forecast leg
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForecastSummary {
    pub history_rows: usize,
    pub rows_written: usize,
    pub meals_forecast: Vec<MealCategory>,
    pub meals_skipped: Vec<MealCategory>,
}

/// Outcome of a full run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub as_of: NaiveDate,
    pub reconcile: ReconcileSummary,
    pub forecast: ForecastSummary,
    /// Stored errors of reconciled rows inside the lookback window
    pub accuracy: Option<ReconciledAccuracy>,
}

/// The forecasting-and-reconciliation pipeline
#[derive(Debug, Clone)]
pub struct Pipeline<M: RegressionModel = RandomForest> {
    reader: HistoryReader,
    reconciler: Reconciler,
    trainer: ModelTrainer<M>,
    forecaster: Forecaster,
    writer: ResultWriter,
    retry: RetryPolicy,
}

impl Pipeline<RandomForest> {
    /// Pipeline with the configured random forest
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let model = RandomForest::new(&config.forest, config.model_version.clone())?;
        Self::with_model(config, model)
    }
}

impl<M: RegressionModel> Pipeline<M> {
    /// Pipeline around any regression model
    pub fn with_model(config: &PipelineConfig, model: M) -> Result<Self> {
        config.validate()?;
        let retry = config.retry.policy();
        let features = FeatureBuilder::new(config.rolling_window)?;
        let reader = HistoryReader::new(config.lookback_days, retry);
        let writer = ResultWriter::new(retry);

        Ok(Self {
            reconciler: Reconciler::new(reader.clone(), writer.clone(), retry),
            trainer: ModelTrainer::new(
                model,
                features,
                config.min_training_rows,
                config.validation_fraction,
            ),
            forecaster: Forecaster::new(features, config.horizon_days, config.model_version.clone()),
            reader,
            writer,
            retry,
        })
    }

    /// Retry policy applied to store calls
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Reconciliation leg
    pub async fn reconcile_leg<S: DemandStore + ?Sized>(
        &self,
        store: &S,
        as_of: NaiveDate,
    ) -> Result<ReconcileSummary> {
        self.reconciler.reconcile(store, as_of).await
    }

    /// Forecast leg: read history, fit per meal, write the horizon
    pub async fn forecast_leg<S: DemandStore + ?Sized>(
        &self,
        store: &S,
        as_of: NaiveDate,
    ) -> Result<ForecastSummary> {
        let history = self.reader.read(store, as_of).await?;
        let models = self.trainer.train_all(&history);
        if models.is_empty() {
            warn!(%as_of, "no meal has enough history, nothing forecast");
        }

        let writes = self.forecaster.forecast(&history, &models, as_of)?;
        let rows_written = self.writer.write_predictions(store, &writes).await?;

        Ok(ForecastSummary {
            history_rows: history.len(),
            rows_written,
            meals_forecast: models.meals().collect(),
            meals_skipped: models.skipped().iter().map(|(meal, _)| *meal).collect(),
        })
    }

    /// Reconcile, then forecast. A failing leg fails the run.
    pub async fn run<S: DemandStore + ?Sized>(&self, store: &S, as_of: NaiveDate) -> Result<RunSummary> {
        info!(%as_of, "pipeline run started");
        let reconcile = self.reconcile_leg(store, as_of).await?;

        let window_start = self.reader.window_start(as_of);
        // accuracy is report-only; a failed read warns and the run goes on
        let accuracy = match self
            .retry
            .run("records_between", || store.records_between(window_start, as_of))
            .await
        {
            Ok(recent) => reconciled_accuracy(&recent),
            Err(err) => {
                warn!(%as_of, kind = err.kind(), error = %err, "reconciled accuracy unavailable");
                None
            }
        };
        if let Some(acc) = &accuracy {
            info!(count = acc.count, mae = acc.mae, max_error = acc.max_error, "reconciled accuracy");
        }

        let forecast = self.forecast_leg(store, as_of).await?;
        info!(
            %as_of,
            reconciled = reconcile.reconciled,
            predictions = forecast.rows_written,
            "pipeline run finished"
        );

        Ok(RunSummary {
            as_of,
            reconcile,
            forecast,
            accuracy,
        })
    }
}
