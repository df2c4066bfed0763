//! Result Writer: idempotent per-row upserts

use crate::error::Result;
use crate::record::{PredictionWrite, RealizedWrite};
use crate::retry::RetryPolicy;
use crate::store::DemandStore;
use tracing::{debug, error};

/// Writes forecast and realized legs, one atomic upsert per row.
///
/// A failing row aborts the batch; rows already written stay written.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    retry: RetryPolicy,
}

impl ResultWriter {
    /// Create a writer
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }

    /// Upsert prediction columns, returning the number of rows written
    pub async fn write_predictions<S: DemandStore + ?Sized>(
        &self,
        store: &S,
        writes: &[PredictionWrite],
    ) -> Result<usize> {
        for write in writes {
            self.retry
                .run("upsert_prediction", || store.upsert_prediction(write))
                .await
                .map_err(|err| {
                    error!(
                        date = %write.date,
                        meal = %write.meal,
                        kind = err.kind(),
                        error = %err,
                        "prediction upsert failed"
                    );
                    err
                })?;
            debug!(date = %write.date, meal = %write.meal, predicted = write.predicted_servings, "prediction written");
        }
        Ok(writes.len())
    }

    /// Upsert realized columns, returning the number of rows written
    pub async fn write_realized<S: DemandStore + ?Sized>(
        &self,
        store: &S,
        writes: &[RealizedWrite],
    ) -> Result<usize> {
        for write in writes {
            self.retry
                .run("upsert_realized", || store.upsert_realized(write))
                .await
                .map_err(|err| {
                    error!(
                        date = %write.date,
                        meal = %write.meal,
                        kind = err.kind(),
                        error = %err,
                        "realized upsert failed"
                    );
                    err
                })?;
            debug!(date = %write.date, meal = %write.meal, actual = write.actual_servings, "realized value written");
        }
        Ok(writes.len())
    }
}
