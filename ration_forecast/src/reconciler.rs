//! Reconciler: fill realized demand into elapsed forecast rows

use crate::error::Result;
use crate::history::HistoryReader;
use crate::record::RealizedWrite;
use crate::retry::RetryPolicy;
use crate::store::DemandStore;
use crate::writer::ResultWriter;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    /// Elapsed rows still missing a realized value before the pass
    pub pending: usize,
    /// Rows filled by this pass
    pub reconciled: usize,
    /// Rows left for a later run because the view has no figure yet
    pub awaiting: usize,
    /// Pending rows older than the lookback window, no longer read back
    pub stranded: usize,
}

/// Merges realized demand into stored forecasts
#[derive(Debug, Clone)]
pub struct Reconciler {
    reader: HistoryReader,
    writer: ResultWriter,
    retry: RetryPolicy,
}

impl Reconciler {
    /// Create a reconciler
    pub fn new(reader: HistoryReader, writer: ResultWriter, retry: RetryPolicy) -> Self {
        Self {
            reader,
            writer,
            retry,
        }
    }

    /// Fill every stored row dated before `as_of` whose realized value is null.
    ///
    /// Rows with no realized figure yet are left untouched; the next run
    /// picks them up again while they are inside the lookback window. Older
    /// rows are counted as stranded and the view is not read that far back.
    pub async fn reconcile<S: DemandStore + ?Sized>(
        &self,
        store: &S,
        as_of: NaiveDate,
    ) -> Result<ReconcileSummary> {
        let pending = self
            .retry
            .run("pending_reconciliation", || store.pending_reconciliation(as_of))
            .await?;
        let window_start = self.reader.window_start(as_of);
        let total = pending.len();
        let (pending, stranded): (Vec<_>, Vec<_>) =
            pending.into_iter().partition(|r| r.date >= window_start);
        if !stranded.is_empty() {
            warn!(
                %as_of,
                %window_start,
                stranded = stranded.len(),
                "pending rows older than the lookback window are left unreconciled"
            );
        }

        let Some(from) = pending.iter().map(|r| r.date).min() else {
            debug!(%as_of, "nothing to reconcile");
            return Ok(ReconcileSummary {
                pending: total,
                stranded: stranded.len(),
                ..ReconcileSummary::default()
            });
        };

        let realized = self.reader.fetch_closed(store, from, as_of).await?;

        let mut writes = Vec::new();
        for record in &pending {
            match realized.get(record.date, record.meal) {
                Some(obs) => writes.push(RealizedWrite::from_observation(obs)),
                None => debug!(date = %record.date, meal = %record.meal, "realized demand not available yet"),
            }
        }

        let reconciled = self.writer.write_realized(store, &writes).await?;
        let summary = ReconcileSummary {
            pending: total,
            reconciled,
            awaiting: pending.len() - reconciled,
            stranded: stranded.len(),
        };
        info!(
            %as_of,
            %from,
            pending = summary.pending,
            reconciled = summary.reconciled,
            awaiting = summary.awaiting,
            stranded = summary.stranded,
            "reconciliation finished"
        );
        Ok(summary)
    }
}
