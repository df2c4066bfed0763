//! History Reader: closed demand over a lookback window

use crate::data::History;
use crate::error::{ForecastError, Result};
use crate::retry::RetryPolicy;
use crate::store::DemandStore;
use chrono::{Days, NaiveDate};
use tracing::{error, info};

/// Reads `[as_of - lookback, as_of)` from the demand view
#[derive(Debug, Clone)]
pub struct HistoryReader {
    lookback_days: u32,
    retry: RetryPolicy,
}

impl HistoryReader {
    /// Create a reader
    pub fn new(lookback_days: u32, retry: RetryPolicy) -> Self {
        Self {
            lookback_days,
            retry,
        }
    }

    /// First day of the window ending at `as_of`
    pub fn window_start(&self, as_of: NaiveDate) -> NaiveDate {
        as_of
            .checked_sub_days(Days::new(u64::from(self.lookback_days)))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Read the window ending (exclusively) at `as_of`.
    ///
    /// Any failure to reach the view, and an empty window, is reported as
    /// [`ForecastError::DataUnavailable`].
    pub async fn read<S: DemandStore + ?Sized>(&self, store: &S, as_of: NaiveDate) -> Result<History> {
        let from = self.window_start(as_of);
        self.read_range(store, from, as_of).await
    }

    /// Read closed rows in `[from, until)`, failing when there are none
    pub async fn read_range<S: DemandStore + ?Sized>(
        &self,
        store: &S,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<History> {
        let history = self.fetch_closed(store, from, until).await?;
        if history.is_empty() {
            error!(%from, %until, "demand view returned no rows");
            return Err(ForecastError::DataUnavailable {
                from,
                until,
                reason: "no closed demand rows in window".to_string(),
            });
        }

        info!(%from, %until, rows = history.len(), "loaded demand history");
        Ok(history)
    }

    /// Closed rows in `[from, until)`; an empty result is not an error here
    pub async fn fetch_closed<S: DemandStore + ?Sized>(
        &self,
        store: &S,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<History> {
        let rows = self
            .retry
            .run("fetch_demand", || store.fetch_demand(from, until))
            .await
            .map_err(|err| {
                error!(%from, %until, kind = err.kind(), error = %err, "demand view unreachable");
                ForecastError::DataUnavailable {
                    from,
                    until,
                    reason: err.to_string(),
                }
            })?;

        // rows on or after `until` are not closed yet
        Ok(History::new(
            rows.into_iter().filter(|o| o.date < until).collect(),
        ))
    }
}
