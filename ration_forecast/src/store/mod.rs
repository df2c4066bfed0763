//! Relational store seams

use crate::data::{MealCategory, Observation};
use crate::error::Result;
use crate::record::{ForecastRecord, PredictionWrite, RealizedWrite};
use async_trait::async_trait;
use chrono::NaiveDate;

pub mod sqlite;

pub use sqlite::{SqliteConnector, SqliteStore};

/// Access to the demand view and the forecast table.
///
/// Each upsert is atomic per row and keyed by (date, meal).
#[async_trait]
pub trait DemandStore: Send + Sync {
    /// Closed demand rows dated in `[from, until)`, ordered by date
    async fn fetch_demand(&self, from: NaiveDate, until: NaiveDate) -> Result<Vec<Observation>>;

    /// Forecast rows dated before `before` whose realized value is missing
    async fn pending_reconciliation(&self, before: NaiveDate) -> Result<Vec<ForecastRecord>>;

    /// Insert or update the prediction columns of one row
    async fn upsert_prediction(&self, write: &PredictionWrite) -> Result<()>;

    /// Insert or update the realized columns of one row
    async fn upsert_realized(&self, write: &RealizedWrite) -> Result<()>;

    /// Row for one key
    async fn fetch_record(&self, date: NaiveDate, meal: MealCategory)
        -> Result<Option<ForecastRecord>>;

    /// Rows dated in `[from, until)`, ordered by (date, meal)
    async fn records_between(&self, from: NaiveDate, until: NaiveDate)
        -> Result<Vec<ForecastRecord>>;

    /// Release the underlying connections
    async fn close(&self);
}

/// Acquires a store for the duration of one run
#[async_trait]
pub trait StoreConnector: Send + Sync {
    type Store: DemandStore;

    /// Open a store; the caller closes it when the run ends
    async fn connect(&self) -> Result<Self::Store>;
}
