//! SQLite-backed store

use crate::data::{MealCategory, Observation};
use crate::error::{ForecastError, Result};
use crate::record::{ForecastRecord, PredictionWrite, RealizedWrite};
use crate::store::{DemandStore, StoreConnector};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Aggregated demand per closed day and meal, maintained outside this crate
pub const DEMAND_VIEW: &str = "daily_meal_demand";

/// Forecast output table
pub const FORECAST_TABLE: &str = "forecast_records";

const CREATE_FORECAST_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS forecast_records (
    date TEXT NOT NULL,
    meal TEXT NOT NULL,
    predicted_servings INTEGER CHECK (predicted_servings IS NULL OR predicted_servings >= 0),
    actual_servings INTEGER CHECK (actual_servings IS NULL OR actual_servings >= 0),
    actual_scholarship_servings INTEGER CHECK (actual_scholarship_servings IS NULL OR actual_scholarship_servings >= 0),
    actual_regular_servings INTEGER CHECK (actual_regular_servings IS NULL OR actual_regular_servings >= 0),
    absolute_error INTEGER GENERATED ALWAYS AS (abs(predicted_servings - actual_servings)) VIRTUAL,
    model_version TEXT,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (date, meal),
    CHECK (predicted_servings IS NOT NULL OR actual_servings IS NOT NULL)
)
"#;

const RECORD_COLUMNS: &str = "date, meal, predicted_servings, actual_servings, \
    actual_scholarship_servings, actual_regular_servings, absolute_error, model_version, updated_at";

/// Optional split columns of the demand view
const BREAKDOWN_COLUMNS: [&str; 2] = ["scholarship_rations", "regular_rations"];

#[derive(Debug, FromRow)]
struct DemandRow {
    date: NaiveDate,
    meal_category: String,
    ticket_count: i64,
    total_rations: i64,
    scholarship_rations: Option<i64>,
    regular_rations: Option<i64>,
}

#[derive(Debug, FromRow)]
struct RecordRow {
    date: NaiveDate,
    meal: String,
    predicted_servings: Option<i64>,
    actual_servings: Option<i64>,
    actual_scholarship_servings: Option<i64>,
    actual_regular_servings: Option<i64>,
    absolute_error: Option<i64>,
    model_version: Option<String>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RecordRow> for ForecastRecord {
    type Error = ForecastError;

    fn try_from(row: RecordRow) -> Result<Self> {
        Ok(ForecastRecord {
            date: row.date,
            meal: row.meal.parse()?,
            predicted_servings: row.predicted_servings,
            actual_servings: row.actual_servings,
            actual_scholarship_servings: row.actual_scholarship_servings,
            actual_regular_servings: row.actual_regular_servings,
            absolute_error: row.absolute_error,
            model_version: row.model_version,
            updated_at: row.updated_at,
        })
    }
}

/// Store over a SQLite connection pool
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `url`, e.g. `sqlite://planning.db?mode=rwc`
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the forecast table if it does not exist
    pub async fn ensure_output_table(&self) -> Result<()> {
        sqlx::query(CREATE_FORECAST_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    /// Select list for the demand view; split columns the view lacks read as NULL
    async fn demand_select_list(&self) -> Result<String> {
        let present: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info(?)")
            .bind(DEMAND_VIEW)
            .fetch_all(&self.pool)
            .await?;

        let mut columns = vec!["date, meal_category, ticket_count, total_rations".to_string()];
        for column in BREAKDOWN_COLUMNS {
            if present.iter().any(|name| name == column) {
                columns.push(column.to_string());
            } else {
                columns.push(format!("NULL AS {}", column));
            }
        }
        Ok(columns.join(", "))
    }

    fn into_records(rows: Vec<RecordRow>) -> Result<Vec<ForecastRecord>> {
        let mut records = rows
            .into_iter()
            .map(ForecastRecord::try_from)
            .collect::<Result<Vec<_>>>()?;
        records.sort_by_key(|r| (r.date, r.meal));
        Ok(records)
    }
}

#[async_trait]
impl DemandStore for SqliteStore {
    async fn fetch_demand(&self, from: NaiveDate, until: NaiveDate) -> Result<Vec<Observation>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE date >= ? AND date < ? ORDER BY date",
            self.demand_select_list().await?,
            DEMAND_VIEW
        );
        let rows: Vec<DemandRow> = sqlx::query_as(&sql)
            .bind(from)
            .bind(until)
            .fetch_all(&self.pool)
            .await?;

        let mut observations = Vec::with_capacity(rows.len());
        for row in rows {
            let meal = match row.meal_category.parse::<MealCategory>() {
                Ok(meal) => meal,
                Err(err) => {
                    warn!(date = %row.date, error = %err, "skipping demand row");
                    continue;
                }
            };
            let (Ok(servings), Ok(tickets)) = (
                u32::try_from(row.total_rations),
                u32::try_from(row.ticket_count),
            ) else {
                warn!(
                    date = %row.date,
                    meal = %meal,
                    total_rations = row.total_rations,
                    "skipping demand row with negative counts"
                );
                continue;
            };
            let split = |value: Option<i64>| value.and_then(|v| u32::try_from(v).ok());
            observations.push(
                Observation::observed(row.date, meal, servings)
                    .with_tickets(tickets)
                    .with_breakdown(split(row.scholarship_rations), split(row.regular_rations)),
            );
        }

        debug!(%from, %until, rows = observations.len(), "fetched demand");
        Ok(observations)
    }

    async fn pending_reconciliation(&self, before: NaiveDate) -> Result<Vec<ForecastRecord>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE date < ? AND actual_servings IS NULL",
            RECORD_COLUMNS, FORECAST_TABLE
        );
        let rows: Vec<RecordRow> = sqlx::query_as(&sql)
            .bind(before)
            .fetch_all(&self.pool)
            .await?;
        Self::into_records(rows)
    }

    async fn upsert_prediction(&self, write: &PredictionWrite) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (date, meal, predicted_servings, model_version, updated_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT (date, meal) DO UPDATE SET \
                 predicted_servings = excluded.predicted_servings, \
                 model_version = excluded.model_version, \
                 updated_at = excluded.updated_at",
            FORECAST_TABLE
        );
        sqlx::query(&sql)
            .bind(write.date)
            .bind(write.meal.as_str())
            .bind(write.predicted_servings)
            .bind(&write.model_version)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_realized(&self, write: &RealizedWrite) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (date, meal, actual_servings, actual_scholarship_servings, \
                 actual_regular_servings, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT (date, meal) DO UPDATE SET \
                 actual_servings = excluded.actual_servings, \
                 actual_scholarship_servings = excluded.actual_scholarship_servings, \
                 actual_regular_servings = excluded.actual_regular_servings, \
                 updated_at = excluded.updated_at",
            FORECAST_TABLE
        );
        sqlx::query(&sql)
            .bind(write.date)
            .bind(write.meal.as_str())
            .bind(write.actual_servings)
            .bind(write.scholarship_servings)
            .bind(write.regular_servings)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn fetch_record(
        &self,
        date: NaiveDate,
        meal: MealCategory,
    ) -> Result<Option<ForecastRecord>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE date = ? AND meal = ?",
            RECORD_COLUMNS, FORECAST_TABLE
        );
        let row: Option<RecordRow> = sqlx::query_as(&sql)
            .bind(date)
            .bind(meal.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(ForecastRecord::try_from).transpose()
    }

    async fn records_between(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<ForecastRecord>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE date >= ? AND date < ?",
            RECORD_COLUMNS, FORECAST_TABLE
        );
        let rows: Vec<RecordRow> = sqlx::query_as(&sql)
            .bind(from)
            .bind(until)
            .fetch_all(&self.pool)
            .await?;
        Self::into_records(rows)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Opens a fresh SQLite pool per run
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    url: String,
    ensure_output_table: bool,
}

impl SqliteConnector {
    /// Connector for `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ensure_output_table: false,
        }
    }

    /// Create the forecast table on connect if missing
    pub fn ensuring_output_table(mut self) -> Self {
        self.ensure_output_table = true;
        self
    }
}

#[async_trait]
impl StoreConnector for SqliteConnector {
    type Store = SqliteStore;

    async fn connect(&self) -> Result<SqliteStore> {
        let store = SqliteStore::connect(&self.url).await?;
        if self.ensure_output_table {
            if let Err(err) = store.ensure_output_table().await {
                store.close().await;
                return Err(err);
            }
        }
        Ok(store)
    }
}
