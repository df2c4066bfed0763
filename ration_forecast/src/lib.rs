//! # Ration Forecast
//!
//! Daily ration forecasting and reconciliation for a cafeteria that serves
//! breakfast, lunch and dinner.
//!
//! ## Features
//!
//! - Closed-day demand history read from a relational view
//! - Calendar and trailing-demand features per (date, meal)
//! - One random forest per meal, validated against a trailing-mean baseline
//! - Idempotent prediction writes keyed by (date, meal)
//! - Reconciliation of past predictions with what was actually served
//! - One-shot and scheduled runs, plus an offline backtest over CSV exports
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ration_forecast::config::PipelineConfig;
//! use ration_forecast::pipeline::Pipeline;
//! use ration_forecast::store::SqliteStore;
//!
//! # async fn example() -> ration_forecast::error::Result<()> {
//! let store = SqliteStore::connect("sqlite://cafeteria.db").await?;
//! store.ensure_output_table().await?;
//!
//! let pipeline = Pipeline::from_config(&PipelineConfig::default())?;
//! let today = chrono::Local::now().date_naive();
//! let summary = pipeline.run(&store, today).await?;
//! println!("wrote {} predictions", summary.forecast.rows_written);
//! # Ok(())
//! # }
//! ```

pub mod backtest;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod forecaster;
pub mod history;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod reconciler;
pub mod record;
pub mod retry;
pub mod store;
pub mod trainer;
pub mod writer;

pub use config::{AppConfig, PipelineConfig};
pub use data::{History, MealCategory, Observation};
pub use error::{ForecastError, Result};
pub use orchestrator::Orchestrator;
pub use pipeline::{Pipeline, RunSummary};
pub use record::ForecastRecord;
pub use store::{DemandStore, SqliteStore};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
