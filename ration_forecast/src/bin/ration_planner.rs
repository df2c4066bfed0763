//! Ration planner CLI
//!
//! Runs the forecasting pipeline once, on a daily schedule, or as an offline
//! backtest over a CSV export of the demand view.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use ration_forecast::backtest::{run_backtest, write_csv};
use ration_forecast::config::AppConfig;
use ration_forecast::data::DataLoader;
use ration_forecast::models::forest::RandomForest;
use ration_forecast::orchestrator::{DailyTrigger, Orchestrator};
use ration_forecast::pipeline::Pipeline;
use ration_forecast::store::SqliteConnector;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "ration_planner")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Daily cafeteria ration forecasting and reconciliation", long_about = None)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Overrides {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store connection string, overrides DATABASE_URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Days forecast per run
    #[arg(long, global = true)]
    horizon: Option<u32>,

    /// Days of history read before the as-of date
    #[arg(long, global = true)]
    lookback_days: Option<u32>,

    /// Minimum training samples per meal
    #[arg(long, global = true)]
    min_training_rows: Option<usize>,

    /// Trailing window length used by the features
    #[arg(long, global = true)]
    rolling_window: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile past predictions and forecast the horizon once
    Run {
        /// As-of date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Run every day at a fixed local time
    Schedule {
        /// Time of day (HH:MM), overrides the configured schedule_at
        #[arg(long)]
        at: Option<String>,
    },
    /// Train and forecast offline from a CSV export, printing CSV to stdout
    Backtest {
        /// CSV with date, meal_category, total_rations columns
        #[arg(long)]
        history: PathBuf,

        /// As-of date (YYYY-MM-DD) to simulate
        #[arg(long)]
        as_of: NaiveDate,
    },
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to initialize logging")
}

fn load_config(overrides: &Overrides) -> Result<AppConfig> {
    let mut config = match &overrides.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    }
    .with_env();

    if let Some(url) = &overrides.database_url {
        config.database_url = Some(url.clone());
    }
    if let Some(horizon) = overrides.horizon {
        config.pipeline.horizon_days = horizon;
    }
    if let Some(days) = overrides.lookback_days {
        config.pipeline.lookback_days = days;
    }
    if let Some(rows) = overrides.min_training_rows {
        config.pipeline.min_training_rows = rows;
    }
    if let Some(window) = overrides.rolling_window {
        config.pipeline.rolling_window = window;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn orchestrator(config: &AppConfig) -> Result<Orchestrator<SqliteConnector, RandomForest>> {
    let url = config.require_database_url()?;
    let pipeline = Pipeline::from_config(&config.pipeline).context("failed to build pipeline")?;
    Ok(Orchestrator::new(
        SqliteConnector::new(url).ensuring_output_table(),
        pipeline,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;
    let config = load_config(&cli.overrides)?;

    match cli.command {
        Commands::Run { as_of } => {
            let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());
            let orchestrator = orchestrator(&config)?;
            match orchestrator.run_once(as_of).await {
                Ok(summary) => {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                    Ok(())
                }
                // already logged by the orchestrator
                Err(_) => std::process::exit(1),
            }
        }
        Commands::Schedule { at } => {
            let at = match at {
                Some(raw) => NaiveTime::parse_from_str(&raw, "%H:%M")
                    .with_context(|| format!("invalid --at '{}', expected HH:MM", raw))?,
                None => config.schedule_time()?,
            };
            let orchestrator = orchestrator(&config)?;
            info!(%at, "starting daily schedule");
            let mut trigger = DailyTrigger::new(at);
            orchestrator.run_on_schedule(&mut trigger).await;
            Ok(())
        }
        Commands::Backtest { history, as_of } => {
            let data = DataLoader::from_csv(&history)
                .with_context(|| format!("failed to load {}", history.display()))?;
            info!(rows = data.len(), %as_of, "running backtest");
            let report = run_backtest(&data, &config.pipeline, as_of)?;
            write_csv(&report.rows, std::io::stdout().lock())?;
            Ok(())
        }
    }
}
