#![allow(dead_code)]

use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use ration_forecast::config::{ForestConfig, PipelineConfig, RetryConfig};
use ration_forecast::data::MealCategory;
use ration_forecast::store::SqliteStore;
use tempfile::TempDir;

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Small forest and no backoff, so tests stay fast
pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        forest: ForestConfig {
            n_trees: 20,
            ..ForestConfig::default()
        },
        retry: RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        },
        ..PipelineConfig::default()
    }
}

pub fn sqlite_url(dir: &TempDir) -> String {
    format!("sqlite://{}?mode=rwc", dir.path().join("cafeteria.db").display())
}

/// File-backed store with an empty demand table and the forecast table
pub async fn temp_store() -> (TempDir, SqliteStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::connect(&sqlite_url(&dir)).await.unwrap();
    create_demand_table(&store).await;
    store.ensure_output_table().await.unwrap();
    (dir, store)
}

pub async fn create_demand_table(store: &SqliteStore) {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS daily_meal_demand (
            date TEXT NOT NULL,
            meal_category TEXT NOT NULL,
            ticket_count INTEGER NOT NULL,
            total_rations INTEGER NOT NULL,
            scholarship_rations INTEGER,
            regular_rations INTEGER
        )",
    )
    .execute(store.pool())
    .await
    .unwrap();
}

pub async fn insert_demand(store: &SqliteStore, date: NaiveDate, meal: MealCategory, rations: i64) {
    sqlx::query(
        "INSERT INTO daily_meal_demand (date, meal_category, ticket_count, total_rations)
         VALUES (?, ?, ?, ?)",
    )
    .bind(date)
    .bind(meal.as_str())
    .bind(rations)
    .bind(rations)
    .execute(store.pool())
    .await
    .unwrap();
}

pub async fn insert_demand_breakdown(
    store: &SqliteStore,
    date: NaiveDate,
    meal: MealCategory,
    scholarship: i64,
    regular: i64,
) {
    sqlx::query(
        "INSERT INTO daily_meal_demand
            (date, meal_category, ticket_count, total_rations, scholarship_rations, regular_rations)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(date)
    .bind(meal.as_str())
    .bind(scholarship + regular)
    .bind(scholarship + regular)
    .bind(scholarship)
    .bind(regular)
    .execute(store.pool())
    .await
    .unwrap();
}

/// `days` consecutive days of `meal` ending the day before `until`,
/// drawn from N(200, 10)
pub async fn seed_meal(store: &SqliteStore, meal: MealCategory, until: NaiveDate, days: u64, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::<f64>::new(200.0, 10.0).unwrap();
    for offset in (1..=days).rev() {
        let date = until.checked_sub_days(Days::new(offset)).unwrap();
        let rations = normal.sample(&mut rng).round().max(0.0) as i64;
        insert_demand(store, date, meal, rations).await;
    }
}
