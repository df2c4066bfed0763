//! Demand history handling for forecasting

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

/// Daily meal slot, tracked independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MealCategory {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealCategory {
    /// All categories in serving order
    pub const ALL: [MealCategory; 3] = [
        MealCategory::Breakfast,
        MealCategory::Lunch,
        MealCategory::Dinner,
    ];

    /// Label used by the cafeteria store
    pub fn as_str(&self) -> &'static str {
        match self {
            MealCategory::Breakfast => "DESAYUNO",
            MealCategory::Lunch => "ALMUERZO",
            MealCategory::Dinner => "CENA",
        }
    }
}

impl fmt::Display for MealCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealCategory {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "DESAYUNO" | "BREAKFAST" => Ok(MealCategory::Breakfast),
            "ALMUERZO" | "LUNCH" => Ok(MealCategory::Lunch),
            "CENA" | "DINNER" => Ok(MealCategory::Dinner),
            other => Err(ForecastError::DataError(format!(
                "Unknown meal category '{}'",
                other
            ))),
        }
    }
}

/// Where a demand figure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    /// Tabulated from redeemed tickets
    Observed,
    /// Produced by a model
    Predicted,
}

/// One closed (date, meal) pair with its realized ration count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub meal: MealCategory,
    pub servings_total: u32,
    pub ticket_count: u32,
    /// Rations served on scholarship tickets, when the source splits them
    pub scholarship_rations: Option<u32>,
    /// Rations served on regular tickets, when the source splits them
    pub regular_rations: Option<u32>,
    pub provenance: Provenance,
}

impl Observation {
    /// Create an observed row
    pub fn observed(date: NaiveDate, meal: MealCategory, servings_total: u32) -> Self {
        Self {
            date,
            meal,
            servings_total,
            ticket_count: servings_total,
            scholarship_rations: None,
            regular_rations: None,
            provenance: Provenance::Observed,
        }
    }

    /// Set the ticket count
    pub fn with_tickets(mut self, ticket_count: u32) -> Self {
        self.ticket_count = ticket_count;
        self
    }

    /// Set the scholarship/regular split
    pub fn with_breakdown(mut self, scholarship: Option<u32>, regular: Option<u32>) -> Self {
        self.scholarship_rations = scholarship;
        self.regular_rations = regular;
        self
    }
}

/// Chronologically ordered observed demand.
///
/// Rows are sorted by (date, meal). Days without tickets are simply absent;
/// nothing here zero-fills gaps. Predicted rows never enter a `History`.
#[derive(Debug, Clone, Default)]
pub struct History {
    observations: Vec<Observation>,
}

impl History {
    /// Build a history, dropping predicted rows and duplicate keys
    pub fn new(mut observations: Vec<Observation>) -> Self {
        observations.retain(|o| o.provenance == Provenance::Observed);
        observations.sort_by_key(|o| (o.date, o.meal));
        observations.dedup_by_key(|o| (o.date, o.meal));
        Self { observations }
    }

    /// All rows in order
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Rows dated strictly before `date`
    pub fn before(&self, date: NaiveDate) -> &[Observation] {
        let end = self.observations.partition_point(|o| o.date < date);
        &self.observations[..end]
    }

    /// Rows dated in `[from, until)`
    pub fn between(&self, from: NaiveDate, until: NaiveDate) -> &[Observation] {
        let start = self.observations.partition_point(|o| o.date < from);
        let end = self.observations.partition_point(|o| o.date < until);
        &self.observations[start..end.max(start)]
    }

    /// Rows for one meal, in order
    pub fn for_meal(&self, meal: MealCategory) -> impl Iterator<Item = &Observation> {
        self.observations.iter().filter(move |o| o.meal == meal)
    }

    /// Realized row for a key, if it has been observed
    pub fn get(&self, date: NaiveDate, meal: MealCategory) -> Option<&Observation> {
        self.observations
            .binary_search_by_key(&(date, meal), |o| (o.date, o.meal))
            .ok()
            .map(|i| &self.observations[i])
    }

    /// Earliest observed date
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    /// Latest observed date
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    /// Check if the history is empty
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Get the number of rows
    pub fn len(&self) -> usize {
        self.observations.len()
    }
}

/// Loader for offline exports of the demand view
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load history from a CSV export with columns
    /// `date, meal_category, total_rations` and optionally `ticket_count`,
    /// `scholarship_rations` and `regular_rations`
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<History> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::from_dataframe(&df)
    }

    /// Convert a demand DataFrame into a history
    pub fn from_dataframe(df: &DataFrame) -> Result<History> {
        let dates = Self::string_column(df, "date")?;
        let meals = Self::string_column(df, "meal_category")?;
        let rations = Self::integer_column(df, "total_rations")?;
        let tickets = if df.get_column_names().contains(&"ticket_count") {
            Self::integer_column(df, "ticket_count")?
        } else {
            rations.clone()
        };
        let scholarship = Self::optional_integer_column(df, "scholarship_rations")?;
        let regular = Self::optional_integer_column(df, "regular_rations")?;

        let mut observations = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let (Some(date), Some(meal), Some(servings)) = (&dates[i], &meals[i], rations[i])
            else {
                continue;
            };
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|e| ForecastError::DataError(format!("Bad date '{}': {}", date, e)))?;
            let meal: MealCategory = meal.parse()?;
            let servings = u32::try_from(servings).map_err(|_| {
                ForecastError::DataError(format!(
                    "Negative ration count {} on {} {}",
                    servings, date, meal
                ))
            })?;
            let tickets = tickets[i]
                .and_then(|t| u32::try_from(t).ok())
                .unwrap_or(servings);
            let split = |column: &Option<Vec<Option<i64>>>| {
                column
                    .as_ref()
                    .and_then(|values| values[i])
                    .and_then(|v| u32::try_from(v).ok())
            };
            observations.push(
                Observation::observed(date, meal, servings)
                    .with_tickets(tickets)
                    .with_breakdown(split(&scholarship), split(&regular)),
            );
        }

        if observations.is_empty() {
            return Err(ForecastError::DataError(
                "No demand rows found in data".to_string(),
            ));
        }

        Ok(History::new(observations))
    }

    fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
        let col = df
            .column(name)
            .map_err(|e| ForecastError::DataError(format!("Column '{}' not found: {}", name, e)))?;
        let col = col.cast(&DataType::Utf8)?;
        Ok(col
            .utf8()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect())
    }

    fn optional_integer_column(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<i64>>>> {
        if df.get_column_names().contains(&name) {
            Self::integer_column(df, name).map(Some)
        } else {
            Ok(None)
        }
    }

    fn integer_column(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
        let col = df
            .column(name)
            .map_err(|e| ForecastError::DataError(format!("Column '{}' not found: {}", name, e)))?;
        let col = col.cast(&DataType::Int64)?;
        Ok(col.i64()?.into_iter().collect())
    }
}
