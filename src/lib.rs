//! # Ration Planner
//!
//! Workspace facade for the ration planning crates.
//!
//! - [`meal_math`]: trailing windows and seeded bootstrap sampling
//! - [`ration_forecast`]: the forecasting and reconciliation pipeline
//!
//! ## Example
//!
//! ```
//! use ration_planner::ration_forecast::data::MealCategory;
//!
//! let meal: MealCategory = "almuerzo".parse().unwrap();
//! assert_eq!(meal, MealCategory::Lunch);
//! assert_eq!(meal.as_str(), "ALMUERZO");
//! ```

pub use meal_math;
pub use ration_forecast;

/// Current version of the workspace
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
