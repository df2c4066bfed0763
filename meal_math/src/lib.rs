//! # Meal Math
//!
//! Numeric building blocks for ration forecasting.
//! This crate provides trailing-window statistics with explicit fallbacks for
//! short histories, and the seeded bootstrap sampling used by tree ensembles.

use thiserror::Error;

pub mod sampling;
pub mod window;

pub use sampling::BootstrapSampler;
pub use window::TrailingWindow;

/// Errors that can occur in demand-related calculations
#[derive(Error, Debug)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for meal math operations
pub type Result<T> = std::result::Result<T, MathError>;
