//! Trailing-window statistics
//!
//! A [`TrailingWindow`] keeps the most recent `period` values pushed into it.
//! Unlike a strict moving average it can always answer: when fewer than
//! `period` values have been seen, the statistic is taken over what exists
//! (the "partial window" fallback). Callers that need the strict behaviour use
//! [`TrailingWindow::full_mean`].

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Fixed-capacity window over the most recent values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailingWindow {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl TrailingWindow {
    /// Create a new window holding at most `period` values
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
            sum: 0.0,
        })
    }

    /// Build a window from a chronological slice, keeping only the tail
    pub fn from_slice(period: usize, values: &[f64]) -> Result<Self> {
        let mut window = Self::new(period)?;
        let start = values.len().saturating_sub(period);
        for &value in &values[start..] {
            window.push(value);
        }
        Ok(window)
    }

    /// Push a new value, evicting the oldest once the window is full
    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;

        if self.values.len() > self.period {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }
    }

    /// Mean over the full window
    pub fn full_mean(&self) -> Result<f64> {
        if self.values.len() < self.period {
            return Err(MathError::InsufficientData(format!(
                "Not enough data for a full window. Need {} values, have {}.",
                self.period,
                self.values.len()
            )));
        }

        Ok(self.sum / self.period as f64)
    }

    /// Mean over whatever the window holds, `None` when empty
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.sum / self.values.len() as f64)
    }

    /// Population variance over whatever the window holds.
    ///
    /// Fewer than two values carry no spread, so the variance is `0.0`.
    pub fn variance(&self) -> f64 {
        if self.values.len() < 2 {
            return 0.0;
        }
        let mean = self.sum / self.values.len() as f64;
        self.values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / self.values.len() as f64
    }

    /// Most recently pushed value
    pub fn last(&self) -> Option<f64> {
        self.values.back().copied()
    }

    /// Number of values currently held
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the window holds no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether the window holds `period` values
    pub fn is_full(&self) -> bool {
        self.values.len() == self.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rejects_zero_period() {
        assert!(TrailingWindow::new(0).is_err());
    }

    #[test]
    fn evicts_oldest_value() {
        let mut window = TrailingWindow::new(3).unwrap();
        for v in [1.0, 2.0, 3.0, 4.0] {
            window.push(v);
        }
        assert!(window.is_full());
        assert_relative_eq!(window.full_mean().unwrap(), 3.0);
        assert_eq!(window.last(), Some(4.0));
    }

    #[test]
    fn partial_window_falls_back_to_available_values() {
        let window = TrailingWindow::from_slice(7, &[10.0, 20.0]).unwrap();
        assert!(window.full_mean().is_err());
        assert_relative_eq!(window.mean().unwrap(), 15.0);
        assert_relative_eq!(window.variance(), 25.0);
    }

    #[test]
    fn variance_of_single_value_is_zero() {
        let window = TrailingWindow::from_slice(4, &[200.0]).unwrap();
        assert_eq!(window.variance(), 0.0);
        assert!(TrailingWindow::new(4).unwrap().mean().is_none());
    }

    #[test]
    fn from_slice_keeps_tail() {
        let window = TrailingWindow::from_slice(2, &[1.0, 2.0, 3.0, 5.0]).unwrap();
        assert_eq!(window.len(), 2);
        assert_relative_eq!(window.mean().unwrap(), 4.0);
    }
}
