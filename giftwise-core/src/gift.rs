//! Gift-amount arithmetic
//!
//! A single pure function over five numbers. The hook pipeline treats the
//! command built on top of it as opaque.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inputs for a gift suggestion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GiftInputs {
    /// Typical spend for this kind of gift
    pub base: f64,
    /// How close the recipient is, 1 to 10
    pub closeness: f64,
    /// How important the occasion is, 1 to 10
    pub importance: f64,
    /// How nice the recipient has been, 0 to 10
    pub niceness: f64,
    /// Hard upper bound for the suggestion
    pub budget: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GiftError {
    #[error("{field} must be a finite, non-negative number (got {value})")]
    InvalidInput { field: &'static str, value: f64 },
}

/// Suggested amount: `base × closeness/5 × importance/5 × niceness/10`,
/// clamped to `[0, budget]`.
///
/// Scale inputs are clamped to their ranges; `base` and `budget` must be
/// finite and non-negative.
pub fn suggest_amount(inputs: &GiftInputs) -> Result<f64, GiftError> {
    for (field, value) in [("base", inputs.base), ("budget", inputs.budget)] {
        if !value.is_finite() || value < 0.0 {
            return Err(GiftError::InvalidInput { field, value });
        }
    }

    let closeness = clamp_scale(inputs.closeness, 1.0, 10.0);
    let importance = clamp_scale(inputs.importance, 1.0, 10.0);
    let niceness = clamp_scale(inputs.niceness, 0.0, 10.0);

    let amount = inputs.base * (closeness / 5.0) * (importance / 5.0) * (niceness / 10.0);
    Ok(amount.clamp(0.0, inputs.budget))
}

/// Rounds to the given number of decimal places
pub fn round_to(amount: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (amount * factor).round() / factor
}

fn clamp_scale(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}
