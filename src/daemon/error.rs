//! Timer engine error types.
//!
//! The engine rejects invalid input and keeps its last known good state,
//! so every variant here describes a rejected update rather than a failure.

use thiserror::Error;

/// Errors returned by engine operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// Speed multiplier was zero, negative or not a finite number.
    #[error("速度倍率は正の数で指定してください: {0}")]
    InvalidSpeed(f64),

    /// A configured duration was not positive.
    #[error("{field} は1分以上で指定してください (指定値: {minutes})")]
    InvalidDuration {
        /// Configuration key that failed validation
        field: &'static str,
        /// Rejected value
        minutes: u32,
    },
}

impl EngineError {
    /// Returns true if the rejected input was a speed multiplier.
    #[must_use]
    pub fn is_invalid_speed(&self) -> bool {
        matches!(self, Self::InvalidSpeed(_))
    }

    /// Returns true if the rejected input was a configuration update.
    #[must_use]
    pub fn is_invalid_duration(&self) -> bool {
        matches!(self, Self::InvalidDuration { .. })
    }
}
