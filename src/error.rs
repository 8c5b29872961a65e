//! Error types.
//!
//! Two layers:
//!
//! - [`EngineError`]: structured failures of the numerical core (moments, tail
//!   fit, spectrum construction). These are returned to the immediate caller
//!   and never logged or defaulted inside the core.
//! - [`AppError`]: a message plus a process exit code, used by the CLI layers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why the tail-fit minimizer gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitFailure {
    /// `max_iterations` was reached before any convergence test passed.
    IterationBudget,
    /// The wall-clock budget elapsed.
    TimeBudget,
    /// `JᵀWJ` could not be inverted (too few bins, degenerate centers, ...).
    SingularJacobian,
    /// The model or its Jacobian produced a non-finite value.
    NonFinite,
}

impl std::fmt::Display for FitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FitFailure::IterationBudget => "iteration budget exhausted",
            FitFailure::TimeBudget => "time budget exhausted",
            FitFailure::SingularJacobian => "singular Jacobian",
            FitFailure::NonFinite => "non-finite model evaluation",
        };
        f.write_str(s)
    }
}

/// Failures reported by the numerical core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("division by zero: moment denominator over [{low}, {high}] is zero")]
    DivisionByZero { low: f64, high: f64 },

    #[error("fit did not converge after {iterations} iterations: {reason}")]
    FitDidNotConverge { reason: FitFailure, iterations: usize },

    #[error("invalid spectrum: {0}")]
    InvalidSpectrum(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let code = match err {
            EngineError::InvalidRange(_) | EngineError::InvalidSpectrum(_) => 2,
            EngineError::DivisionByZero { .. } | EngineError::FitDidNotConverge { .. } => 4,
        };
        AppError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_map_to_exit_codes() {
        let invalid: AppError = EngineError::InvalidRange("low >= high".into()).into();
        assert_eq!(invalid.exit_code(), 2);

        let diverged: AppError = EngineError::FitDidNotConverge {
            reason: FitFailure::SingularJacobian,
            iterations: 0,
        }
        .into();
        assert_eq!(diverged.exit_code(), 4);
        assert!(diverged.to_string().contains("singular Jacobian"));
    }
}
