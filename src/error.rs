//! Season errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeasonError {
    /// Rejected at construction time; never silently coerced
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The Swiss search exhausted every branch without a legal round
    #[error("No valid pairing exists for round {round} ({competitors} competitors)")]
    SchedulingInfeasible { round: usize, competitors: usize },

    /// Accounting bug on the caller's side, e.g. an odd field without a bye
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

pub type Result<T> = std::result::Result<T, SeasonError>;
