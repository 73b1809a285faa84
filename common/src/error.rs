//! Errors shared by the aggregator, the stores and their callers.

use crate::Criterion;
use thiserror::Error;

pub type JudgingResult<T> = Result<T, JudgingError>;

/// Every failure a judging operation can report.
/// All of them are recoverable at the request boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JudgingError {
    /// The referenced submission does not exist.
    #[error("Submission not found: {0}")]
    NotFound(String),

    /// The judge already scored this submission through the standalone path.
    #[error("Judge {judge_id} has already graded submission {submission_id}")]
    DuplicateScore {
        submission_id: String,
        judge_id: String,
    },

    /// A score criterion fell outside the closed range [0, 10].
    #[error("Criterion {criterion} must be between 0 and 10, got {value}")]
    InvalidCriterion { criterion: Criterion, value: f64 },

    /// A required value was missing or malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The store detected a concurrent write to the same record.
    #[error("Conflicting write to submission {0}, please retry")]
    Conflict(String),

    /// An average was requested over an empty evaluation set.
    #[error("Cannot average an empty set of evaluations")]
    DivisionByZero,

    /// The backing store failed.
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl JudgingError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        JudgingError::Storage(err.to_string())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        JudgingError::InvalidInput(message.into())
    }
}
