//! Error types for the prime engine.
//!
//! `SearchError` is what a wrapping HTTP or CLI layer sees from
//! [`RangeSearchScheduler::run`](crate::scheduler::RangeSearchScheduler::run):
//! either the request was malformed (nothing was computed) or the sampled
//! cost projection exceeded the budget. `PrimeError` covers misuse of the
//! lower-level components.

use thiserror::Error;

/// A `SearchRequest` field broke one of its invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("start must be at least 2 (got {start})")]
    StartTooSmall { start: u64 },
    #[error("end must not exceed {ceiling} (got {end})")]
    EndAboveCeiling { end: u64, ceiling: u64 },
    #[error("end must be greater than or equal to start (start {start}, end {end})")]
    EndBeforeStart { start: u64, end: u64 },
    #[error("minimum sequence length must be at least 2 (got {min_length})")]
    MinLengthTooSmall { min_length: usize },
    #[error("maximum sequence length must be at least the minimum ({max_length} < {min_length})")]
    MaxLengthBelowMin { min_length: usize, max_length: usize },
    #[error("minimum sequence count must be at least 1 (got {min_sequences})")]
    MinSequencesTooSmall { min_sequences: usize },
    #[error("maximum sequence count must be at least the minimum ({max_sequences} < {min_sequences})")]
    MaxSequencesBelowMin {
        min_sequences: usize,
        max_sequences: usize,
    },
}

/// Failure of a range search.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("invalid search request: {0}")]
    Validation(#[from] ValidationError),
    #[error(
        "estimated search time is {estimated_secs:.1}s, narrow the range \
         (sample: {sample_size} values took {sample_secs:.3}s and found {sample_results} results)"
    )]
    BudgetExceeded {
        estimated_secs: f64,
        sample_secs: f64,
        sample_size: u64,
        sample_results: usize,
    },
    #[error(transparent)]
    Prime(#[from] PrimeError),
}

/// Misuse of a core component.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrimeError {
    #[error("{n} is beyond the prime table limit {limit}")]
    BeyondTable { n: u64, limit: u64 },
    #[error("phone prefix must be exactly 4 digits (got {0:?})")]
    InvalidPrefix(String),
    #[error("phone number {0:?} contains no digits")]
    InvalidPhone(String),
    #[error("plate code {0:?} must be non-empty and alphanumeric")]
    InvalidPlate(String),
    #[error("plate code {0:?} does not fit in 64 bits")]
    PlateOverflow(String),
    #[error("PrimesDB block digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },
}
