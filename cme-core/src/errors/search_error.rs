//! Full-text / integrated search errors (C3/C7).

/// Errors raised while parsing or executing a search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("query exceeds maximum length: {len} > {max}")]
    QueryTooLong { len: usize, max: usize },

    #[error("empty or whitespace-only query")]
    EmptyQuery,

    #[error("unbalanced parentheses in query at position {position}")]
    UnbalancedParens { position: usize },

    #[error("unterminated phrase starting at position {position}")]
    UnterminatedPhrase { position: usize },

    #[error("no search criteria provided")]
    NoCriteria,

    #[error("limit {limit} exceeds engine maximum {max}")]
    LimitExceeded { limit: usize, max: usize },

    #[error("invalid threshold '{field}': {value} is not within [0, 1]")]
    ThresholdOutOfRange { field: String, value: f64 },

    #[error("invalid range for '{field}': min {min} > max {max}")]
    InvalidRange { field: String, min: f64, max: f64 },
}
