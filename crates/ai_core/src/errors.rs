//! Error types for the rating core

use thiserror::Error;

/// Errors that can occur while encoding records or fitting the regression model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// No usable records, or a record that cannot be interpreted
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// A value outside the encoder's fixed vocabulary
    #[error("Unknown category {value:?} for attribute '{attribute}'")]
    UnknownCategory { attribute: String, value: String },

    /// A record lacks an attribute the encoder requires
    #[error("Record '{record}' is missing attribute '{attribute}'")]
    MissingAttribute { attribute: String, record: String },

    /// Optimization or factorization produced non-finite values
    #[error("Numeric fit failure: {0}")]
    NumericFit(String),

    /// Matrix or vector dimensions disagree
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Invalid model parameters
    #[error("Invalid model parameters: {0}")]
    InvalidParameters(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
