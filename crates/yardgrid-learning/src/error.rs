//! Learning error types.

use thiserror::Error;

/// Result type alias for learning operations.
pub type LearningResult<T> = Result<T, LearningError>;

#[derive(Debug, Error)]
pub enum LearningError {
    #[error("model file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("model has {found} weights, expected {expected}")]
    FeatureMismatch { expected: usize, found: usize },
}
