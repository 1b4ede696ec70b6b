//! Error types for yard operations.

use thiserror::Error;
use yard_core::Position;

/// Result type alias for yard operations.
pub type YardResult<T> = Result<T, YardError>;

/// Typed failures of yard operations.
///
/// Any operation returning one of these has left the yard unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum YardError {
    #[error("position {0} is outside the yard")]
    InvalidPosition(Position),

    #[error("cell {0} is already occupied")]
    OccupiedCell(Position),

    #[error("stack at ({}, {}) would weigh {stack_weight} with a limit of {limit}", .position.x, .position.y)]
    WeightLimitExceeded {
        position: Position,
        stack_weight: f64,
        limit: f64,
    },

    #[error("unknown container: {0}")]
    UnknownContainerId(String),

    #[error("duplicate container: {0}")]
    DuplicateContainerId(String),

    #[error("no available placement for container: {0}")]
    NoAvailablePlacement(String),

    #[error("invalid weight {weight} for container {id}")]
    InvalidWeight { id: String, weight: f64 },
}
