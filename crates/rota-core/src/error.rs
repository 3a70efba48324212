//! Error types for rota

use thiserror::Error;

/// Main error type for rota operations
#[derive(Debug, Error)]
pub enum RotaError {
    /// Caller supplied an out-of-range or inconsistent argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation is not legal in the current state (e.g. stepping an
    /// operator before `init`)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A neighbor was requested before any candidate had been evaluated
    #[error("No neighbor has been evaluated yet")]
    NoSuchNeighbor,

    /// Construction exhausted candidate employees while demand remained
    #[error("No feasible solution: {0}")]
    NoFeasibleSolution(String),

    /// Internal error (should not occur in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for rota operations
pub type Result<T> = std::result::Result<T, RotaError>;
