//! Shared error type for construction and lifecycle operations.

use thiserror::Error;

/// Result type for swarm construction and lifecycle operations.
pub type SwarmResult<T> = Result<T, SwarmError>;

/// Errors surfaced by `Swarm::new` and explicit lifecycle operations.
///
/// Per-tick per-agent faults never produce one of these; they are caught at
/// the worker boundary and the tick loop continues (see §7 of the spec).
#[derive(Error, Debug)]
pub enum SwarmError {
    #[error("agent count must be positive, got {0}")]
    InvalidCount(i64),

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("allocation failure: {0}")]
    AllocationFailure(String),
}
