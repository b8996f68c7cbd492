use thiserror::Error;

/// Errors that can occur while constructing a ring buffer.
///
/// Construction is the only fallible phase: once a ring exists, every
/// steady-state operation (`write`/`read`/`peek`/`poke`/`used`/`free`)
/// saturates at the buffer boundaries instead of erroring.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RingError {
    #[error("invalid capacity: {0}")]
    InvalidCapacity(String),

    #[error("mirrored allocation failed: {0}")]
    Allocation(String),

    #[error("unusable mirrored region: {0}")]
    Region(String),
}
