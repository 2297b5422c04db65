//! RNG error types

use thiserror::Error;

/// Errors raised by generators and draw primitives
#[derive(Debug, Error)]
pub enum RngError {
    #[error("OS entropy source failed: {0}")]
    Entropy(String),

    #[error("cannot draw from an empty range")]
    EmptyRange,

    #[error("weights are empty or sum to zero")]
    ZeroWeight,

    #[error("weight sum overflows u64")]
    WeightOverflow,

    #[error("scripted draw sequence exhausted after {0} draws")]
    ScriptExhausted(usize),

    #[error("scripted draw {value} is outside range 0..{range}")]
    ScriptMismatch { value: u64, range: u64 },

    #[error("failed to spawn exerciser thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Result type alias
pub type RngResult<T> = Result<T, RngError>;
