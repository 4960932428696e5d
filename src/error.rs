//! Configuration errors
//!
//! The simulation itself has no recoverable errors; only setup can fail.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown control scheme `{0}` (expected `human`, `cpu` or `cpu:<level>`)")]
    UnknownControlScheme(String),

    #[error("cpu level {level} is out of range (0..={max})")]
    CpuLevelOutOfRange { level: u32, max: u8 },

    #[error("match duration must be positive, got {0}")]
    InvalidDuration(f32),

    #[error("could not read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A player slot outside the two the match has
#[derive(Debug, Error, PartialEq, Eq)]
#[error("player index {0} is out of range (0..=1)")]
pub struct InvalidPlayerId(pub usize);
