//! Error types for fontsynth-synth.

use thiserror::Error;

/// Result type alias for fontsynth-synth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in fontsynth-synth.
///
/// Only construction and configuration can fail. Everything reachable from
/// the render callback logs and carries on instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration parameter.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Sound bank contents are unusable.
    #[error("Sound bank error: {0}")]
    SoundBank(String),

    /// Sample data does not match its declared layout.
    #[error("Invalid sample '{name}': {reason}")]
    InvalidSample { name: String, reason: String },
}
