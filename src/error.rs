//! Centralized error type for the fontsynth umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("MIDI: {0}")]
    Midi(#[from] fontsynth_midi::Error),

    #[error("Synth: {0}")]
    Synth(#[from] fontsynth_synth::Error),

    #[error("Sequencer: {0}")]
    Sequencer(#[from] fontsynth_sequencer::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The command queue to the audio thread is full; the command was dropped.
    #[error("Command queue full")]
    QueueFull,
}

pub type Result<T> = std::result::Result<T, Error>;
