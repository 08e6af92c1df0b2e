//! Error types for fontsynth-sequencer.

use thiserror::Error;

/// Result type alias for sequencer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that prevent playback from starting.
///
/// Once a song list is loaded nothing in the tick path can fail.
#[derive(Debug, Error)]
pub enum Error {
    /// `load_song_list` was given no sequences.
    #[error("Song list is empty")]
    EmptySongList,

    /// The sequence has no channel events, so there is nothing to play.
    #[error("Sequence '{0}' has zero duration")]
    ZeroDuration(String),

    /// Invalid configuration parameter.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("MIDI error: {0}")]
    Midi(#[from] fontsynth_midi::Error),
}
