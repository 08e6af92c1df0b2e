//! Error types for the MIDI data model.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MIDI parse error: {0}")]
    MidiFileParse(String),

    #[error("Unsupported MIDI timing format (SMPTE timecode)")]
    UnsupportedTiming,

    /// The sequence contains no tracks at all.
    #[error("MIDI sequence has no tracks")]
    NoTracks,

    #[error("Invalid time division: {0}")]
    InvalidTimeDivision(u16),
}

impl From<midly::Error> for Error {
    fn from(e: midly::Error) -> Self {
        Error::MidiFileParse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
