//! Events the sequencer reports back to the host.

use serde::{Deserialize, Serialize};

/// Which text meta event was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextKind {
    Text,
    Lyric,
    Marker,
    CuePoint,
    TrackName,
    Copyright,
    InstrumentName,
}

/// Pushed into the notification queue from the tick path.
///
/// Text events carry their position instead of the string; look it up in
/// the sequence with `tracks()[track][index]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SequencerNotification {
    /// A new song was loaded. `index` is its position in the song list as
    /// loaded, regardless of shuffle.
    SongChange { index: usize, autoplay: bool },
    /// Playback paused; `finished` is set when the song ran out.
    Pause { finished: bool },
    /// A counted loop was taken. Infinite loops do not report.
    LoopCountChange { remaining: u32 },
    /// Playback jumped to `seconds` into the song.
    TimeChange { seconds: f64 },
    Text {
        kind: TextKind,
        track: usize,
        index: usize,
        ticks: u64,
    },
}
