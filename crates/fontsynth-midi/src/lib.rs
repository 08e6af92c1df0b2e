//! MIDI data model for fontsynth.
//!
//! - **[`MidiEvent`]** / **[`MetaEvent`]** - closed set of track events
//! - **[`TempoMap`]** - reverse-sorted tempo changes, tick to seconds
//! - **[`MidiSequence`]** - tracks plus loop points, first note, duration, ports
//! - **[`controller`]** - controller numbers and reset tables
//!
//! Standard MIDI Files are read with `midly`:
//!
//! ```ignore
//! use fontsynth_midi::MidiSequence;
//!
//! let seq = MidiSequence::load("song.mid")?;
//! println!("{} lasts {:.1}s", seq.name(), seq.duration());
//! ```

pub mod controller;
pub mod error;
mod event;
mod file;
mod sequence;
mod tempo_map;

pub use error::{Error, Result};
pub use event::{
    join_14bit, split_14bit, MetaEvent, MidiEvent, TrackEvent, PITCH_WHEEL_CENTER,
};
pub use sequence::{LoopRegion, MidiSequence};
pub use tempo_map::{seconds_per_tick, TempoChange, TempoMap, DEFAULT_BPM};

/// Channels addressed by one MIDI port.
pub const CHANNELS_PER_PORT: usize = 16;

/// Default percussion channel (zero-based).
pub const DEFAULT_PERCUSSION_CHANNEL: usize = 9;
