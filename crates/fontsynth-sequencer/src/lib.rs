//! MIDI sequencer for fontsynth.
//!
//! - **[`SequencerEngine`]** - tick-ordered dispatch, seeking, loops, song list
//! - **[`SequencerSink`]** - what the engine drives; implemented by
//!   [`SynthProcessor`](fontsynth_synth::SynthProcessor)
//! - **[`SequencerNotification`]** - song changes, pauses, loops and text
//!   events, delivered through a lock-free queue
//!
//! ```ignore
//! use fontsynth_sequencer::{SequencerConfig, SequencerEngine};
//!
//! let (mut sequencer, mut notifications) = SequencerEngine::new(SequencerConfig::default())?;
//! sequencer.load_sequence(&mut synth, Arc::new(MidiSequence::load("song.mid")?), true)?;
//! loop {
//!     sequencer.process_tick(&mut synth);
//!     synth.render(&mut left, &mut right);
//! }
//! ```

pub mod error;
pub use error::{Error, Result};

mod config;
mod engine;
mod notification;
mod seek;
mod sink;
mod song_list;

pub use config::SequencerConfig;
pub use engine::{PlaybackState, PlayingNote, SequencerEngine, MAX_PLAYING_NOTES};
pub use notification::{SequencerNotification, TextKind};
pub use sink::SequencerSink;
