//! # fontsynth - SoundFont synthesizer and MIDI sequencer
//!
//! Umbrella crate over the fontsynth subsystems:
//! - **fontsynth-midi** - MIDI events, tempo map, sequences, SMF loading
//! - **fontsynth-synth** - Sound banks, voices, channels, voice management
//! - **fontsynth-sequencer** - Tick-driven sequencer with seeking, loops and song lists
//!
//! [`Engine`] ties the synth and the sequencer together for the audio
//! thread; [`EngineHandle`] is the control thread's end.
//!
//! ## Quick Start
//!
//! ```ignore
//! use fontsynth::prelude::*;
//!
//! let (mut engine, mut handle) = Engine::builder().sample_rate(44100.0).build(bank)?;
//! handle.load_sequence(Arc::new(MidiSequence::load("song.mid")?), true)?;
//!
//! // Audio callback
//! engine.render(&mut left, &mut right);
//!
//! // Anywhere
//! let status = handle.status();
//! println!("{:.1}s / {:.1}s", status.song_time(), status.song_duration());
//! ```

pub use fontsynth_midi as midi;
pub use fontsynth_sequencer as sequencer;
pub use fontsynth_synth as synth;

pub use fontsynth_midi::{MidiEvent, MidiSequence, TrackEvent};
pub use fontsynth_sequencer::{
    PlaybackState, SequencerConfig, SequencerEngine, SequencerNotification, SequencerSink,
};
pub use fontsynth_synth::{LogConfig, SoundBank, SynthConfig, SynthMessage, SynthProcessor};

mod error;
pub use error::{Error, Result};

mod builder;
mod command;
mod config;
mod engine;
mod handle;
mod status;

pub use builder::EngineBuilder;
pub use command::EngineCommand;
pub use config::EngineConfig;
pub use engine::Engine;
pub use handle::EngineHandle;
pub use status::EngineStatus;

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{Engine, EngineBuilder, EngineConfig, EngineHandle};

    pub use crate::midi::{MidiSequence, TrackEvent};
    pub use crate::sequencer::{PlaybackState, SequencerNotification};
    pub use crate::synth::{LogConfig, SoundBank, SynthMessage};

    pub use std::sync::Arc;
}
