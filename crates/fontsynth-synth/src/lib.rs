//! SoundFont synthesis core for fontsynth.
//!
//! Renders MIDI channel messages through sample-based voices:
//!
//! - **[`SoundBank`]** - Parsed presets, instruments, zones and samples
//! - **[`GeneratorResolver`]** - Preset + instrument generator sums, clamped
//! - **[`Voice`]** / **[`VolumeEnvelope`]** - Sample playback with a DAHDSR envelope
//! - **[`VoiceManager`]** - Polyphony cap, exclusive classes, hold pedal
//! - **[`ChannelState`]** - Controllers, RPN/NRPN data entry, tuning, vibrato
//! - **[`SynthProcessor`]** - Message-level API, driven once per audio buffer
//!
//! # Quick Start
//!
//! ```ignore
//! use fontsynth_synth::{SynthConfig, SynthProcessor};
//!
//! let mut synth = SynthProcessor::with_sound_bank(SynthConfig::default(), bank)?;
//! synth.note_on(0, 60, 100);
//! synth.render(&mut left, &mut right);
//! ```
//!
//! # Real-time use
//!
//! [`SynthProcessor::render`] never allocates: the voice pool and the
//! channel tables are sized from [`SynthConfig`]. Control threads send
//! [`SynthMessage`]s through [`message_channel`] and swap banks through
//! [`SynthProcessor::shared_sound_bank`].

pub mod error;
pub use error::{Error, Result};

mod config;

pub use config::{LogConfig, SynthConfig, DEFAULT_VOICE_CAP};

pub mod units;

mod soundbank;

pub use soundbank::{
    sum_generator, Generator, GeneratorLimits, GeneratorTable, GeneratorType, Instrument,
    InstrumentZone, NoteLayer, Preset, PresetZone, Sample, SoundBank, ZoneRange, DRUM_BANK,
    GENERATOR_COUNT,
};

mod resolver;

pub use resolver::{
    pan_gains, EnvelopeParameters, GeneratorResolver, LoopMode, VibratoParameters,
    VoiceParameters,
};

mod envelope;

pub use envelope::{EnvelopePhase, VolumeEnvelope};

mod modulation;

pub use modulation::{Lfo, LfoShape};

mod voice;

pub use voice::{ChannelRender, ChannelVibrato, Glide, NoteStart, Voice};

mod mixer;

pub use mixer::VoiceMixer;

mod voice_manager;

pub use voice_manager::{VoiceManager, MIN_NOTE_LENGTH};

mod channel;
mod data_entry;

pub use channel::{ChannelState, ControllerEffect, CustomControllers};
pub use data_entry::DataEntryState;

mod key_modifier;

pub use key_modifier::{KeyMapping, KeyModifier, KeyModifierManager};

mod snapshot;

pub use snapshot::{ChannelSnapshot, MasterSettings, SynthSnapshot};

mod message;

pub use message::{
    message_channel, MessageReceiver, MessageSender, SynthMessage, DEFAULT_QUEUE_CAPACITY,
};

mod processor;
mod sysex;

pub use processor::{MasterParameter, SynthProcessor};
