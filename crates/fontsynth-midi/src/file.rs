//! Standard MIDI File loading.
//!
//! Parses SMF data with `midly` and converts every track into absolute-tick
//! [`TrackEvent`]s, then builds a [`MidiSequence`].

use std::path::Path;

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use tracing::debug;

use crate::error::{Error, Result};
use crate::event::{MetaEvent, MidiEvent, TrackEvent};
use crate::sequence::MidiSequence;

impl MidiSequence {
    /// Load and parse a MIDI file from disk. The file stem becomes the name.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_smf(&data, name)
    }

    /// Parse an in-memory Standard MIDI File.
    pub fn from_smf(data: &[u8], name: impl Into<String>) -> Result<Self> {
        let smf = Smf::parse(data)?;

        let time_division = match smf.header.timing {
            Timing::Metrical(tpb) => tpb.as_int(),
            Timing::Timecode(_, _) => {
                return Err(Error::UnsupportedTiming);
            }
        };

        debug!(
            "Parsing MIDI file: {} tracks, {} ticks per beat",
            smf.tracks.len(),
            time_division
        );

        let tracks = smf
            .tracks
            .iter()
            .map(|track| {
                let mut ticks = 0u64;
                track
                    .iter()
                    .filter_map(|event| {
                        ticks += event.delta.as_int() as u64;
                        convert_event(&event.kind).map(|e| TrackEvent::new(ticks, e))
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        Self::new(name, time_division, tracks)
    }
}

fn convert_event(kind: &TrackEventKind) -> Option<MidiEvent> {
    match kind {
        TrackEventKind::Midi { channel, message } => {
            let channel = channel.as_int();
            let event = match *message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() == 0 => MidiEvent::NoteOff {
                    channel,
                    key: key.as_int(),
                    velocity: 0,
                },
                MidiMessage::NoteOn { key, vel } => MidiEvent::NoteOn {
                    channel,
                    key: key.as_int(),
                    velocity: vel.as_int(),
                },
                MidiMessage::NoteOff { key, vel } => MidiEvent::NoteOff {
                    channel,
                    key: key.as_int(),
                    velocity: vel.as_int(),
                },
                MidiMessage::Aftertouch { key, vel } => MidiEvent::PolyPressure {
                    channel,
                    key: key.as_int(),
                    pressure: vel.as_int(),
                },
                MidiMessage::Controller { controller, value } => MidiEvent::ControlChange {
                    channel,
                    controller: controller.as_int(),
                    value: value.as_int(),
                },
                MidiMessage::ProgramChange { program } => MidiEvent::ProgramChange {
                    channel,
                    program: program.as_int(),
                },
                MidiMessage::ChannelAftertouch { vel } => MidiEvent::ChannelPressure {
                    channel,
                    pressure: vel.as_int(),
                },
                MidiMessage::PitchBend { bend } => MidiEvent::PitchBend {
                    channel,
                    value: bend.0.as_int(),
                },
            };
            Some(event)
        }
        TrackEventKind::SysEx(data) => Some(MidiEvent::SysEx((*data).into())),
        TrackEventKind::Escape(_) => None,
        TrackEventKind::Meta(meta) => Some(MidiEvent::Meta(convert_meta(meta))),
    }
}

fn convert_meta(meta: &MetaMessage) -> MetaEvent {
    let text = |bytes: &[u8]| String::from_utf8_lossy(bytes).into_owned();
    match *meta {
        MetaMessage::Tempo(tempo) => MetaEvent::SetTempo {
            micros_per_quarter: tempo.as_int(),
        },
        MetaMessage::TimeSignature(numerator, denominator_pow, _, _) => MetaEvent::TimeSignature {
            numerator,
            denominator_pow,
        },
        MetaMessage::KeySignature(sharps, minor) => MetaEvent::KeySignature { sharps, minor },
        MetaMessage::MidiPort(port) => MetaEvent::MidiPort(port.as_int()),
        MetaMessage::MidiChannel(channel) => MetaEvent::ChannelPrefix(channel.as_int()),
        MetaMessage::TrackName(bytes) => MetaEvent::TrackName(text(bytes)),
        MetaMessage::Text(bytes) => MetaEvent::Text(text(bytes)),
        MetaMessage::Lyric(bytes) => MetaEvent::Lyric(text(bytes)),
        MetaMessage::Marker(bytes) => MetaEvent::Marker(text(bytes)),
        MetaMessage::CuePoint(bytes) => MetaEvent::CuePoint(text(bytes)),
        MetaMessage::Copyright(bytes) => MetaEvent::Copyright(text(bytes)),
        MetaMessage::InstrumentName(bytes) => MetaEvent::InstrumentName(text(bytes)),
        MetaMessage::EndOfTrack => MetaEvent::EndOfTrack,
        MetaMessage::TrackNumber(_) => MetaEvent::Other(0x00),
        MetaMessage::ProgramName(_) => MetaEvent::Other(0x08),
        MetaMessage::DeviceName(_) => MetaEvent::Other(0x09),
        MetaMessage::SmpteOffset(_) => MetaEvent::Other(0x54),
        MetaMessage::SequencerSpecific(_) => MetaEvent::Other(0x7F),
        MetaMessage::Unknown(kind, _) => MetaEvent::Other(kind),
    }
}
