//! MIDI track events.
//!
//! Every event a track can carry is one variant of [`MidiEvent`]; meta
//! events live in [`MetaEvent`]. Variants carry only the fields they need.

use serde::{Deserialize, Serialize};

/// Center position of the 14-bit pitch wheel.
pub const PITCH_WHEEL_CENTER: u16 = 8192;

/// A channel, system exclusive or meta event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidiEvent {
    NoteOff { channel: u8, key: u8, velocity: u8 },
    NoteOn { channel: u8, key: u8, velocity: u8 },
    PolyPressure { channel: u8, key: u8, pressure: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    ChannelPressure { channel: u8, pressure: u8 },
    /// 14-bit value, [`PITCH_WHEEL_CENTER`] is no bend.
    PitchBend { channel: u8, value: u16 },
    /// System exclusive payload without the leading `0xF0`.
    SysEx(Box<[u8]>),
    Meta(MetaEvent),
}

/// Meta events found in Standard MIDI Files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaEvent {
    SetTempo { micros_per_quarter: u32 },
    TimeSignature { numerator: u8, denominator_pow: u8 },
    KeySignature { sharps: i8, minor: bool },
    MidiPort(u8),
    ChannelPrefix(u8),
    TrackName(String),
    Text(String),
    Lyric(String),
    Marker(String),
    CuePoint(String),
    Copyright(String),
    InstrumentName(String),
    EndOfTrack,
    /// Recognized container, ignored during playback.
    Other(u8),
}

impl MidiEvent {
    /// Channel of a channel voice message.
    #[inline]
    pub fn channel(&self) -> Option<u8> {
        match *self {
            MidiEvent::NoteOff { channel, .. }
            | MidiEvent::NoteOn { channel, .. }
            | MidiEvent::PolyPressure { channel, .. }
            | MidiEvent::ControlChange { channel, .. }
            | MidiEvent::ProgramChange { channel, .. }
            | MidiEvent::ChannelPressure { channel, .. }
            | MidiEvent::PitchBend { channel, .. } => Some(channel),
            MidiEvent::SysEx(_) | MidiEvent::Meta(_) => None,
        }
    }

    /// True for channel voice messages (anything that addresses a channel).
    #[inline]
    pub fn is_voice_event(&self) -> bool {
        self.channel().is_some()
    }

    /// A note-on that actually starts a note.
    #[inline]
    pub fn is_sounding_note_on(&self) -> bool {
        matches!(self, MidiEvent::NoteOn { velocity, .. } if *velocity > 0)
    }

    /// Decode a raw channel voice message (status byte first).
    ///
    /// Returns `None` for system messages, truncated data or running
    /// status, which a live input must resolve before calling this.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        if status < 0x80 || status >= 0xF0 {
            return None;
        }
        let channel = status & 0x0F;
        let byte = |i: usize| data.get(i).map(|b| b & 0x7F);
        let event = match status & 0xF0 {
            0x80 => MidiEvent::NoteOff {
                channel,
                key: byte(0)?,
                velocity: byte(1)?,
            },
            0x90 => MidiEvent::NoteOn {
                channel,
                key: byte(0)?,
                velocity: byte(1)?,
            },
            0xA0 => MidiEvent::PolyPressure {
                channel,
                key: byte(0)?,
                pressure: byte(1)?,
            },
            0xB0 => MidiEvent::ControlChange {
                channel,
                controller: byte(0)?,
                value: byte(1)?,
            },
            0xC0 => MidiEvent::ProgramChange {
                channel,
                program: byte(0)?,
            },
            0xD0 => MidiEvent::ChannelPressure {
                channel,
                pressure: byte(0)?,
            },
            0xE0 => MidiEvent::PitchBend {
                channel,
                value: join_14bit(byte(1)?, byte(0)?),
            },
            _ => return None,
        };
        Some(event)
    }
}

/// Combine MSB and LSB into a 14-bit value.
#[inline]
pub fn join_14bit(msb: u8, lsb: u8) -> u16 {
    ((msb as u16 & 0x7F) << 7) | (lsb as u16 & 0x7F)
}

/// Split a 14-bit value into (MSB, LSB).
#[inline]
pub fn split_14bit(value: u16) -> (u8, u8) {
    (((value >> 7) & 0x7F) as u8, (value & 0x7F) as u8)
}

/// An event positioned on a track in absolute ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackEvent {
    pub ticks: u64,
    pub event: MidiEvent,
}

impl TrackEvent {
    #[inline]
    pub fn new(ticks: u64, event: MidiEvent) -> Self {
        Self { ticks, event }
    }

    pub fn note_on(ticks: u64, channel: u8, key: u8, velocity: u8) -> Self {
        Self::new(
            ticks,
            MidiEvent::NoteOn {
                channel,
                key,
                velocity,
            },
        )
    }

    pub fn note_off(ticks: u64, channel: u8, key: u8) -> Self {
        Self::new(
            ticks,
            MidiEvent::NoteOff {
                channel,
                key,
                velocity: 0,
            },
        )
    }

    pub fn control_change(ticks: u64, channel: u8, controller: u8, value: u8) -> Self {
        Self::new(
            ticks,
            MidiEvent::ControlChange {
                channel,
                controller,
                value,
            },
        )
    }

    pub fn program_change(ticks: u64, channel: u8, program: u8) -> Self {
        Self::new(ticks, MidiEvent::ProgramChange { channel, program })
    }

    pub fn pitch_bend(ticks: u64, channel: u8, value: u16) -> Self {
        Self::new(ticks, MidiEvent::PitchBend { channel, value })
    }

    pub fn tempo(ticks: u64, bpm: f64) -> Self {
        let micros_per_quarter = (60_000_000.0 / bpm).round() as u32;
        Self::new(
            ticks,
            MidiEvent::Meta(MetaEvent::SetTempo { micros_per_quarter }),
        )
    }

    pub fn marker(ticks: u64, text: impl Into<String>) -> Self {
        Self::new(ticks, MidiEvent::Meta(MetaEvent::Marker(text.into())))
    }

    pub fn end_of_track(ticks: u64) -> Self {
        Self::new(ticks, MidiEvent::Meta(MetaEvent::EndOfTrack))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_note_on() {
        let event = MidiEvent::from_bytes(&[0x93, 60, 100]).unwrap();
        assert_eq!(
            event,
            MidiEvent::NoteOn {
                channel: 3,
                key: 60,
                velocity: 100
            }
        );
        assert!(event.is_sounding_note_on());
    }

    #[test]
    fn test_from_bytes_pitch_bend_is_lsb_first() {
        let event = MidiEvent::from_bytes(&[0xE0, 0x00, 0x40]).unwrap();
        assert_eq!(
            event,
            MidiEvent::PitchBend {
                channel: 0,
                value: PITCH_WHEEL_CENTER
            }
        );
    }

    #[test]
    fn test_from_bytes_rejects_system_and_truncated() {
        assert!(MidiEvent::from_bytes(&[0xF8]).is_none());
        assert!(MidiEvent::from_bytes(&[0x90, 60]).is_none());
        assert!(MidiEvent::from_bytes(&[60, 100]).is_none());
        assert!(MidiEvent::from_bytes(&[]).is_none());
    }

    #[test]
    fn test_14bit_split() {
        assert_eq!(split_14bit(PITCH_WHEEL_CENTER), (64, 0));
        assert_eq!(join_14bit(127, 127), 16383);
    }

    #[test]
    fn test_channel_of_meta_is_none() {
        assert_eq!(TrackEvent::end_of_track(0).event.channel(), None);
        assert_eq!(TrackEvent::note_off(0, 9, 36).event.channel(), Some(9));
    }

    #[test]
    fn test_tempo_event_micros() {
        let event = TrackEvent::tempo(0, 120.0);
        assert_eq!(
            event.event,
            MidiEvent::Meta(MetaEvent::SetTempo {
                micros_per_quarter: 500_000
            })
        );
    }
}
