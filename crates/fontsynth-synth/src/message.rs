//! Lock-free control messages into the render thread.
//!
//! A bounded single-producer/single-consumer ring buffer. The control
//! thread pushes with [`MessageSender::send`], the render callback drains
//! with [`MessageReceiver::try_recv`] before mixing. Nothing blocks.

use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};

use fontsynth_midi::MidiEvent;

use crate::key_modifier::KeyModifier;
use crate::processor::MasterParameter;

/// Default capacity of a message queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// A control message for [`SynthProcessor`](crate::SynthProcessor).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SynthMessage {
    NoteOn { channel: usize, key: u8, velocity: u8 },
    NoteOff { channel: usize, key: u8 },
    ControlChange { channel: usize, controller: u8, value: u8 },
    ProgramChange { channel: usize, program: u8 },
    /// 14-bit pitch wheel value.
    PitchWheel { channel: usize, value: u16 },
    /// `None` resets the whole synthesizer.
    ResetAllControllers(Option<usize>),
    Master(MasterParameter),
    StopAll { channel: Option<usize>, force: bool },
    KillVoices(usize),
    MuteChannel { channel: usize, muted: bool },
    SetDrums { channel: usize, is_drum: bool },
    LockPreset { channel: usize, locked: bool },
    LockController { channel: usize, controller: u8, locked: bool },
    TransposeChannel { channel: usize, semitones: f64, force: bool },
    VelocityOverride { channel: usize, velocity: Option<u8> },
    /// `None` removes the mapping.
    KeyModifier { channel: usize, key: u8, modifier: Option<KeyModifier> },
}

impl SynthMessage {
    /// Channel voice messages from a MIDI event; `channel_offset` selects
    /// the port block.
    pub fn from_midi(event: &MidiEvent, channel_offset: usize) -> Option<Self> {
        let message = match *event {
            MidiEvent::NoteOn { channel, key, velocity } => SynthMessage::NoteOn {
                channel: channel as usize + channel_offset,
                key,
                velocity,
            },
            MidiEvent::NoteOff { channel, key, .. } => SynthMessage::NoteOff {
                channel: channel as usize + channel_offset,
                key,
            },
            MidiEvent::ControlChange { channel, controller, value } => {
                SynthMessage::ControlChange {
                    channel: channel as usize + channel_offset,
                    controller,
                    value,
                }
            }
            MidiEvent::ProgramChange { channel, program } => SynthMessage::ProgramChange {
                channel: channel as usize + channel_offset,
                program,
            },
            MidiEvent::PitchBend { channel, value } => SynthMessage::PitchWheel {
                channel: channel as usize + channel_offset,
                value,
            },
            _ => return None,
        };
        Some(message)
    }
}

/// Producing end, owned by the control thread.
pub struct MessageSender<T> {
    producer: HeapProd<T>,
}

impl<T> MessageSender<T> {
    /// Returns false if the queue is full.
    #[inline]
    pub fn send(&mut self, message: T) -> bool {
        self.producer.try_push(message).is_ok()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.producer.is_full()
    }
}

/// Consuming end, owned by the render thread.
pub struct MessageReceiver<T> {
    consumer: HeapCons<T>,
}

impl<T> MessageReceiver<T> {
    #[inline]
    pub fn try_recv(&mut self) -> Option<T> {
        self.consumer.try_pop()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.consumer.occupied_len()
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        !self.consumer.is_empty()
    }

    /// Drain everything into a vector. Not for the render thread.
    pub fn drain_all(&mut self) -> Vec<T> {
        let mut messages = Vec::with_capacity(self.consumer.occupied_len());
        while let Some(message) = self.consumer.try_pop() {
            messages.push(message);
        }
        messages
    }
}

/// Create a bounded queue.
pub fn message_channel<T>(capacity: usize) -> (MessageSender<T>, MessageReceiver<T>) {
    let rb = HeapRb::new(capacity.max(1));
    let (producer, consumer) = rb.split();
    (MessageSender { producer }, MessageReceiver { consumer })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_and_receive_in_order() {
        let (mut tx, mut rx) = message_channel(8);
        assert!(tx.send(SynthMessage::NoteOn {
            channel: 0,
            key: 60,
            velocity: 100
        }));
        assert!(tx.send(SynthMessage::NoteOff { channel: 0, key: 60 }));
        assert_eq!(rx.pending_count(), 2);
        assert!(matches!(rx.try_recv(), Some(SynthMessage::NoteOn { key: 60, .. })));
        assert!(matches!(rx.try_recv(), Some(SynthMessage::NoteOff { .. })));
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_full_queue_rejects() {
        let (mut tx, _rx) = message_channel(2);
        assert!(tx.send(SynthMessage::KillVoices(1)));
        assert!(tx.send(SynthMessage::KillVoices(2)));
        assert!(tx.is_full());
        assert!(!tx.send(SynthMessage::KillVoices(3)));
    }

    #[test]
    fn test_from_midi_applies_port_offset() {
        let event = MidiEvent::NoteOn {
            channel: 2,
            key: 64,
            velocity: 90,
        };
        assert_eq!(
            SynthMessage::from_midi(&event, 16),
            Some(SynthMessage::NoteOn {
                channel: 18,
                key: 64,
                velocity: 90
            })
        );
        assert_eq!(
            SynthMessage::from_midi(&MidiEvent::SysEx(Box::new([0x7E])), 0),
            None
        );
    }
}
