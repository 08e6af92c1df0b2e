//! A single sounding sample layer.
//!
//! A voice owns its playback position, volume envelope and LFOs. Channel
//! state that can change while the note sounds (volume, pan, pitch bend, mod
//! wheel) is passed in per buffer through [`ChannelRender`].

use std::sync::Arc;

use crate::envelope::VolumeEnvelope;
use crate::modulation::{Lfo, LfoShape};
use crate::resolver::{pan_gains, LoopMode, VoiceParameters};
use crate::soundbank::Sample;
use crate::units::cents_to_ratio;

/// Channel vibrato set through NRPN.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct ChannelVibrato {
    pub rate_hz: f64,
    pub depth_cents: f64,
    pub delay: f64,
}

impl ChannelVibrato {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.depth_cents != 0.0 && self.rate_hz > 0.0
    }
}

/// Per-buffer channel values applied to every voice on the channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelRender {
    /// Channel and master gain combined.
    pub gain: f64,
    /// Pan offset in [-1, 1] added to the zone pan.
    pub pan: f64,
    /// Pitch bend plus tunings, in cents.
    pub pitch_cents: f64,
    /// Extra vibrato depth from the modulation wheel, in cents.
    pub mod_wheel_cents: f64,
    pub vibrato: ChannelVibrato,
}

impl Default for ChannelRender {
    fn default() -> Self {
        Self {
            gain: 1.0,
            pan: 0.0,
            pitch_cents: 0.0,
            mod_wheel_cents: 0.0,
            vibrato: ChannelVibrato::default(),
        }
    }
}

/// Glide from a previous key towards the voice key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glide {
    pub from_key: u8,
    pub seconds: f64,
}

/// Voice identity and note-on context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteStart {
    pub channel: usize,
    /// Key after transpose; note off matches on this.
    pub real_key: u8,
    pub is_drum: bool,
    /// (bank, program) of the preset that started the voice.
    pub preset: (u16, u8),
    /// Synth time at note on, in seconds.
    pub start_time: f64,
    /// Extra linear gain (key modifiers).
    pub gain: f64,
    pub glide: Option<Glide>,
    pub vibrato: ChannelVibrato,
}

#[derive(Debug, Clone)]
pub struct Voice {
    sample: Arc<Sample>,
    params: VoiceParameters,
    envelope: VolumeEnvelope,
    vibrato_lfo: Lfo,
    channel_lfo: Lfo,
    pub channel: usize,
    pub real_key: u8,
    pub velocity: u8,
    pub is_drum: bool,
    pub preset: (u16, u8),
    pub start_time: f64,
    /// Held by the sustain pedal after its note off.
    pub sustained: bool,
    /// Note off arrived before the minimum note length; release at this time.
    pub pending_release: Option<f64>,
    gain: f64,
    position: f64,
    glide_offset_cents: f64,
    glide_remaining: f64,
    glide_total: f64,
    finished: bool,
}

impl Voice {
    pub fn new(sample: Arc<Sample>, params: VoiceParameters, note: NoteStart) -> Self {
        let (glide_offset_cents, glide_total) = match note.glide {
            Some(glide) if glide.seconds > 0.0 && glide.from_key != params.key => (
                (glide.from_key as f64 - params.key as f64) * params.scale_tuning,
                glide.seconds,
            ),
            _ => (0.0, 0.0),
        };
        Self {
            envelope: VolumeEnvelope::new(params.envelope),
            vibrato_lfo: Lfo::new(
                LfoShape::Triangle,
                params.vibrato.frequency_hz,
                params.vibrato.delay,
            ),
            channel_lfo: Lfo::new(LfoShape::Sine, note.vibrato.rate_hz, note.vibrato.delay),
            channel: note.channel,
            real_key: note.real_key,
            velocity: params.velocity,
            is_drum: note.is_drum,
            preset: note.preset,
            start_time: note.start_time,
            sustained: false,
            pending_release: None,
            gain: note.gain,
            position: params.start as f64,
            glide_offset_cents,
            glide_remaining: glide_total,
            glide_total,
            finished: false,
            sample,
            params,
        }
    }

    #[inline]
    pub fn params(&self) -> &VoiceParameters {
        &self.params
    }

    #[inline]
    pub fn exclusive_class(&self) -> u32 {
        self.params.exclusive_class
    }

    #[inline]
    pub fn envelope(&self) -> &VolumeEnvelope {
        &self.envelope
    }

    #[inline]
    pub fn is_releasing(&self) -> bool {
        self.envelope.is_releasing()
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished || self.envelope.is_finished()
    }

    /// Start the release phase. Clears the sustained flag.
    pub fn release(&mut self) {
        self.sustained = false;
        self.pending_release = None;
        self.envelope.release();
    }

    /// Silence immediately; the mixer retires the voice after this buffer.
    pub fn kill(&mut self) {
        self.envelope.finish();
        self.finished = true;
    }

    /// Eviction score: lower goes first.
    pub fn priority(&self) -> f64 {
        let mut priority = self.velocity as f64 / 25.0;
        if self.is_drum {
            priority += 5.0;
        }
        if self.is_releasing() {
            priority -= 5.0;
        }
        priority
    }

    /// Mix this voice into `left` / `right`. Returns false once finished.
    pub fn render(
        &mut self,
        left: &mut [f32],
        right: &mut [f32],
        channel: &ChannelRender,
        sample_rate: f64,
    ) -> bool {
        if self.is_finished() {
            return false;
        }
        let frames = left.len().min(right.len());
        let block = frames as f64 / sample_rate;
        let dt = 1.0 / sample_rate;

        let vibrato = self.vibrato_lfo.advance(block)
            * (self.params.vibrato.depth_cents + channel.mod_wheel_cents);
        let channel_vibrato = if channel.vibrato.is_active() {
            self.channel_lfo.advance(block) * channel.vibrato.depth_cents
        } else {
            0.0
        };
        let cents = self.params.pitch_cents
            + channel.pitch_cents
            + self.advance_glide(block)
            + vibrato
            + channel_vibrato;
        let step = self.params.base_rate * cents_to_ratio(cents);

        let (pan_left, pan_right) = pan_gains(self.params.pan + channel.pan);
        let gain = channel.gain * self.gain;
        let gain_left = gain * pan_left as f64;
        let gain_right = gain * pan_right as f64;

        let data = self.sample.data();
        let end = self.params.end;
        let loop_start = self.params.loop_start;
        let loop_end = self.params.loop_end;

        for i in 0..frames {
            let level = self.envelope.advance(dt);
            if self.envelope.is_finished() {
                self.finished = true;
                break;
            }
            let looping = match self.params.loop_mode {
                LoopMode::NoLoop => false,
                LoopMode::Continuous => true,
                LoopMode::UntilRelease => !self.envelope.is_releasing(),
            };

            let index = self.position as usize;
            let frac = (self.position - index as f64) as f32;
            let next = if looping && index + 1 >= loop_end {
                loop_start
            } else {
                (index + 1).min(end)
            };
            let current = data.get(index).copied().unwrap_or(0.0);
            let following = data.get(next).copied().unwrap_or(0.0);
            let value = current + (following - current) * frac;

            left[i] += value * (level * gain_left) as f32;
            right[i] += value * (level * gain_right) as f32;

            self.position += step;
            if looping && self.position >= loop_end as f64 {
                let length = (loop_end - loop_start) as f64;
                while self.position >= loop_end as f64 {
                    self.position -= length;
                }
            } else if self.position >= end as f64 {
                self.finished = true;
                break;
            }
        }
        !self.finished
    }

    fn advance_glide(&mut self, block: f64) -> f64 {
        if self.glide_remaining <= 0.0 {
            return 0.0;
        }
        let offset = self.glide_offset_cents * self.glide_remaining / self.glide_total;
        self.glide_remaining -= block;
        offset
    }
}
