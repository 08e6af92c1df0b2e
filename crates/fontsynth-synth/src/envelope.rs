//! DAHDSR volume envelope.
//!
//! Attack is linear in amplitude, decay and release are linear in decibels.
//! Phases with zero length are skipped inside a single [`advance`] call, so a
//! zone with no envelope reaches its sustain level on the first sample.
//!
//! [`advance`]: VolumeEnvelope::advance

use crate::resolver::EnvelopeParameters;
use crate::units::{decibel_attenuation_to_gain, gain_to_decibel_attenuation, MIN_AUDIBLE_GAIN};

/// Release target: -160 dB relative to the level at note off.
const RELEASE_FLOOR: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopePhase {
    #[default]
    Delay,
    Attack,
    Hold,
    Decay,
    Sustain,
    Release,
    Finished,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeEnvelope {
    params: EnvelopeParameters,
    phase: EnvelopePhase,
    /// Seconds spent in the current phase.
    phase_time: f64,
    gain: f64,
    release_start_gain: f64,
}

impl VolumeEnvelope {
    pub fn new(params: EnvelopeParameters) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    #[inline]
    pub fn phase(&self) -> EnvelopePhase {
        self.phase
    }

    /// Gain produced by the last [`advance`](Self::advance).
    #[inline]
    pub fn gain(&self) -> f64 {
        self.gain
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.phase == EnvelopePhase::Finished
    }

    #[inline]
    pub fn is_releasing(&self) -> bool {
        matches!(self.phase, EnvelopePhase::Release | EnvelopePhase::Finished)
    }

    /// Enter the release phase from wherever the envelope is.
    pub fn release(&mut self) {
        if self.is_releasing() {
            return;
        }
        self.release_start_gain = self.gain;
        self.phase = EnvelopePhase::Release;
        self.phase_time = 0.0;
        if self.params.release <= 0.0 || self.gain < MIN_AUDIBLE_GAIN {
            self.finish();
        }
    }

    /// Stop immediately.
    pub fn finish(&mut self) {
        self.phase = EnvelopePhase::Finished;
        self.gain = 0.0;
    }

    /// Move forward by `dt` seconds and return the new gain.
    pub fn advance(&mut self, dt: f64) -> f64 {
        if self.is_finished() {
            return 0.0;
        }
        self.phase_time += dt;

        // Carry leftover time through every phase that has completed.
        while let Some(length) = self.phase_length() {
            if self.phase_time < length {
                break;
            }
            self.phase_time -= length;
            self.phase = match self.phase {
                EnvelopePhase::Delay => EnvelopePhase::Attack,
                EnvelopePhase::Attack => EnvelopePhase::Hold,
                EnvelopePhase::Hold => EnvelopePhase::Decay,
                EnvelopePhase::Decay => EnvelopePhase::Sustain,
                _ => EnvelopePhase::Finished,
            };
            if self.phase == EnvelopePhase::Finished {
                self.finish();
                return 0.0;
            }
        }

        self.gain = match self.phase {
            EnvelopePhase::Delay => 0.0,
            EnvelopePhase::Attack => self.params.peak_gain * self.phase_time / self.params.attack,
            EnvelopePhase::Hold => self.params.peak_gain,
            EnvelopePhase::Decay => self.decay_gain(),
            EnvelopePhase::Sustain => self.params.sustain_gain,
            EnvelopePhase::Release => {
                self.release_start_gain
                    * RELEASE_FLOOR.powf(self.phase_time / self.params.release)
            }
            EnvelopePhase::Finished => 0.0,
        };

        let silent = match self.phase {
            EnvelopePhase::Sustain | EnvelopePhase::Release => self.gain < MIN_AUDIBLE_GAIN,
            _ => false,
        };
        if silent {
            self.finish();
        }
        self.gain
    }

    fn phase_length(&self) -> Option<f64> {
        match self.phase {
            EnvelopePhase::Delay => Some(self.params.delay),
            EnvelopePhase::Attack => Some(self.params.attack),
            EnvelopePhase::Hold => Some(self.params.hold),
            EnvelopePhase::Decay => Some(self.params.decay),
            EnvelopePhase::Release => Some(self.params.release),
            EnvelopePhase::Sustain | EnvelopePhase::Finished => None,
        }
    }

    fn decay_gain(&self) -> f64 {
        let peak = self.params.peak_gain;
        let sustain = self.params.sustain_gain;
        if peak < MIN_AUDIBLE_GAIN || sustain < MIN_AUDIBLE_GAIN {
            // Decibel interpolation is undefined at silence; fall back to linear.
            return peak + (sustain - peak) * self.phase_time / self.params.decay;
        }
        let peak_db = gain_to_decibel_attenuation(peak);
        let sustain_db = gain_to_decibel_attenuation(sustain);
        decibel_attenuation_to_gain(
            peak_db + (sustain_db - peak_db) * self.phase_time / self.params.decay,
        )
    }
}
