//! Generator resolution: turns a zone pair plus (key, velocity) into the
//! concrete parameters a voice plays with.

use crate::soundbank::{sum_generator, GeneratorTable, GeneratorType, NoteLayer, Sample};
use crate::units::{
    absolute_cents_to_hz, decibel_attenuation_to_gain, timecents_to_seconds,
    EMU_ATTENUATION_CORRECTION, MAX_RELEASE_SECONDS,
};

/// Timecents at or below this are treated as instantaneous.
const INSTANT_TIMECENTS: i32 = -11990;

/// Smallest usable loop, in frames.
const MIN_LOOP_FRAMES: usize = 1;

/// How the sample loop behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    NoLoop,
    /// Loop for the lifetime of the voice.
    Continuous,
    /// Loop until release, then play out to the end.
    UntilRelease,
}

impl LoopMode {
    pub fn from_sample_modes(value: i32) -> Self {
        match value {
            1 => LoopMode::Continuous,
            3 => LoopMode::UntilRelease,
            _ => LoopMode::NoLoop,
        }
    }
}

/// Volume envelope timing and levels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnvelopeParameters {
    pub delay: f64,
    pub attack: f64,
    pub hold: f64,
    pub decay: f64,
    pub release: f64,
    /// Linear gain at the end of attack.
    pub peak_gain: f64,
    /// Linear gain held during sustain.
    pub sustain_gain: f64,
}

/// Vibrato LFO settings from the zone.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VibratoParameters {
    pub frequency_hz: f64,
    pub delay: f64,
    /// Peak pitch deviation in cents.
    pub depth_cents: f64,
}

/// Everything a voice needs that is fixed at note on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParameters {
    /// Key after the keynum override.
    pub key: u8,
    /// Velocity after the velocity override.
    pub velocity: u8,
    pub root_key: u8,
    /// Cents per key (100 is equal temperament).
    pub scale_tuning: f64,
    /// Pitch relative to the sample's recorded pitch, in cents.
    pub pitch_cents: f64,
    /// Sample rate conversion factor at `pitch_cents` zero.
    pub base_rate: f64,
    /// Pan position in [-1, 1].
    pub pan: f64,
    pub envelope: EnvelopeParameters,
    pub vibrato: VibratoParameters,
    pub loop_mode: LoopMode,
    pub start: usize,
    pub end: usize,
    pub loop_start: usize,
    pub loop_end: usize,
    pub exclusive_class: u32,
}

/// Sums instrument and preset generators for one note layer.
pub struct GeneratorResolver<'a> {
    instrument: &'a GeneratorTable,
    preset: &'a GeneratorTable,
}

impl<'a> GeneratorResolver<'a> {
    pub fn new(instrument: &'a GeneratorTable, preset: &'a GeneratorTable) -> Self {
        Self { instrument, preset }
    }

    pub fn for_layer(layer: &'a NoteLayer) -> Self {
        Self::new(&layer.instrument_generators, &layer.preset_generators)
    }

    #[inline]
    pub fn sum(&self, kind: GeneratorType) -> i32 {
        sum_generator(kind, self.instrument, self.preset)
    }

    /// Resolve everything for `sample` played at `key` / `velocity` into an
    /// output running at `output_rate`.
    pub fn resolve(
        &self,
        sample: &Sample,
        key: u8,
        velocity: u8,
        output_rate: f64,
    ) -> VoiceParameters {
        let key = self.override_or(GeneratorType::KeyNum, key);
        let velocity = self.override_or(GeneratorType::Velocity, velocity);
        let root_key = self.override_or(GeneratorType::OverridingRootKey, sample.original_key);

        // Clamped to [0, 1200]; 0 turns key tracking off.
        let scale_tuning = self.sum(GeneratorType::ScaleTuning) as f64;
        let tune_cents = self.sum(GeneratorType::CoarseTune) as f64 * 100.0
            + self.sum(GeneratorType::FineTune) as f64;
        let pitch_cents = (key as f64 - root_key as f64) * scale_tuning + tune_cents
            - sample.pitch_correction as f64;

        let (start, end, loop_start, loop_end, loop_mode) = self.sample_window(sample);

        VoiceParameters {
            key,
            velocity,
            root_key,
            scale_tuning,
            pitch_cents,
            base_rate: sample.sample_rate as f64 / output_rate,
            pan: self.sum(GeneratorType::Pan) as f64 / 500.0,
            envelope: self.envelope(key, velocity),
            vibrato: VibratoParameters {
                frequency_hz: absolute_cents_to_hz(self.sum(GeneratorType::FreqVibLfo) as f64),
                delay: timecents_to_seconds(self.sum(GeneratorType::DelayVibLfo) as f64),
                depth_cents: self.sum(GeneratorType::VibLfoToPitch) as f64,
            },
            loop_mode,
            start,
            end,
            loop_start,
            loop_end,
            exclusive_class: self.sum(GeneratorType::ExclusiveClass).max(0) as u32,
        }
    }

    fn override_or(&self, kind: GeneratorType, fallback: u8) -> u8 {
        let value = self.sum(kind);
        if value >= 0 {
            value as u8
        } else {
            fallback
        }
    }

    fn envelope(&self, key: u8, velocity: u8) -> EnvelopeParameters {
        let key_offset = 60 - key as i32;
        let instant_or_seconds = |timecents: i32| {
            if timecents <= INSTANT_TIMECENTS {
                0.0
            } else {
                timecents_to_seconds(timecents as f64)
            }
        };

        let hold = self.sum(GeneratorType::HoldVolEnv)
            + key_offset * self.sum(GeneratorType::KeyNumToVolEnvHold);
        let decay = self.sum(GeneratorType::DecayVolEnv)
            + key_offset * self.sum(GeneratorType::KeyNumToVolEnvDecay);
        let release = self.sum(GeneratorType::ReleaseVolEnv);

        let attenuation_db = self.sum(GeneratorType::InitialAttenuation) as f64 / 10.0
            * EMU_ATTENUATION_CORRECTION;
        let sustain_db = self.sum(GeneratorType::SustainVolEnv) as f64 / 10.0;
        let velocity_gain = velocity as f64 / 127.0;

        EnvelopeParameters {
            delay: instant_or_seconds(self.sum(GeneratorType::DelayVolEnv)),
            attack: instant_or_seconds(self.sum(GeneratorType::AttackVolEnv)),
            hold: instant_or_seconds(hold),
            decay: instant_or_seconds(decay),
            release: timecents_to_seconds(release as f64).min(MAX_RELEASE_SECONDS),
            peak_gain: decibel_attenuation_to_gain(attenuation_db) * velocity_gain,
            sustain_gain: decibel_attenuation_to_gain(sustain_db + attenuation_db) * velocity_gain,
        }
    }

    fn sample_window(&self, sample: &Sample) -> (usize, usize, usize, usize, LoopMode) {
        let last = sample.len().saturating_sub(1) as i64;
        let offset = |fine: GeneratorType, coarse: GeneratorType| {
            self.sum(fine) as i64 + 32768 * self.sum(coarse) as i64
        };
        let clamp = |value: i64| value.clamp(0, last) as usize;

        let start = clamp(offset(
            GeneratorType::StartAddrsOffset,
            GeneratorType::StartAddrsCoarseOffset,
        ));
        let end = clamp(
            last + offset(
                GeneratorType::EndAddrsOffset,
                GeneratorType::EndAddrsCoarseOffset,
            ),
        )
        .max(start);
        let mut loop_start = clamp(
            sample.loop_start as i64
                + offset(
                    GeneratorType::StartloopAddrsOffset,
                    GeneratorType::StartloopAddrsCoarseOffset,
                ),
        );
        let mut loop_end = clamp(
            sample.loop_end as i64
                + offset(
                    GeneratorType::EndloopAddrsOffset,
                    GeneratorType::EndloopAddrsCoarseOffset,
                ),
        );
        if loop_end < loop_start {
            std::mem::swap(&mut loop_start, &mut loop_end);
        }

        let mut loop_mode = LoopMode::from_sample_modes(self.sum(GeneratorType::SampleModes));
        if loop_end - loop_start < MIN_LOOP_FRAMES {
            loop_mode = LoopMode::NoLoop;
        }
        (start, end, loop_start, loop_end, loop_mode)
    }
}

/// Linear pan law with the near side held at unity.
///
/// `pan` is in [-1, 1]; returns (left, right).
#[inline]
pub fn pan_gains(pan: f64) -> (f32, f32) {
    let pan = pan.clamp(-1.0, 1.0);
    ((1.0 - pan).min(1.0) as f32, (1.0 + pan).min(1.0) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soundbank::Generator;
    use approx::assert_relative_eq;

    fn sample() -> Sample {
        Sample::new("s", vec![0.0; 1000], 44100).with_loop(100, 900)
    }

    fn resolve(instrument: &[Generator], key: u8, velocity: u8) -> VoiceParameters {
        let instrument = GeneratorTable::from_generators(instrument);
        let preset = GeneratorTable::default();
        GeneratorResolver::new(&instrument, &preset).resolve(&sample(), key, velocity, 44100.0)
    }

    #[test]
    fn test_root_key_plays_at_unity() {
        let params = resolve(&[], 60, 127);
        assert_relative_eq!(params.pitch_cents, 0.0);
        assert_relative_eq!(params.base_rate, 1.0);
    }

    #[test]
    fn test_pitch_from_key_and_tuning() {
        let params = resolve(
            &[
                Generator::new(GeneratorType::CoarseTune, 1),
                Generator::new(GeneratorType::FineTune, 50),
            ],
            72,
            100,
        );
        assert_relative_eq!(params.pitch_cents, 1200.0 + 150.0);
    }

    #[test]
    fn test_scale_tuning_zero_ignores_key() {
        let params = resolve(&[Generator::new(GeneratorType::ScaleTuning, 0)], 90, 100);
        assert_relative_eq!(params.pitch_cents, 0.0);
    }

    #[test]
    fn test_negative_scale_tuning_clamps_to_zero() {
        let params = resolve(&[Generator::new(GeneratorType::ScaleTuning, -50)], 90, 100);
        assert_relative_eq!(params.scale_tuning, 0.0);
        assert_relative_eq!(params.pitch_cents, 0.0);

        let params = resolve(&[Generator::new(GeneratorType::ScaleTuning, 50)], 72, 100);
        assert_relative_eq!(params.pitch_cents, 600.0);
    }

    #[test]
    fn test_overrides() {
        let params = resolve(
            &[
                Generator::new(GeneratorType::KeyNum, 48),
                Generator::new(GeneratorType::Velocity, 20),
                Generator::new(GeneratorType::OverridingRootKey, 36),
            ],
            60,
            100,
        );
        assert_eq!(params.key, 48);
        assert_eq!(params.velocity, 20);
        assert_eq!(params.root_key, 36);
        assert_relative_eq!(params.pitch_cents, 1200.0);
    }

    #[test]
    fn test_envelope_defaults_are_instant() {
        let env = resolve(&[], 60, 127).envelope;
        assert_eq!(env.delay, 0.0);
        assert_eq!(env.attack, 0.0);
        assert_eq!(env.hold, 0.0);
        assert_eq!(env.decay, 0.0);
        assert_relative_eq!(env.peak_gain, 1.0);
        assert_relative_eq!(env.sustain_gain, 1.0);
    }

    #[test]
    fn test_release_is_clamped() {
        let short = resolve(&[], 60, 127).envelope.release;
        assert_relative_eq!(short, timecents_to_seconds(-7200.0));
        let long = resolve(&[Generator::new(GeneratorType::ReleaseVolEnv, 8000)], 60, 127)
            .envelope
            .release;
        assert_relative_eq!(long, MAX_RELEASE_SECONDS);
    }

    #[test]
    fn test_attenuation_and_velocity() {
        // 200 cB nominal is 8 dB after the EMU correction.
        let env = resolve(
            &[
                Generator::new(GeneratorType::InitialAttenuation, 200),
                Generator::new(GeneratorType::SustainVolEnv, 100),
            ],
            60,
            127,
        )
        .envelope;
        assert_relative_eq!(env.peak_gain, decibel_attenuation_to_gain(8.0));
        assert_relative_eq!(env.sustain_gain, decibel_attenuation_to_gain(18.0));

        let half = resolve(&[], 60, 127 / 2 + 1).envelope;
        assert_relative_eq!(half.peak_gain, 64.0 / 127.0);
    }

    #[test]
    fn test_hold_scales_with_key() {
        let params = resolve(
            &[
                Generator::new(GeneratorType::HoldVolEnv, 0),
                Generator::new(GeneratorType::KeyNumToVolEnvHold, 100),
            ],
            72,
            100,
        );
        // 12 keys above 60 at 100 tc per key.
        assert_relative_eq!(params.envelope.hold, timecents_to_seconds(-1200.0));
    }

    #[test]
    fn test_loop_offsets_and_modes() {
        let params = resolve(
            &[
                Generator::new(GeneratorType::SampleModes, 1),
                Generator::new(GeneratorType::StartloopAddrsOffset, 50),
                Generator::new(GeneratorType::EndloopAddrsOffset, -100),
            ],
            60,
            100,
        );
        assert_eq!(params.loop_mode, LoopMode::Continuous);
        assert_eq!(params.loop_start, 150);
        assert_eq!(params.loop_end, 800);
    }

    #[test]
    fn test_reversed_loop_is_swapped() {
        let params = resolve(
            &[
                Generator::new(GeneratorType::SampleModes, 3),
                Generator::new(GeneratorType::StartloopAddrsOffset, 850),
            ],
            60,
            100,
        );
        assert_eq!((params.loop_start, params.loop_end), (900, 950));
        assert_eq!(params.loop_mode, LoopMode::UntilRelease);
    }

    #[test]
    fn test_degenerate_loop_disabled() {
        let params = resolve(
            &[
                Generator::new(GeneratorType::SampleModes, 1),
                Generator::new(GeneratorType::StartloopAddrsOffset, 800),
            ],
            60,
            100,
        );
        assert_eq!(params.loop_mode, LoopMode::NoLoop);
    }

    #[test]
    fn test_pan_law() {
        assert_eq!(pan_gains(0.0), (1.0, 1.0));
        assert_eq!(pan_gains(1.0), (0.0, 1.0));
        assert_eq!(pan_gains(-0.5), (1.0, 0.5));
    }
}
