//! Voice lifecycle scenarios through the public synthesizer API.

use std::sync::Arc;

use approx::assert_relative_eq;
use fontsynth_midi::controller;
use fontsynth_synth::{
    message_channel, EnvelopePhase, GeneratorType, Instrument, InstrumentZone, KeyModifier,
    LogConfig, Preset, PresetZone, Sample, SoundBank, SynthConfig, SynthMessage, SynthProcessor,
};

const SAMPLE_RATE: f64 = 44100.0;

fn looped_sample(name: &str) -> Arc<Sample> {
    Arc::new(Sample::new(name, vec![0.3; 16384], 44100).with_loop(64, 16000))
}

/// Piano on 0:0, strings on 0:48, two drum kits (128:0 and 128:8) built
/// from one instrument whose hi-hats share exclusive class 1.
fn bank() -> SoundBank {
    let piano = Arc::new(Instrument::new(
        "Piano",
        vec![InstrumentZone::new(looped_sample("piano"))
            .with_generator(GeneratorType::SampleModes, 1)
            .with_generator(GeneratorType::ReleaseVolEnv, -7200)],
    ));
    let strings = Arc::new(Instrument::new(
        "Strings",
        vec![InstrumentZone::new(looped_sample("strings"))
            .with_generator(GeneratorType::SampleModes, 1)],
    ));
    let kit = Arc::new(Instrument::new(
        "Kit",
        vec![
            InstrumentZone::new(looped_sample("kick")).with_key_range(35, 36),
            InstrumentZone::new(looped_sample("hihat"))
                .with_key_range(42, 46)
                .with_generator(GeneratorType::SampleModes, 1)
                .with_generator(GeneratorType::ExclusiveClass, 1),
        ],
    ));
    SoundBank::new(
        "scenario",
        vec![
            Preset::new("Piano", 0, 0, vec![PresetZone::new(piano)]),
            Preset::new("Strings", 0, 48, vec![PresetZone::new(strings)]),
            Preset::new("Standard", 128, 0, vec![PresetZone::new(Arc::clone(&kit))]),
            Preset::new("Room", 128, 8, vec![PresetZone::new(kit)]),
        ],
    )
    .unwrap()
}

fn synth() -> SynthProcessor {
    let config = SynthConfig {
        sample_rate: SAMPLE_RATE,
        log: LogConfig::silent(),
        ..Default::default()
    };
    SynthProcessor::with_sound_bank(config, bank()).unwrap()
}

fn render(synth: &mut SynthProcessor, frames: usize) -> (Vec<f32>, Vec<f32>) {
    let mut left = vec![0.0; frames];
    let mut right = vec![0.0; frames];
    synth.render(&mut left, &mut right);
    (left, right)
}

// =============================================================================
// Envelope
// =============================================================================

#[test]
fn test_zero_envelope_reaches_sustain_in_one_quantum() {
    let mut synth = synth();
    synth.note_on(0, 60, 127);
    render(&mut synth, 128);
    let voice = &synth.voices()[0];
    assert_eq!(voice.envelope().phase(), EnvelopePhase::Sustain);
}

#[test]
fn test_shortest_release_retires_voice() {
    let mut synth = synth();
    synth.note_on(0, 60, 100);
    render(&mut synth, 64);
    synth.note_off(0, 60);
    assert_eq!(synth.voice_count(), 1);
    // -7200 timecents is 1/64 s, under 700 frames.
    render(&mut synth, 1024);
    assert_eq!(synth.voice_count(), 0);
}

// =============================================================================
// Presets and channels
// =============================================================================

#[test]
fn test_channel_nine_resolves_drum_bank() {
    let synth = synth();
    assert_eq!(synth.channel(0).unwrap().bank(), 0);
    assert_eq!(synth.channel(0).unwrap().preset().unwrap().name, "Piano");
    assert_eq!(synth.channel(9).unwrap().bank(), 128);
    assert_eq!(synth.channel(9).unwrap().preset().unwrap().name, "Standard");
}

#[test]
fn test_missing_program_falls_back() {
    let mut synth = synth();
    synth.program_change(0, 99);
    assert_eq!(synth.channel(0).unwrap().preset().unwrap().name, "Piano");
    synth.program_change(9, 25);
    assert_eq!(synth.channel(9).unwrap().preset().unwrap().name, "Standard");
}

#[test]
fn test_bank_select_then_program() {
    let mut synth = synth();
    synth.controller_change(1, controller::BANK_SELECT, 5);
    synth.program_change(1, 48);
    // Bank 5 does not exist; the melodic fallback keeps the program.
    assert_eq!(synth.channel(1).unwrap().preset().unwrap().name, "Strings");
}

// =============================================================================
// Exclusive class and hold pedal
// =============================================================================

#[test]
fn test_exclusive_class_chokes_other_presets_only() {
    let mut synth = synth();
    synth.note_on(9, 42, 100);
    synth.note_on(9, 46, 100);
    // Same kit: both hi-hats keep sounding.
    assert_eq!(synth.channel_voice_count(9), 2);

    synth.program_change(9, 8);
    assert_eq!(synth.channel(9).unwrap().preset().unwrap().name, "Room");
    synth.note_on(9, 42, 100);
    assert_eq!(synth.channel_voice_count(9), 1);
    assert_eq!(synth.voices()[0].preset, (128, 8));

    // Notes outside the class are untouched.
    synth.note_on(9, 36, 100);
    assert_eq!(synth.channel_voice_count(9), 2);
}

#[test]
fn test_hold_pedal_releases_all_at_once() {
    let mut synth = synth();
    synth.controller_change(2, controller::SUSTAIN_PEDAL, 127);
    for key in [60, 64, 67] {
        synth.note_on(2, key, 100);
        synth.note_off(2, key);
    }
    render(&mut synth, 256);
    assert_eq!(synth.channel_voice_count(2), 3);
    assert!(synth.voices().iter().all(|v| v.sustained && !v.is_releasing()));

    synth.controller_change(2, controller::SUSTAIN_PEDAL, 0);
    assert!(synth.voices().iter().all(|v| v.is_releasing()));
}

#[test]
fn test_all_notes_off_and_all_sound_off() {
    let mut synth = synth();
    synth.note_on(3, 60, 100);
    synth.note_on(4, 60, 100);
    synth.controller_change(3, controller::ALL_NOTES_OFF, 0);
    assert!(synth.voices().iter().any(|v| v.channel == 3 && v.is_releasing()));
    synth.controller_change(4, controller::ALL_SOUND_OFF, 0);
    assert_eq!(synth.channel_voice_count(4), 0);
}

// =============================================================================
// Data entry
// =============================================================================

#[test]
fn test_pitch_bend_range_through_rpn() {
    let mut synth = synth();
    synth.controller_change(0, controller::RPN_MSB, 0);
    synth.controller_change(0, controller::RPN_LSB, 0);
    synth.controller_change(0, controller::DATA_ENTRY_MSB, 12);
    synth.controller_change(0, controller::LSB_DATA_ENTRY, 64);
    assert_relative_eq!(synth.channel(0).unwrap().pitch_bend_range(), 12.5);
}

#[test]
fn test_nrpn_vibrato_depth() {
    let mut synth = synth();
    synth.controller_change(0, controller::NRPN_MSB, 0x01);
    synth.controller_change(0, controller::NRPN_LSB, 0x09);
    synth.controller_change(0, controller::DATA_ENTRY_MSB, 80);
    let vibrato = synth.channel(0).unwrap().vibrato();
    assert_relative_eq!(vibrato.depth_cents, 40.0);
}

// =============================================================================
// Messages
// =============================================================================

#[test]
fn test_queue_drives_processor() {
    let mut synth = synth();
    let (mut tx, mut rx) = message_channel(32);
    assert!(tx.send(SynthMessage::KeyModifier {
        channel: 0,
        key: 60,
        modifier: Some(KeyModifier::default().with_velocity(20)),
    }));
    assert!(tx.send(SynthMessage::NoteOn {
        channel: 0,
        key: 60,
        velocity: 127,
    }));
    synth.process_messages(&mut rx);
    assert_eq!(synth.voices()[0].velocity, 20);
    assert!(!rx.has_pending());
}

#[test]
fn test_render_is_stereo_and_centered() {
    let mut synth = synth();
    synth.note_on(0, 60, 127);
    let (left, right) = render(&mut synth, 256);
    assert!(left.iter().any(|&s| s != 0.0));
    for (l, r) in left.iter().zip(&right) {
        assert_relative_eq!(*l, *r, epsilon = 1e-6);
    }
}
