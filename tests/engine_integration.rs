//! End-to-end tests: sequences played through the engine into audio buffers.

use std::sync::Arc;

use fontsynth::midi::{controller, MetaEvent, MidiEvent};
use fontsynth::prelude::*;
use fontsynth::synth::{GeneratorType, Instrument, InstrumentZone, Preset, PresetZone, Sample};
use fontsynth::Error;

const SAMPLE_RATE: f64 = 44100.0;
const BLOCK: usize = 128;

fn bank() -> SoundBank {
    let sample = Arc::new(Sample::new("tone", vec![0.25; 16384], 44100).with_loop(64, 16000));
    let zone = InstrumentZone::new(sample)
        .with_generator(GeneratorType::SampleModes, 1)
        .with_generator(GeneratorType::ReleaseVolEnv, -7200);
    let instrument = Arc::new(Instrument::new("tone", vec![zone]));
    SoundBank::new(
        "engine",
        vec![
            Preset::new("Piano", 0, 0, vec![PresetZone::new(Arc::clone(&instrument))]),
            Preset::new("Organ", 0, 16, vec![PresetZone::new(Arc::clone(&instrument))]),
            Preset::new("Standard", 128, 0, vec![PresetZone::new(instrument)]),
        ],
    )
    .unwrap()
}

fn engine() -> (Engine, EngineHandle) {
    Engine::builder()
        .sample_rate(SAMPLE_RATE)
        .log(LogConfig::silent())
        .shuffle_seed(11)
        .build(bank())
        .unwrap()
}

/// Render whole blocks covering at least `seconds`; true if any sample was
/// non-zero.
fn render(engine: &mut Engine, seconds: f64) -> bool {
    let mut left = [0.0f32; BLOCK];
    let mut right = [0.0f32; BLOCK];
    let blocks = (seconds * SAMPLE_RATE / BLOCK as f64).ceil() as usize;
    let mut audible = false;
    for _ in 0..blocks {
        engine.render(&mut left, &mut right);
        audible |= left.iter().chain(&right).any(|&s| s != 0.0);
    }
    audible
}

/// One quarter note on middle C at 120 BPM, TPQ 480.
fn half_second_song() -> Arc<MidiSequence> {
    Arc::new(
        MidiSequence::new(
            "quarter",
            480,
            vec![vec![
                TrackEvent::note_on(0, 0, 60, 100),
                TrackEvent::note_off(480, 0, 60),
            ]],
        )
        .unwrap(),
    )
}

#[test]
fn test_quarter_note_plays_for_half_a_second() {
    let (mut engine, _handle) = engine();
    let song = half_second_song();
    assert_eq!(song.ticks_to_seconds(480), 0.5);
    engine.load_sequence(song, true).unwrap();

    assert!(render(&mut engine, 0.25));
    assert_eq!(engine.synth().voice_count(), 1);
    let voice = &engine.synth().voices()[0];
    assert_eq!(voice.real_key, 60);
    assert!(!voice.is_releasing());

    render(&mut engine, 0.35);
    assert_eq!(engine.synth().voice_count(), 0);
    assert_eq!(engine.sequencer().state(), PlaybackState::Paused);
}

#[test]
fn test_handle_commands_reach_the_synth() {
    let (mut engine, mut handle) = engine();
    handle.note_on(0, 64, 90).unwrap();
    handle.note_on(9, 36, 90).unwrap();
    assert!(render(&mut engine, 0.01));

    let status = handle.status();
    assert_eq!(status.voice_count(), 2);
    assert!(status.synth_time() > 0.0);

    handle.controller_change(0, controller::ALL_SOUND_OFF, 0).unwrap();
    render(&mut engine, 0.01);
    assert_eq!(status.voice_count(), 1);
}

#[test]
fn test_program_change_from_sequence() {
    let (mut engine, _handle) = engine();
    let song = Arc::new(
        MidiSequence::new(
            "organ",
            480,
            vec![vec![
                TrackEvent::program_change(0, 0, 16),
                TrackEvent::note_on(0, 0, 60, 100),
                TrackEvent::note_off(960, 0, 60),
            ]],
        )
        .unwrap(),
    );
    engine.load_sequence(song, true).unwrap();
    render(&mut engine, 0.1);
    assert_eq!(engine.synth().channel(0).unwrap().preset().unwrap().name, "Organ");
}

#[test]
fn test_status_follows_transport() {
    let (mut engine, mut handle) = engine();
    let status = handle.status();
    assert_eq!(status.song_index(), None);

    handle.load_sequence(half_second_song(), true).unwrap();
    render(&mut engine, 0.2);
    assert_eq!(status.state(), PlaybackState::Playing);
    assert_eq!(status.song_index(), Some(0));
    assert!(status.song_time() > 0.15 && status.song_time() < 0.25);
    assert_eq!(status.song_duration(), 0.5);

    handle.pause().unwrap();
    render(&mut engine, 0.1);
    assert_eq!(status.state(), PlaybackState::Paused);
    let paused_at = status.song_time();
    render(&mut engine, 0.1);
    assert_eq!(status.song_time(), paused_at);

    handle.play().unwrap();
    render(&mut engine, 0.05);
    assert_eq!(status.state(), PlaybackState::Playing);
    assert!(status.song_time() > paused_at);
}

#[test]
fn test_seek_restores_controllers_without_notes() {
    let (mut engine, mut handle) = engine();
    let song = Arc::new(
        MidiSequence::new(
            "seek",
            480,
            vec![vec![
                TrackEvent::control_change(0, 0, controller::MAIN_VOLUME, 40),
                TrackEvent::note_on(0, 0, 60, 100),
                TrackEvent::note_off(480, 0, 60),
                TrackEvent::control_change(960, 0, controller::PAN, 10),
                TrackEvent::note_on(1920, 0, 67, 100),
                TrackEvent::note_off(2400, 0, 67),
            ]],
        )
        .unwrap(),
    );
    engine.load_sequence(song, false).unwrap();
    handle.seek(1.5).unwrap();
    render(&mut engine, 0.01);

    let channel = engine.synth().channel(0).unwrap();
    assert_eq!(channel.controller(controller::MAIN_VOLUME), 40);
    assert_eq!(channel.controller(controller::PAN), 10);
    assert_eq!(engine.synth().voice_count(), 0);

    render(&mut engine, 0.6);
    assert!(engine.synth().voices().iter().any(|v| v.real_key == 67));
}

#[test]
fn test_second_port_plays_on_second_block() {
    let (mut engine, _handle) = engine();
    let port = |p: u8| TrackEvent::new(0, MidiEvent::Meta(MetaEvent::MidiPort(p)));
    let song = Arc::new(
        MidiSequence::new(
            "two ports",
            480,
            vec![
                vec![port(0), TrackEvent::note_on(0, 0, 60, 100), TrackEvent::note_off(960, 0, 60)],
                vec![port(1), TrackEvent::note_on(0, 9, 36, 100), TrackEvent::note_off(960, 9, 36)],
            ],
        )
        .unwrap(),
    );
    engine.load_sequence(song, true).unwrap();
    assert_eq!(engine.synth().channel_count(), 32);

    render(&mut engine, 0.05);
    assert_eq!(engine.synth().channel_voice_count(0), 1);
    assert_eq!(engine.synth().channel_voice_count(25), 1);
}

#[test]
fn test_song_list_and_notifications() {
    let (mut engine, mut handle) = engine();
    let mut notifications = engine.take_notifications().unwrap();
    assert!(engine.take_notifications().is_none());

    handle
        .load_song_list(vec![half_second_song(), half_second_song()], true)
        .unwrap();
    render(&mut engine, 0.7);
    assert_eq!(handle.status().song_index(), Some(1));

    let events = notifications.drain_all();
    assert!(events.contains(&SequencerNotification::SongChange {
        index: 1,
        autoplay: true
    }));
    assert!(events.contains(&SequencerNotification::Pause { finished: true }));
}

#[test]
fn test_verbose_logging_during_playback() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let (mut engine, mut handle) = Engine::builder()
        .log(LogConfig::verbose())
        .build(bank())
        .unwrap();
    engine.load_sequence(half_second_song(), true).unwrap();
    handle.set_playback_rate(-1.0).unwrap();
    handle.seek(0.25).unwrap();
    render(&mut engine, 0.1);
    assert_eq!(engine.sequencer().playback_rate(), 1.0);
    assert!(engine.song_time() > 0.3);
}

#[test]
fn test_rejected_song_list_is_an_error() {
    let (mut engine, _handle) = engine();
    assert!(matches!(
        engine.load_song_list(vec![], true),
        Err(Error::Sequencer(fontsynth::sequencer::Error::EmptySongList))
    ));
}

#[test]
fn test_full_queue_reports_error() {
    let (_engine, mut handle) = Engine::builder()
        .command_capacity(2)
        .log(LogConfig::silent())
        .build(bank())
        .unwrap();
    handle.stop().unwrap();
    handle.stop().unwrap();
    assert!(matches!(handle.stop(), Err(Error::QueueFull)));
}

#[test]
fn test_invalid_config_is_rejected() {
    let result = Engine::builder().command_capacity(0).build(bank());
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}
