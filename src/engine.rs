//! Engine that owns the synthesizer and the sequencer on the audio thread.

use std::sync::Arc;

use tracing::warn;

use fontsynth_midi::MidiSequence;
use fontsynth_sequencer::{SequencerEngine, SequencerNotification};
use fontsynth_synth::{message_channel, LogConfig, MessageReceiver, SoundBank, SynthProcessor};

use crate::command::EngineCommand;
use crate::config::EngineConfig;
use crate::handle::EngineHandle;
use crate::status::{EngineStatus, StatusUpdate};
use crate::Result;

/// Synthesizer plus sequencer, driven one audio buffer at a time.
///
/// Each [`render`](Self::render) drains queued commands, ticks the
/// sequencer against the synth clock and then mixes the buffer. The
/// engine lives on the audio thread; the control thread talks to it
/// through the [`EngineHandle`] returned alongside it.
///
/// # Example
///
/// ```ignore
/// use fontsynth::prelude::*;
///
/// let (mut engine, mut handle) = Engine::builder()
///     .sample_rate(48000.0)
///     .build(bank)?;
///
/// handle.load_sequence(Arc::new(MidiSequence::load("song.mid")?), true)?;
///
/// // In the audio callback:
/// engine.render(&mut left, &mut right);
/// ```
pub struct Engine {
    synth: SynthProcessor,
    sequencer: SequencerEngine,
    commands: MessageReceiver<EngineCommand>,
    notifications: Option<MessageReceiver<SequencerNotification>>,
    status: Arc<EngineStatus>,
    log: LogConfig,
}

impl Engine {
    pub fn builder() -> crate::EngineBuilder {
        crate::EngineBuilder::default()
    }

    /// Create an engine playing from `bank`.
    pub fn new(config: EngineConfig, bank: SoundBank) -> Result<(Self, EngineHandle)> {
        config.validate()?;
        let synth = SynthProcessor::with_sound_bank(config.synth.clone(), bank)?;
        let (sequencer, notifications) = SequencerEngine::new(config.sequencer.clone())?;
        let (sender, commands) = message_channel(config.command_capacity);
        let status = Arc::new(EngineStatus::new());
        let engine = Self {
            log: config.synth.log,
            synth,
            sequencer,
            commands,
            notifications: Some(notifications),
            status: Arc::clone(&status),
        };
        Ok((engine, EngineHandle::new(sender, status)))
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.synth.sample_rate()
    }

    pub fn synth(&self) -> &SynthProcessor {
        &self.synth
    }

    pub fn synth_mut(&mut self) -> &mut SynthProcessor {
        &mut self.synth
    }

    pub fn sequencer(&self) -> &SequencerEngine {
        &self.sequencer
    }

    /// Current position in the song, in seconds.
    pub fn song_time(&self) -> f64 {
        self.sequencer.current_time(&self.synth)
    }

    /// Receiver for sequencer notifications. Available once.
    pub fn take_notifications(&mut self) -> Option<MessageReceiver<SequencerNotification>> {
        self.notifications.take()
    }

    pub fn load_sequence(&mut self, sequence: Arc<MidiSequence>, autoplay: bool) -> Result<()> {
        self.sequencer
            .load_sequence(&mut self.synth, sequence, autoplay)?;
        Ok(())
    }

    pub fn load_song_list(&mut self, songs: Vec<Arc<MidiSequence>>, autoplay: bool) -> Result<()> {
        self.sequencer
            .load_song_list(&mut self.synth, songs, autoplay)?;
        Ok(())
    }

    /// Render one stereo buffer. `left` and `right` are overwritten.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.process_commands();
        self.sequencer.process_tick(&mut self.synth);
        self.synth.render(left, right);
        self.publish_status();
    }

    /// Apply every queued command.
    pub fn process_commands(&mut self) {
        while let Some(command) = self.commands.try_recv() {
            self.handle_command(command);
        }
    }

    pub fn handle_command(&mut self, command: EngineCommand) {
        let synth = &mut self.synth;
        let sequencer = &mut self.sequencer;
        match command {
            EngineCommand::Synth(message) => synth.handle_message(message),
            EngineCommand::SystemExclusive(data) => synth.system_exclusive(&data, 0),
            EngineCommand::LoadSongList { songs, autoplay } => {
                if let Err(e) = sequencer.load_song_list(synth, songs, autoplay) {
                    if self.log.warnings {
                        warn!("Song list rejected: {}", e);
                    }
                }
            }
            EngineCommand::Play { reset_time } => sequencer.play(synth, reset_time),
            EngineCommand::Pause => sequencer.pause(synth),
            EngineCommand::Stop => sequencer.stop(synth),
            EngineCommand::Seek(seconds) => sequencer.set_current_time(synth, seconds),
            EngineCommand::SeekTicks(ticks) => sequencer.set_time_ticks(synth, ticks),
            EngineCommand::SetPlaybackRate(rate) => sequencer.set_playback_rate(synth, rate),
            EngineCommand::SetLoop { enabled, count } => sequencer.set_loop(enabled, count),
            EngineCommand::NextSong => sequencer.next_song(synth),
            EngineCommand::PreviousSong => sequencer.previous_song(synth),
            EngineCommand::SelectSong { index, autoplay } => {
                sequencer.select_song(synth, index, autoplay)
            }
            EngineCommand::SetShuffle(shuffle) => sequencer.set_shuffle(shuffle),
        }
    }

    fn publish_status(&self) {
        self.status.publish(StatusUpdate {
            synth_time: self.synth.current_time(),
            song_time: self.sequencer.current_time(&self.synth),
            song_duration: self.sequencer.duration(),
            state: self.sequencer.state(),
            voice_count: self.synth.voice_count(),
            song_index: self.sequencer.song_index(),
        });
    }
}
