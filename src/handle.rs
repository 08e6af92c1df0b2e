//! Control-thread side of the engine.

use std::sync::Arc;

use fontsynth_midi::MidiSequence;
use fontsynth_synth::{MessageSender, SynthMessage};

use crate::command::EngineCommand;
use crate::status::EngineStatus;
use crate::{Error, Result};

/// Sends commands to an [`Engine`](crate::Engine) and reads its status.
///
/// The command queue is single-producer, so there is exactly one handle
/// per engine. Status reads are lock-free and may run on any thread via
/// [`status`](Self::status).
pub struct EngineHandle {
    commands: MessageSender<EngineCommand>,
    status: Arc<EngineStatus>,
}

impl EngineHandle {
    pub(crate) fn new(commands: MessageSender<EngineCommand>, status: Arc<EngineStatus>) -> Self {
        Self { commands, status }
    }

    /// Queue a command for the next buffer.
    pub fn send(&mut self, command: impl Into<EngineCommand>) -> Result<()> {
        if self.commands.send(command.into()) {
            Ok(())
        } else {
            Err(Error::QueueFull)
        }
    }

    /// Shared status, for readers on other threads.
    pub fn status(&self) -> Arc<EngineStatus> {
        Arc::clone(&self.status)
    }

    // =========================================================================
    // Synth
    // =========================================================================

    pub fn note_on(&mut self, channel: usize, key: u8, velocity: u8) -> Result<()> {
        self.send(SynthMessage::NoteOn {
            channel,
            key,
            velocity,
        })
    }

    pub fn note_off(&mut self, channel: usize, key: u8) -> Result<()> {
        self.send(SynthMessage::NoteOff { channel, key })
    }

    pub fn controller_change(&mut self, channel: usize, controller: u8, value: u8) -> Result<()> {
        self.send(SynthMessage::ControlChange {
            channel,
            controller,
            value,
        })
    }

    pub fn program_change(&mut self, channel: usize, program: u8) -> Result<()> {
        self.send(SynthMessage::ProgramChange { channel, program })
    }

    pub fn system_exclusive(&mut self, data: &[u8]) -> Result<()> {
        self.send(EngineCommand::SystemExclusive(data.into()))
    }

    // =========================================================================
    // Sequencer
    // =========================================================================

    pub fn load_sequence(&mut self, sequence: Arc<MidiSequence>, autoplay: bool) -> Result<()> {
        self.load_song_list(vec![sequence], autoplay)
    }

    /// Queue a song list. Lists the sequencer rejects are logged on the
    /// audio thread; use [`Engine::load_song_list`](crate::Engine::load_song_list)
    /// before starting audio to get the error back.
    pub fn load_song_list(&mut self, songs: Vec<Arc<MidiSequence>>, autoplay: bool) -> Result<()> {
        self.send(EngineCommand::LoadSongList { songs, autoplay })
    }

    pub fn play(&mut self) -> Result<()> {
        self.send(EngineCommand::Play { reset_time: false })
    }

    pub fn restart(&mut self) -> Result<()> {
        self.send(EngineCommand::Play { reset_time: true })
    }

    pub fn pause(&mut self) -> Result<()> {
        self.send(EngineCommand::Pause)
    }

    pub fn stop(&mut self) -> Result<()> {
        self.send(EngineCommand::Stop)
    }

    pub fn seek(&mut self, seconds: f64) -> Result<()> {
        self.send(EngineCommand::Seek(seconds))
    }

    pub fn seek_ticks(&mut self, ticks: u64) -> Result<()> {
        self.send(EngineCommand::SeekTicks(ticks))
    }

    pub fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        self.send(EngineCommand::SetPlaybackRate(rate))
    }

    /// `count` of `None` loops forever.
    pub fn set_loop(&mut self, enabled: bool, count: Option<u32>) -> Result<()> {
        self.send(EngineCommand::SetLoop { enabled, count })
    }

    pub fn next_song(&mut self) -> Result<()> {
        self.send(EngineCommand::NextSong)
    }

    pub fn previous_song(&mut self) -> Result<()> {
        self.send(EngineCommand::PreviousSong)
    }

    pub fn select_song(&mut self, index: usize, autoplay: bool) -> Result<()> {
        self.send(EngineCommand::SelectSong { index, autoplay })
    }

    pub fn set_shuffle(&mut self, shuffle: bool) -> Result<()> {
        self.send(EngineCommand::SetShuffle(shuffle))
    }
}
