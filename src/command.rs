//! Commands from the control thread to the audio thread.

use std::sync::Arc;

use fontsynth_midi::MidiSequence;
use fontsynth_synth::SynthMessage;

/// Everything [`EngineHandle`](crate::EngineHandle) can ask of the
/// engine. Drained at the start of each buffer, before the sequencer
/// tick.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    Synth(SynthMessage),
    /// System exclusive payload without the leading `0xF0`.
    SystemExclusive(Box<[u8]>),
    LoadSongList {
        songs: Vec<Arc<MidiSequence>>,
        autoplay: bool,
    },
    Play {
        reset_time: bool,
    },
    Pause,
    Stop,
    /// Seek to a position in seconds.
    Seek(f64),
    SeekTicks(u64),
    SetPlaybackRate(f64),
    SetLoop {
        enabled: bool,
        count: Option<u32>,
    },
    NextSong,
    PreviousSong,
    SelectSong {
        index: usize,
        autoplay: bool,
    },
    SetShuffle(bool),
}

impl From<SynthMessage> for EngineCommand {
    fn from(message: SynthMessage) -> Self {
        EngineCommand::Synth(message)
    }
}
