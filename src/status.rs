//! Lock-free playback status published by the audio thread.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use atomic_float::AtomicF64;

use fontsynth_sequencer::PlaybackState;

const NO_SONG: usize = usize::MAX;

/// Written once per buffer by [`Engine::render`](crate::Engine::render),
/// read from any thread through [`EngineHandle`](crate::EngineHandle).
#[derive(Debug)]
pub struct EngineStatus {
    synth_time: AtomicF64,
    song_time: AtomicF64,
    song_duration: AtomicF64,
    state: AtomicU8,
    voice_count: AtomicUsize,
    song_index: AtomicUsize,
}

impl EngineStatus {
    pub(crate) fn new() -> Self {
        Self {
            synth_time: AtomicF64::new(0.0),
            song_time: AtomicF64::new(0.0),
            song_duration: AtomicF64::new(0.0),
            state: AtomicU8::new(encode_state(PlaybackState::Stopped)),
            voice_count: AtomicUsize::new(0),
            song_index: AtomicUsize::new(NO_SONG),
        }
    }

    /// Seconds of audio rendered.
    #[inline]
    pub fn synth_time(&self) -> f64 {
        self.synth_time.load(Ordering::Acquire)
    }

    /// Position in the current song, in seconds.
    #[inline]
    pub fn song_time(&self) -> f64 {
        self.song_time.load(Ordering::Acquire)
    }

    #[inline]
    pub fn song_duration(&self) -> f64 {
        self.song_duration.load(Ordering::Acquire)
    }

    pub fn state(&self) -> PlaybackState {
        match self.state.load(Ordering::Acquire) {
            1 => PlaybackState::Playing,
            2 => PlaybackState::Paused,
            _ => PlaybackState::Stopped,
        }
    }

    #[inline]
    pub fn voice_count(&self) -> usize {
        self.voice_count.load(Ordering::Relaxed)
    }

    pub fn song_index(&self) -> Option<usize> {
        match self.song_index.load(Ordering::Relaxed) {
            NO_SONG => None,
            index => Some(index),
        }
    }

    pub(crate) fn publish(&self, update: StatusUpdate) {
        self.synth_time.store(update.synth_time, Ordering::Release);
        self.song_time.store(update.song_time, Ordering::Release);
        self.song_duration.store(update.song_duration, Ordering::Release);
        self.state.store(encode_state(update.state), Ordering::Release);
        self.voice_count.store(update.voice_count, Ordering::Relaxed);
        self.song_index
            .store(update.song_index.unwrap_or(NO_SONG), Ordering::Relaxed);
    }
}

pub(crate) struct StatusUpdate {
    pub synth_time: f64,
    pub song_time: f64,
    pub song_duration: f64,
    pub state: PlaybackState,
    pub voice_count: usize,
    pub song_index: Option<usize>,
}

fn encode_state(state: PlaybackState) -> u8 {
    match state {
        PlaybackState::Stopped => 0,
        PlaybackState::Playing => 1,
        PlaybackState::Paused => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_round_trip() {
        let status = EngineStatus::new();
        assert_eq!(status.state(), PlaybackState::Stopped);
        assert_eq!(status.song_index(), None);

        status.publish(StatusUpdate {
            synth_time: 1.5,
            song_time: 0.75,
            song_duration: 3.0,
            state: PlaybackState::Paused,
            voice_count: 12,
            song_index: Some(2),
        });
        assert_eq!(status.synth_time(), 1.5);
        assert_eq!(status.song_time(), 0.75);
        assert_eq!(status.state(), PlaybackState::Paused);
        assert_eq!(status.voice_count(), 12);
        assert_eq!(status.song_index(), Some(2));
    }
}
