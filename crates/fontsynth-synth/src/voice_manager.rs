//! Voice pool with polyphony cap, exclusive classes and hold pedal.
//!
//! All voices live in one pool allocated at construction. Killing removes a
//! voice from the pool at once; releasing leaves it to the mixer, which
//! retires it when its envelope finishes.

use smallvec::SmallVec;
use tracing::debug;

use crate::config::LogConfig;
use crate::voice::Voice;

/// Drum notes sound at least this long before a note off takes effect.
pub const MIN_NOTE_LENGTH: f64 = 0.03;

#[derive(Debug)]
pub struct VoiceManager {
    voices: Vec<Voice>,
    /// Scratch for eviction: pool indexes in kill order, and kill flags.
    kill_order: Vec<usize>,
    killed: Vec<bool>,
    capacity: usize,
    voice_cap: usize,
    high_performance: bool,
    log: LogConfig,
}

impl VoiceManager {
    pub fn new(voice_cap: usize, capacity: usize, log: LogConfig) -> Self {
        Self {
            voices: Vec::with_capacity(capacity),
            kill_order: Vec::with_capacity(capacity),
            killed: Vec::with_capacity(capacity),
            capacity,
            voice_cap: voice_cap.clamp(1, capacity.max(1)),
            high_performance: false,
            log,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub(crate) fn voices_mut(&mut self) -> &mut Vec<Voice> {
        &mut self.voices
    }

    pub fn channel_voice_count(&self, channel: usize) -> usize {
        self.voices.iter().filter(|v| v.channel == channel).count()
    }

    #[inline]
    pub fn voice_cap(&self) -> usize {
        self.voice_cap
    }

    /// Change the cap, evicting voices if the pool is over it. The cap
    /// cannot exceed the pool capacity.
    pub fn set_voice_cap(&mut self, cap: usize) {
        let cap = cap.clamp(1, self.capacity.max(1));
        if cap != self.voice_cap && self.log.state {
            debug!("Voice cap set to {}", cap);
        }
        self.voice_cap = cap;
        if self.voices.len() > cap {
            self.kill_voices(self.voices.len() - cap);
        }
    }

    #[inline]
    pub fn high_performance(&self) -> bool {
        self.high_performance
    }

    pub fn set_high_performance(&mut self, enabled: bool) {
        self.high_performance = enabled;
    }

    /// Add the voices of one note-on.
    ///
    /// Existing voices on the same channel sharing a non-zero exclusive
    /// class with a new voice are killed unless they were started by the
    /// same preset. If the pool would then exceed the cap, the lowest
    /// priority existing voices go before the new ones are added.
    pub fn start_voices(&mut self, new_voices: impl IntoIterator<Item = Voice>) {
        let mut batch: SmallVec<[Voice; 4]> = new_voices.into_iter().collect();
        for voice in &batch {
            let class = voice.exclusive_class();
            if class != 0 {
                let (channel, preset) = (voice.channel, voice.preset);
                self.voices.retain(|existing| {
                    existing.channel != channel
                        || existing.exclusive_class() != class
                        || existing.preset == preset
                });
            }
        }
        batch.truncate(self.voice_cap);
        let total = self.voices.len() + batch.len();
        if total > self.voice_cap {
            self.kill_voices(total - self.voice_cap);
        }
        self.voices.extend(batch);
    }

    /// Note off for `real_key` on `channel` at synth time `now`.
    pub fn note_off(
        &mut self,
        channel: usize,
        real_key: u8,
        hold_pedal: bool,
        is_drum: bool,
        now: f64,
    ) {
        if self.high_performance && !is_drum {
            self.voices
                .retain(|v| v.channel != channel || v.real_key != real_key);
            return;
        }
        for voice in self.voices.iter_mut().filter(|v| {
            v.channel == channel && v.real_key == real_key && !v.is_releasing() && !v.sustained
        }) {
            if hold_pedal {
                voice.sustained = true;
            } else if is_drum && now - voice.start_time < MIN_NOTE_LENGTH {
                voice.pending_release = Some(voice.start_time + MIN_NOTE_LENGTH);
            } else {
                voice.release();
            }
        }
    }

    /// Release every voice the hold pedal kept alive on `channel`.
    pub fn release_sustained(&mut self, channel: usize) {
        for voice in self
            .voices
            .iter_mut()
            .filter(|v| v.channel == channel && v.sustained)
        {
            voice.release();
        }
    }

    /// Stop `channel` (or every channel). `force` kills, otherwise release.
    pub fn stop_all(&mut self, channel: Option<usize>, force: bool) {
        let on_channel = |v: &Voice| channel.map_or(true, |c| v.channel == c);
        if force {
            self.voices.retain(|v| !on_channel(v));
        } else {
            for voice in self.voices.iter_mut().filter(|v| on_channel(v)) {
                voice.release();
            }
        }
    }

    /// Remove `count` voices, lowest priority first. Ties go to the oldest.
    pub fn kill_voices(&mut self, count: usize) {
        let count = count.min(self.voices.len());
        if count == 0 {
            return;
        }
        let voices = &self.voices;
        self.kill_order.clear();
        self.kill_order.extend(0..voices.len());
        if count < voices.len() {
            self.kill_order.select_nth_unstable_by(count - 1, |&a, &b| {
                let (a, b) = (&voices[a], &voices[b]);
                a.priority()
                    .total_cmp(&b.priority())
                    .then(a.start_time.total_cmp(&b.start_time))
            });
        }
        self.killed.clear();
        self.killed.resize(voices.len(), false);
        for &index in &self.kill_order[..count] {
            self.killed[index] = true;
        }
        let mut killed = self.killed.iter();
        self.voices
            .retain(|_| !killed.next().copied().unwrap_or(false));
        if self.log.info {
            debug!("Voice cap reached, killed {} voices", count);
        }
    }

    /// Release deferred drum notes whose minimum length has elapsed.
    pub fn process_pending_releases(&mut self, now: f64) {
        for voice in self.voices.iter_mut() {
            if voice.pending_release.is_some_and(|at| now >= at) {
                voice.release();
            }
        }
    }
}
