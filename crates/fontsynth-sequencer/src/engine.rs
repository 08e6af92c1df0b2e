//! Tick-driven sequencer state machine.

use std::sync::Arc;

use tracing::{info, warn};

use fontsynth_midi::{
    controller, seconds_per_tick, MetaEvent, MidiEvent, MidiSequence, DEFAULT_BPM,
    CHANNELS_PER_PORT,
};
use fontsynth_synth::{message_channel, LogConfig, MessageReceiver, MessageSender};

use crate::config::SequencerConfig;
use crate::notification::{SequencerNotification, TextKind};
use crate::seek::SeekState;
use crate::sink::SequencerSink;
use crate::song_list::SongList;
use crate::{Error, Result};

/// Songs at or under this length never loop.
const MIN_LOOP_DURATION: f64 = 1.0;

/// Notes tracked for re-striking on resume. Further notes still sound but
/// are not re-struck.
pub const MAX_PLAYING_NOTES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// A note sounding at the current position, re-struck on resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayingNote {
    pub channel: usize,
    pub key: u8,
    pub velocity: u8,
}

#[derive(Debug, Clone, Copy)]
enum SeekTarget {
    Seconds(f64),
    Ticks(u64),
}

/// Walks the tracks of the current song in tick order and feeds a
/// [`SequencerSink`].
///
/// Call [`process_tick`](Self::process_tick) once per audio buffer before
/// rendering. Every event whose time has passed on the sink's clock is
/// dispatched, so timing resolution is one buffer.
pub struct SequencerEngine {
    config: SequencerConfig,
    log: LogConfig,
    songs: SongList,
    sequence: Option<Arc<MidiSequence>>,
    /// Next event per track.
    cursors: Vec<usize>,
    /// First channel of each track's MIDI port.
    track_offsets: Vec<usize>,
    active: bool,
    /// Song time reached by dispatch, in seconds.
    played_time: f64,
    seconds_per_tick: f64,
    /// Sink time at which the song would have started at the current rate.
    absolute_start_time: f64,
    paused_time: Option<f64>,
    playback_rate: f64,
    loop_enabled: bool,
    loop_count: Option<u32>,
    first_note_time: f64,
    playing_notes: Vec<PlayingNote>,
    seek: SeekState,
    notifications: MessageSender<SequencerNotification>,
}

impl SequencerEngine {
    /// Create an idle sequencer and the receiving end of its notification
    /// queue.
    pub fn new(config: SequencerConfig) -> Result<(Self, MessageReceiver<SequencerNotification>)> {
        config.validate()?;
        let (notifications, receiver) = message_channel(config.notification_capacity);
        let engine = Self {
            log: config.log,
            songs: SongList::new(config.shuffle_seed),
            sequence: None,
            cursors: Vec::new(),
            track_offsets: Vec::new(),
            active: false,
            played_time: 0.0,
            seconds_per_tick: seconds_per_tick(DEFAULT_BPM, 480),
            absolute_start_time: 0.0,
            paused_time: None,
            playback_rate: 1.0,
            loop_enabled: config.loop_enabled,
            loop_count: config.loop_count,
            first_note_time: 0.0,
            playing_notes: Vec::with_capacity(MAX_PLAYING_NOTES),
            seek: SeekState::default(),
            notifications,
            config,
        };
        Ok((engine, receiver))
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Load a single sequence.
    pub fn load_sequence<S: SequencerSink>(
        &mut self,
        sink: &mut S,
        sequence: Arc<MidiSequence>,
        autoplay: bool,
    ) -> Result<()> {
        self.load_song_list(sink, vec![sequence], autoplay)
    }

    /// Replace the song list and load its first song.
    ///
    /// Lists with more than one song disable looping so that playback
    /// moves on to the next song.
    pub fn load_song_list<S: SequencerSink>(
        &mut self,
        sink: &mut S,
        songs: Vec<Arc<MidiSequence>>,
        autoplay: bool,
    ) -> Result<()> {
        if songs.is_empty() {
            return Err(Error::EmptySongList);
        }
        if let Some(empty) = songs.iter().find(|song| song.duration() <= 0.0) {
            return Err(Error::ZeroDuration(empty.name().to_string()));
        }
        if songs.len() > 1 {
            self.loop_enabled = false;
        }
        self.songs.replace(songs);
        if self.log.state {
            info!("Loaded {} song(s)", self.songs.len());
        }
        self.load_current_song(sink, autoplay);
        Ok(())
    }

    pub fn next_song<S: SequencerSink>(&mut self, sink: &mut S) {
        if self.songs.len() == 1 {
            self.set_current_time(sink, 0.0);
            return;
        }
        self.songs.advance();
        self.load_current_song(sink, true);
    }

    pub fn previous_song<S: SequencerSink>(&mut self, sink: &mut S) {
        if self.songs.len() == 1 {
            self.set_current_time(sink, 0.0);
            return;
        }
        self.songs.retreat();
        self.load_current_song(sink, true);
    }

    /// Load the song at `index` in the list as loaded.
    pub fn select_song<S: SequencerSink>(&mut self, sink: &mut S, index: usize, autoplay: bool) {
        if self.songs.select(index) {
            self.load_current_song(sink, autoplay);
        } else if self.log.warnings {
            warn!("No song at index {} ({} songs)", index, self.songs.len());
        }
    }

    pub fn set_shuffle(&mut self, shuffle: bool) {
        self.songs.set_shuffle(shuffle);
    }

    pub fn is_shuffled(&self) -> bool {
        self.songs.is_shuffled()
    }

    pub fn songs(&self) -> &[Arc<MidiSequence>] {
        self.songs.songs()
    }

    /// Index of the current song in the list as loaded.
    pub fn song_index(&self) -> Option<usize> {
        self.songs.current_index()
    }

    fn load_current_song<S: SequencerSink>(&mut self, sink: &mut S, autoplay: bool) {
        let (Some(sequence), Some(index)) = (self.songs.current().cloned(), self.songs.current_index())
        else {
            return;
        };
        self.stop(sink);
        self.seconds_per_tick = seconds_per_tick(DEFAULT_BPM, sequence.time_division());
        self.assign_ports(sink, &sequence);
        self.cursors.clear();
        self.cursors.resize(sequence.tracks().len(), 0);
        self.played_time = 0.0;
        self.paused_time = None;
        self.playing_notes.clear();
        self.first_note_time = sequence.ticks_to_seconds(sequence.first_note_on());
        let duration = sequence.duration();
        if self.log.state {
            info!(
                "Loading '{}' ({:.1}s, {} tracks)",
                sequence.name(),
                duration,
                sequence.tracks().len()
            );
        }
        let start_ticks = self.start_ticks(&sequence);
        self.sequence = Some(sequence);
        self.notify(SequencerNotification::SongChange { index, autoplay });

        if duration <= MIN_LOOP_DURATION && self.loop_enabled {
            if self.log.warnings {
                warn!("Very short song ({:.2}s), disabling loop", duration);
            }
            self.loop_enabled = false;
        }
        if autoplay {
            self.play(sink, true);
        } else {
            self.set_time_ticks(sink, start_ticks);
            self.pause(sink);
        }
    }

    /// Give each MIDI port its own block of 16 channels. Tracks without
    /// channel events keep offset 0.
    fn assign_ports<S: SequencerSink>(&mut self, sink: &mut S, sequence: &MidiSequence) {
        let mut ports: Vec<(u8, usize)> = Vec::new();
        self.track_offsets.clear();
        for (track, &port) in sequence.track_ports().iter().enumerate() {
            if !sequence.track_has_channels(track) {
                self.track_offsets.push(0);
                continue;
            }
            let offset = match ports.iter().find(|(p, _)| *p == port) {
                Some(&(_, offset)) => offset,
                None => {
                    let offset = ports.len() * CHANNELS_PER_PORT;
                    ports.push((port, offset));
                    if sink.channel_count() < offset + CHANNELS_PER_PORT {
                        sink.ensure_channels(offset + CHANNELS_PER_PORT);
                    }
                    offset
                }
            };
            self.track_offsets.push(offset);
        }
        if ports.len() > 1 && self.log.info {
            info!("Multi-port sequence: {} ports", ports.len());
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    pub fn sequence(&self) -> Option<&Arc<MidiSequence>> {
        self.sequence.as_ref()
    }

    pub fn state(&self) -> PlaybackState {
        if self.paused_time.is_some() {
            PlaybackState::Paused
        } else if self.active {
            PlaybackState::Playing
        } else {
            PlaybackState::Stopped
        }
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused_time.is_some()
    }

    /// Song length in seconds, 0 with nothing loaded.
    pub fn duration(&self) -> f64 {
        self.sequence.as_ref().map_or(0.0, |s| s.duration())
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    pub fn loop_count(&self) -> Option<u32> {
        self.loop_count
    }

    pub fn playing_notes(&self) -> &[PlayingNote] {
        &self.playing_notes
    }

    /// Position in the song, in seconds.
    pub fn current_time<S: SequencerSink>(&self, sink: &S) -> f64 {
        match self.paused_time {
            Some(time) => time,
            None => (sink.current_time() - self.absolute_start_time) * self.playback_rate,
        }
    }

    pub fn set_loop(&mut self, enabled: bool, count: Option<u32>) {
        self.loop_enabled = enabled;
        self.loop_count = count;
    }

    /// Change speed without moving the song position.
    pub fn set_playback_rate<S: SequencerSink>(&mut self, sink: &mut S, rate: f64) {
        if !(rate.is_finite() && rate > 0.0) {
            if self.log.warnings {
                warn!("Ignoring playback rate {}", rate);
            }
            return;
        }
        let time = self.current_time(sink);
        self.playback_rate = rate;
        self.recalculate_start_time(sink, time);
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// Start or resume playback. `reset_time` restarts the song.
    pub fn play<S: SequencerSink>(&mut self, sink: &mut S, reset_time: bool) {
        if self.sequence.is_none() {
            return;
        }
        if reset_time || self.current_time(sink) >= self.duration() {
            self.paused_time = None;
            self.set_current_time(sink, 0.0);
            return;
        }
        if let Some(paused) = self.paused_time.take() {
            self.recalculate_start_time(sink, paused);
        }
        for note in &self.playing_notes {
            sink.note_on(note.channel, note.key, note.velocity);
        }
        self.active = true;
    }

    pub fn pause<S: SequencerSink>(&mut self, sink: &mut S) {
        self.pause_with(sink, false);
    }

    fn pause_with<S: SequencerSink>(&mut self, sink: &mut S, finished: bool) {
        if self.is_paused() {
            if self.log.warnings {
                warn!("Already paused");
            }
            return;
        }
        self.paused_time = Some(self.current_time(sink));
        self.stop(sink);
        self.notify(SequencerNotification::Pause { finished });
    }

    /// Stop dispatching and release every sounding note.
    pub fn stop<S: SequencerSink>(&mut self, sink: &mut S) {
        self.active = false;
        for channel in 0..sink.channel_count() {
            sink.controller_change(channel, controller::SUSTAIN_PEDAL, 0);
        }
        sink.stop_all(false);
    }

    /// Seek to `seconds` into the song.
    pub fn set_current_time<S: SequencerSink>(&mut self, sink: &mut S, seconds: f64) {
        let Some(sequence) = self.sequence.clone() else {
            return;
        };
        if seconds > sequence.duration() || seconds < 0.0 {
            let ticks = self.start_ticks(&sequence);
            self.set_time_ticks(sink, ticks);
            return;
        }
        if self.config.skip_to_first_note_on && seconds < self.first_note_time {
            self.set_time_ticks(sink, sequence.first_note_on().saturating_sub(1));
            return;
        }
        self.stop(sink);
        self.playing_notes.clear();
        let was_paused = self.is_paused() && self.config.preserve_playback_state;
        self.paused_time = None;
        self.notify(SequencerNotification::TimeChange { seconds });
        self.play_to(sink, &sequence, SeekTarget::Seconds(seconds));
        self.recalculate_start_time(sink, seconds);
        if was_paused {
            self.pause(sink);
        } else {
            self.play(sink, false);
        }
    }

    /// Seek to a tick position and resume unless the song is over.
    pub fn set_time_ticks<S: SequencerSink>(&mut self, sink: &mut S, ticks: u64) {
        let Some(sequence) = self.sequence.clone() else {
            return;
        };
        self.stop(sink);
        self.playing_notes.clear();
        self.paused_time = None;
        self.notify(SequencerNotification::TimeChange {
            seconds: sequence.ticks_to_seconds(ticks),
        });
        let playing = self.play_to(sink, &sequence, SeekTarget::Ticks(ticks));
        self.recalculate_start_time(sink, self.played_time);
        if playing {
            self.play(sink, false);
        }
    }

    fn start_ticks(&self, sequence: &MidiSequence) -> u64 {
        if self.config.skip_to_first_note_on {
            sequence.first_note_on().saturating_sub(1)
        } else {
            0
        }
    }

    fn recalculate_start_time<S: SequencerSink>(&mut self, sink: &S, time: f64) {
        self.absolute_start_time = sink.current_time() - time / self.playback_rate;
    }

    fn can_loop(&self) -> bool {
        self.loop_enabled && self.loop_count.map_or(true, |count| count > 0)
    }

    /// Take one loop repetition and jump to the loop start.
    fn take_loop<S: SequencerSink>(&mut self, sink: &mut S, sequence: &MidiSequence) {
        if let Some(count) = self.loop_count.as_mut() {
            *count = count.saturating_sub(1);
            let remaining = *count;
            self.notify(SequencerNotification::LoopCountChange { remaining });
        }
        if self.log.info {
            info!("Looping to tick {}", sequence.loop_region().start);
        }
        self.set_time_ticks(sink, sequence.loop_region().start);
    }

    fn finish<S: SequencerSink>(&mut self, sink: &mut S) {
        self.pause_with(sink, true);
        if self.songs.len() > 1 {
            self.next_song(sink);
        }
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Dispatch every event up to the sink's current time.
    pub fn process_tick<S: SequencerSink>(&mut self, sink: &mut S) {
        if !self.active {
            return;
        }
        let Some(sequence) = self.sequence.clone() else {
            return;
        };
        let current = self.current_time(sink);
        while self.played_time < current {
            let Some(track) = self.next_track(&sequence) else {
                self.finish(sink);
                return;
            };
            let index = self.cursors[track];
            let event_ticks = sequence.tracks()[track][index].ticks;
            self.dispatch(sink, &sequence, track, index);
            self.cursors[track] += 1;

            let Some(next_track) = self.next_track(&sequence) else {
                // Every track is exhausted.
                if self.can_loop() {
                    self.take_loop(sink, &sequence);
                } else {
                    self.finish(sink);
                }
                return;
            };
            let next_ticks = sequence.tracks()[next_track][self.cursors[next_track]].ticks;
            self.played_time += self.seconds_per_tick * (next_ticks - event_ticks) as f64;

            let can_loop = self.can_loop();
            if can_loop && sequence.loop_region().end <= event_ticks {
                self.take_loop(sink, &sequence);
                return;
            }
            if current >= sequence.duration() {
                if can_loop {
                    self.take_loop(sink, &sequence);
                } else {
                    self.finish(sink);
                }
                return;
            }
        }
    }

    /// Track holding the earliest pending event; the lowest index wins ties.
    fn next_track(&self, sequence: &MidiSequence) -> Option<usize> {
        let mut best: Option<(usize, u64)> = None;
        for (track, events) in sequence.tracks().iter().enumerate() {
            let Some(event) = self.cursors.get(track).and_then(|&i| events.get(i)) else {
                continue;
            };
            if best.map_or(true, |(_, ticks)| event.ticks < ticks) {
                best = Some((track, event.ticks));
            }
        }
        best.map(|(track, _)| track)
    }

    fn dispatch<S: SequencerSink>(
        &mut self,
        sink: &mut S,
        sequence: &MidiSequence,
        track: usize,
        index: usize,
    ) {
        let event = &sequence.tracks()[track][index];
        let offset = self.track_offsets.get(track).copied().unwrap_or(0);
        let channel = |ch: u8| ch as usize + offset;
        match &event.event {
            MidiEvent::NoteOn {
                channel: ch,
                key,
                velocity,
            } if *velocity > 0 => {
                sink.note_on(channel(*ch), *key, *velocity);
                if self.playing_notes.len() < MAX_PLAYING_NOTES {
                    self.playing_notes.push(PlayingNote {
                        channel: channel(*ch),
                        key: *key,
                        velocity: *velocity,
                    });
                } else if self.log.warnings {
                    warn!("Too many held notes, {} on {} not tracked", key, channel(*ch));
                }
            }
            MidiEvent::NoteOn { channel: ch, key, .. } | MidiEvent::NoteOff { channel: ch, key, .. } => {
                sink.note_off(channel(*ch), *key);
                let ch = channel(*ch);
                if let Some(position) = self
                    .playing_notes
                    .iter()
                    .position(|n| n.channel == ch && n.key == *key)
                {
                    self.playing_notes.swap_remove(position);
                }
            }
            MidiEvent::ControlChange {
                channel: ch,
                controller,
                value,
            } => sink.controller_change(channel(*ch), *controller, *value),
            MidiEvent::ProgramChange { channel: ch, program } => {
                sink.program_change(channel(*ch), *program)
            }
            MidiEvent::PitchBend { channel: ch, value } => sink.pitch_wheel(channel(*ch), *value),
            // Aftertouch does not reach the synth.
            MidiEvent::PolyPressure { .. } | MidiEvent::ChannelPressure { .. } => {}
            MidiEvent::SysEx(data) => sink.system_exclusive(data, offset),
            MidiEvent::Meta(meta) => self.dispatch_meta(sequence, meta, track, index, event.ticks),
        }
    }

    fn dispatch_meta(
        &mut self,
        sequence: &MidiSequence,
        meta: &MetaEvent,
        track: usize,
        index: usize,
        ticks: u64,
    ) {
        let kind = match meta {
            MetaEvent::SetTempo { micros_per_quarter } => {
                self.set_tempo(sequence, *micros_per_quarter);
                return;
            }
            MetaEvent::Text(_) => TextKind::Text,
            MetaEvent::Lyric(_) => TextKind::Lyric,
            MetaEvent::Marker(_) => TextKind::Marker,
            MetaEvent::CuePoint(_) => TextKind::CuePoint,
            MetaEvent::TrackName(_) => TextKind::TrackName,
            MetaEvent::Copyright(_) => TextKind::Copyright,
            MetaEvent::InstrumentName(_) => TextKind::InstrumentName,
            _ => return,
        };
        self.notify(SequencerNotification::Text {
            kind,
            track,
            index,
            ticks,
        });
    }

    fn set_tempo(&mut self, sequence: &MidiSequence, micros_per_quarter: u32) {
        let division = sequence.time_division();
        if micros_per_quarter == 0 {
            if self.log.warnings {
                warn!("Invalid tempo, falling back to {} BPM", DEFAULT_BPM);
            }
            self.seconds_per_tick = seconds_per_tick(DEFAULT_BPM, division);
            return;
        }
        let bpm = 60_000_000.0 / micros_per_quarter as f64;
        self.seconds_per_tick = seconds_per_tick(bpm, division);
    }

    /// Replay from tick 0 up to `target` without sounding notes, then send
    /// the collected channel state. Returns false when the song ran out
    /// first.
    fn play_to<S: SequencerSink>(
        &mut self,
        sink: &mut S,
        sequence: &MidiSequence,
        target: SeekTarget,
    ) -> bool {
        self.seconds_per_tick = seconds_per_tick(DEFAULT_BPM, sequence.time_division());
        sink.reset_all_controllers();
        self.played_time = 0.0;
        self.cursors.iter_mut().for_each(|cursor| *cursor = 0);
        self.seek.reset(sink.channel_count());

        loop {
            let Some(track) = self.next_track(sequence) else {
                self.stop(sink);
                return false;
            };
            let index = self.cursors[track];
            let event = &sequence.tracks()[track][index];
            let reached = match target {
                SeekTarget::Ticks(ticks) => event.ticks >= ticks,
                SeekTarget::Seconds(seconds) => self.played_time >= seconds,
            };
            if reached {
                break;
            }

            let offset = self.track_offsets.get(track).copied().unwrap_or(0);
            match &event.event {
                MidiEvent::NoteOn { channel, key, .. } => {
                    self.seek.note_on(*channel as usize + offset, *key)
                }
                MidiEvent::PitchBend { channel, value } => {
                    self.seek.pitch_wheel(*channel as usize + offset, *value)
                }
                MidiEvent::ProgramChange { channel, program } => {
                    self.seek.program_change(*channel as usize + offset, *program)
                }
                MidiEvent::ControlChange {
                    channel,
                    controller,
                    value,
                } => self
                    .seek
                    .controller_change(sink, *channel as usize + offset, *controller, *value),
                MidiEvent::SysEx(data) => sink.system_exclusive(data, offset),
                MidiEvent::Meta(MetaEvent::SetTempo { micros_per_quarter }) => {
                    self.set_tempo(sequence, *micros_per_quarter)
                }
                // Notes off, aftertouch and text are skipped.
                _ => {}
            }

            let event_ticks = event.ticks;
            self.cursors[track] += 1;
            let Some(next_track) = self.next_track(sequence) else {
                self.stop(sink);
                return false;
            };
            let next_ticks = sequence.tracks()[next_track][self.cursors[next_track]].ticks;
            self.played_time += self.seconds_per_tick * (next_ticks - event_ticks) as f64;
        }

        self.seek.apply(sink);
        true
    }

    fn notify(&mut self, notification: SequencerNotification) {
        if !self.notifications.send(notification) && self.log.warnings {
            warn!("Notification queue full, dropping {:?}", notification);
        }
    }
}
