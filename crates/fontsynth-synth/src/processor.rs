//! The synthesizer: channels, voice pool and mixer behind one API.
//!
//! [`SynthProcessor`] is owned by the render thread. Control threads talk to
//! it through a [`MessageSender`](crate::MessageSender) drained by
//! [`SynthProcessor::process_messages`], and swap sound banks through the
//! shared [`ArcSwap`]. Nothing on the render path allocates: the voice pool
//! and channel tables are sized at construction.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use fontsynth_midi::{join_14bit, CHANNELS_PER_PORT, DEFAULT_PERCUSSION_CHANNEL};

use crate::channel::{ChannelState, ControllerEffect};
use crate::config::{LogConfig, SynthConfig};
use crate::key_modifier::{KeyModifier, KeyModifierManager};
use crate::message::{MessageReceiver, SynthMessage};
use crate::mixer::VoiceMixer;
use crate::resolver::GeneratorResolver;
use crate::snapshot::{ChannelSnapshot, MasterSettings, SynthSnapshot};
use crate::soundbank::{Preset, SoundBank, DRUM_BANK};
use crate::voice::{ChannelRender, NoteStart, Voice};
use crate::voice_manager::VoiceManager;
use crate::Result;

/// Under high performance mode, notes quieter than this are dropped.
const HIGH_PERFORMANCE_MIN_VELOCITY: u8 = 10;
/// Under high performance mode and this many voices, quiet notes are dropped.
const HIGH_PERFORMANCE_BUSY_VOICES: usize = 200;
const HIGH_PERFORMANCE_BUSY_MIN_VELOCITY: u8 = 40;

/// Synth-wide parameters set through [`SynthProcessor::set_master_parameter`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MasterParameter {
    /// Linear gain.
    MasterVolume(f64),
    /// -1 (left) to 1 (right).
    MasterPan(f64),
    VoiceCap(usize),
    /// Semitones, applied to every melodic channel.
    Transpose(f64),
    /// Cents.
    MasterTuning(f64),
    HighPerformanceMode(bool),
}

pub struct SynthProcessor {
    config: SynthConfig,
    bank: Arc<ArcSwap<SoundBank>>,
    current_bank: Arc<SoundBank>,
    channels: Vec<ChannelState>,
    voices: VoiceManager,
    mixer: VoiceMixer,
    key_modifiers: KeyModifierManager,
    channel_renders: Vec<ChannelRender>,
    master_volume: f64,
    /// Universal SysEx master volume, multiplied with `master_volume`.
    midi_volume: f64,
    master_pan: f64,
    transpose: f64,
    master_tuning: f64,
    /// Seconds rendered so far.
    current_time: f64,
    log: LogConfig,
}

impl SynthProcessor {
    /// Create a processor reading presets from a shared, swappable bank.
    pub fn new(config: SynthConfig, bank: Arc<ArcSwap<SoundBank>>) -> Result<Self> {
        config.validate()?;
        let log = config.log;
        let current_bank = bank.load_full();

        let mut voices = VoiceManager::new(config.voice_cap, config.voice_pool_capacity, log);
        voices.set_high_performance(config.high_performance_mode);

        let mut channels = Vec::with_capacity(config.max_channels);
        channels.extend((0..config.channel_count).map(|number| ChannelState::new(number, log)));

        let mut processor = Self {
            mixer: VoiceMixer::new(config.sample_rate),
            key_modifiers: KeyModifierManager::new(config.max_channels),
            channel_renders: Vec::with_capacity(config.max_channels),
            bank,
            current_bank,
            channels,
            voices,
            master_volume: 1.0,
            midi_volume: 1.0,
            master_pan: 0.0,
            transpose: 0.0,
            master_tuning: 0.0,
            current_time: 0.0,
            log,
            config,
        };
        for index in 0..processor.channels.len() {
            processor.load_default_preset(index);
        }
        if log.state {
            info!(
                "Synthesizer ready: {} channels, {} Hz, bank '{}'",
                processor.channels.len(),
                processor.config.sample_rate,
                processor.current_bank.name()
            );
        }
        Ok(processor)
    }

    /// Create a processor with its own bank handle.
    pub fn with_sound_bank(config: SynthConfig, bank: SoundBank) -> Result<Self> {
        Self::new(config, Arc::new(ArcSwap::from_pointee(bank)))
    }

    /// The bank handle; store a new bank into it to swap at the next render.
    pub fn shared_sound_bank(&self) -> Arc<ArcSwap<SoundBank>> {
        Arc::clone(&self.bank)
    }

    pub fn sound_bank(&self) -> &Arc<SoundBank> {
        &self.current_bank
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    #[inline]
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.config.sample_rate
    }

    pub fn channel(&self, channel: usize) -> Option<&ChannelState> {
        self.channels.get(channel)
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn voices(&self) -> &[Voice] {
        self.voices.voices()
    }

    pub fn channel_voice_count(&self, channel: usize) -> usize {
        self.voices.channel_voice_count(channel)
    }

    pub fn voice_cap(&self) -> usize {
        self.voices.voice_cap()
    }

    pub fn key_modifiers(&self) -> &KeyModifierManager {
        &self.key_modifiers
    }

    /// Grow to at least `count` channels, up to `max_channels`. Existing
    /// channels are untouched.
    pub fn ensure_channels(&mut self, count: usize) {
        let count = count.min(self.config.max_channels);
        while self.channels.len() < count {
            let index = self.channels.len();
            self.channels.push(ChannelState::new(index, self.log));
            self.load_default_preset(index);
            if self.log.state {
                debug!("Added channel {}", index);
            }
        }
    }

    fn load_default_preset(&mut self, index: usize) {
        let channel = &mut self.channels[index];
        let preset = Arc::clone(self.current_bank.get_preset(channel.bank(), 0));
        channel.set_preset(preset);
    }

    fn channel_mut(&mut self, channel: usize) -> Option<&mut ChannelState> {
        if channel >= self.channels.len() && self.log.warnings {
            warn!(
                "Channel {} out of range ({} channels)",
                channel,
                self.channels.len()
            );
        }
        self.channels.get_mut(channel)
    }

    /// Start a note. Velocity 0 is a note off.
    pub fn note_on(&mut self, channel: usize, key: u8, velocity: u8) {
        if key > 127 {
            if self.log.warnings {
                warn!("Note on with key {} out of range", key);
            }
            return;
        }
        if velocity == 0 {
            self.note_off(channel, key);
            return;
        }
        let velocity = velocity.min(127);
        if self.voices.high_performance()
            && (velocity < HIGH_PERFORMANCE_MIN_VELOCITY
                || (self.voices.len() > HIGH_PERFORMANCE_BUSY_VOICES
                    && velocity < HIGH_PERFORMANCE_BUSY_MIN_VELOCITY))
        {
            return;
        }
        let Some(ch) = self.channels.get_mut(channel) else {
            if self.log.warnings {
                warn!("Note on for missing channel {}", channel);
            }
            return;
        };
        if ch.is_muted() {
            return;
        }
        let real_key = key as i32 + ch.key_shift();
        if !(0..=127).contains(&real_key) {
            return;
        }
        let real_key = real_key as u8;

        let mut velocity = ch.velocity_override.unwrap_or(velocity);
        if let Some(key_velocity) = self.key_modifiers.velocity(channel, real_key) {
            velocity = key_velocity;
        }
        let gain = self.key_modifiers.gain(channel, real_key);
        let glide = ch.take_glide(real_key);

        let preset: &Arc<Preset> = match self.key_modifiers.patch(channel, real_key) {
            Some((bank, program)) => self.current_bank.get_preset(bank, program),
            None => match ch.preset() {
                Some(preset) => preset,
                None => return,
            },
        };
        let note = NoteStart {
            channel,
            real_key,
            is_drum: ch.is_drum(),
            preset: (preset.bank, preset.program),
            start_time: self.current_time,
            gain,
            glide,
            vibrato: ch.vibrato(),
        };
        let sample_rate = self.config.sample_rate;
        let layers = preset.layers(real_key, velocity);
        if layers.is_empty() && self.log.info {
            debug!(
                "No zone for key {} velocity {} in preset '{}'",
                real_key, velocity, preset.name
            );
        }
        self.voices.start_voices(layers.iter().map(|layer| {
            let params = GeneratorResolver::for_layer(layer).resolve(
                &layer.sample,
                real_key,
                velocity,
                sample_rate,
            );
            Voice::new(Arc::clone(&layer.sample), params, note)
        }));
    }

    /// Release a note (or mark it sustained while the pedal is down).
    pub fn note_off(&mut self, channel: usize, key: u8) {
        let Some(ch) = self.channels.get(channel) else {
            return;
        };
        let real_key = key as i32 + ch.key_shift();
        if !(0..=127).contains(&real_key) {
            return;
        }
        let (hold, is_drum) = (ch.hold_pedal(), ch.is_drum());
        self.voices
            .note_off(channel, real_key as u8, hold, is_drum, self.current_time);
    }

    pub fn controller_change(&mut self, channel: usize, cc: u8, value: u8) {
        let Some(ch) = self.channel_mut(channel) else {
            return;
        };
        let effect = ch.controller_change(cc, value);
        self.apply_effect(channel, effect);
    }

    fn apply_effect(&mut self, channel: usize, effect: ControllerEffect) {
        match effect {
            ControllerEffect::None => {}
            ControllerEffect::AllNotesOff => self.voices.stop_all(Some(channel), false),
            ControllerEffect::AllSoundOff => self.voices.stop_all(Some(channel), true),
            ControllerEffect::HoldPedalReleased => self.voices.release_sustained(channel),
        }
    }

    /// Select a program in the channel's current bank.
    pub fn program_change(&mut self, channel: usize, program: u8) {
        let bank = Arc::clone(&self.current_bank);
        let Some(ch) = self.channel_mut(channel) else {
            return;
        };
        if ch.lock_preset {
            return;
        }
        let preset = bank.get_preset(ch.bank(), program & 0x7F);
        ch.set_preset(Arc::clone(preset));
    }

    /// Pitch wheel from its two data bytes.
    pub fn pitch_wheel(&mut self, channel: usize, msb: u8, lsb: u8) {
        self.set_pitch_wheel(channel, join_14bit(msb, lsb));
    }

    pub fn set_pitch_wheel(&mut self, channel: usize, value: u16) {
        if let Some(ch) = self.channel_mut(channel) {
            ch.set_pitch_wheel(value);
        }
    }

    /// `None` performs a full system reset, `Some` resets one channel.
    pub fn reset_all_controllers(&mut self, channel: Option<usize>) {
        match channel {
            Some(channel) => {
                if let Some(ch) = self.channel_mut(channel) {
                    let effect = ch.reset_controllers();
                    self.apply_effect(channel, effect);
                }
            }
            None => self.system_reset(),
        }
    }

    /// Stop everything and return every channel to its power-on state.
    pub fn system_reset(&mut self) {
        if self.log.state {
            info!("Resetting all controllers");
        }
        self.voices.stop_all(None, true);
        self.midi_volume = 1.0;
        for index in 0..self.channels.len() {
            let ch = &mut self.channels[index];
            ch.reset_controllers();
            if !ch.lock_preset {
                ch.bank = 0;
                ch.bank_lsb = 0;
                ch.set_drums(index % CHANNELS_PER_PORT == DEFAULT_PERCUSSION_CHANNEL);
                self.load_default_preset(index);
            }
            let ch = &mut self.channels[index];
            ch.transpose(self.transpose, false);
            ch.set_master_tuning(self.master_tuning);
        }
    }

    pub fn set_master_parameter(&mut self, parameter: MasterParameter) {
        if self.log.state {
            debug!("Master parameter: {:?}", parameter);
        }
        match parameter {
            MasterParameter::MasterVolume(volume) => self.master_volume = volume.max(0.0),
            MasterParameter::MasterPan(pan) => self.master_pan = pan.clamp(-1.0, 1.0),
            MasterParameter::VoiceCap(cap) => self.voices.set_voice_cap(cap),
            MasterParameter::Transpose(semitones) => {
                self.transpose = semitones;
                for ch in &mut self.channels {
                    ch.transpose(semitones, false);
                }
            }
            MasterParameter::MasterTuning(cents) => {
                self.master_tuning = cents;
                for ch in &mut self.channels {
                    ch.set_master_tuning(cents);
                }
            }
            MasterParameter::HighPerformanceMode(enabled) => {
                self.voices.set_high_performance(enabled)
            }
        }
    }

    pub fn master_volume(&self) -> f64 {
        self.master_volume
    }

    pub(crate) fn set_midi_volume(&mut self, volume: f64) {
        self.midi_volume = volume.clamp(0.0, 1.0);
    }

    /// Release (or kill, with `force`) the voices of one or all channels.
    pub fn stop_all(&mut self, channel: Option<usize>, force: bool) {
        self.voices.stop_all(channel, force);
    }

    pub fn kill_voices(&mut self, count: usize) {
        self.voices.kill_voices(count);
    }

    pub fn mute_channel(&mut self, channel: usize, muted: bool) {
        if let Some(ch) = self.channel_mut(channel) {
            ch.muted = muted;
            if muted {
                self.voices.stop_all(Some(channel), true);
            }
        }
    }

    /// Toggle drum mode and reload the preset from the matching bank.
    pub fn set_drums(&mut self, channel: usize, is_drum: bool) {
        let Some(ch) = self.channel_mut(channel) else {
            return;
        };
        if ch.lock_preset || ch.is_drum() == is_drum {
            return;
        }
        ch.set_drums(is_drum);
        let program = ch.program();
        self.program_change(channel, program);
    }

    pub fn lock_preset(&mut self, channel: usize, locked: bool) {
        if let Some(ch) = self.channel_mut(channel) {
            ch.lock_preset = locked;
        }
    }

    pub fn lock_controller(&mut self, channel: usize, cc: u8, locked: bool) {
        if let Some(ch) = self.channel_mut(channel) {
            ch.lock_controller(cc, locked);
        }
    }

    pub fn transpose_channel(&mut self, channel: usize, semitones: f64, force: bool) {
        if let Some(ch) = self.channel_mut(channel) {
            ch.transpose(semitones, force);
        }
    }

    pub fn set_velocity_override(&mut self, channel: usize, velocity: Option<u8>) {
        if let Some(ch) = self.channel_mut(channel) {
            ch.velocity_override = velocity.map(|v| v.clamp(1, 127));
        }
    }

    pub fn add_key_modifier(&mut self, channel: usize, key: u8, modifier: KeyModifier) {
        self.key_modifiers.add(channel, key, modifier);
    }

    pub fn remove_key_modifier(&mut self, channel: usize, key: u8) {
        self.key_modifiers.remove(channel, key);
    }

    pub fn clear_key_modifiers(&mut self) {
        self.key_modifiers.clear();
    }

    pub fn handle_message(&mut self, message: SynthMessage) {
        match message {
            SynthMessage::NoteOn {
                channel,
                key,
                velocity,
            } => self.note_on(channel, key, velocity),
            SynthMessage::NoteOff { channel, key } => self.note_off(channel, key),
            SynthMessage::ControlChange {
                channel,
                controller,
                value,
            } => self.controller_change(channel, controller, value),
            SynthMessage::ProgramChange { channel, program } => {
                self.program_change(channel, program)
            }
            SynthMessage::PitchWheel { channel, value } => self.set_pitch_wheel(channel, value),
            SynthMessage::ResetAllControllers(channel) => self.reset_all_controllers(channel),
            SynthMessage::Master(parameter) => self.set_master_parameter(parameter),
            SynthMessage::StopAll { channel, force } => self.stop_all(channel, force),
            SynthMessage::KillVoices(count) => self.kill_voices(count),
            SynthMessage::MuteChannel { channel, muted } => self.mute_channel(channel, muted),
            SynthMessage::SetDrums { channel, is_drum } => self.set_drums(channel, is_drum),
            SynthMessage::LockPreset { channel, locked } => self.lock_preset(channel, locked),
            SynthMessage::LockController {
                channel,
                controller,
                locked,
            } => self.lock_controller(channel, controller, locked),
            SynthMessage::TransposeChannel {
                channel,
                semitones,
                force,
            } => self.transpose_channel(channel, semitones, force),
            SynthMessage::VelocityOverride { channel, velocity } => {
                self.set_velocity_override(channel, velocity)
            }
            SynthMessage::KeyModifier {
                channel,
                key,
                modifier,
            } => match modifier {
                Some(modifier) => self.add_key_modifier(channel, key, modifier),
                None => self.remove_key_modifier(channel, key),
            },
        }
    }

    /// Apply every queued message. Called at the top of each buffer.
    pub fn process_messages(&mut self, receiver: &mut MessageReceiver<SynthMessage>) {
        while let Some(message) = receiver.try_recv() {
            self.handle_message(message);
        }
    }

    /// Pick up a bank stored into the shared handle since the last buffer.
    fn sync_sound_bank(&mut self) {
        let latest = self.bank.load();
        if Arc::ptr_eq(&*latest, &self.current_bank) {
            return;
        }
        self.current_bank = arc_swap::Guard::into_inner(latest);
        self.voices.stop_all(None, true);
        for ch in &mut self.channels {
            let program = ch.program();
            let preset = Arc::clone(self.current_bank.get_preset(ch.bank(), program));
            ch.set_preset(preset);
        }
        if self.log.state {
            info!("Sound bank changed to '{}'", self.current_bank.name());
        }
    }

    /// Render one buffer. `left` and `right` are overwritten.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        left.fill(0.0);
        right.fill(0.0);
        let frames = left.len().min(right.len());
        self.sync_sound_bank();
        self.voices.process_pending_releases(self.current_time);

        let gain = self.master_volume * self.midi_volume;
        self.channel_renders.clear();
        self.channel_renders.extend(
            self.channels
                .iter()
                .map(|ch| ch.render_state(gain, self.master_pan)),
        );
        self.mixer.render_buffer(
            self.voices.voices_mut(),
            &self.channel_renders,
            &mut left[..frames],
            &mut right[..frames],
        );
        self.current_time += frames as f64 / self.config.sample_rate;
    }

    pub fn create_snapshot(&self) -> SynthSnapshot {
        SynthSnapshot {
            channels: self.channels.iter().map(ChannelSnapshot::capture).collect(),
            key_mappings: self.key_modifiers.mappings(),
            master: MasterSettings {
                volume: self.master_volume,
                pan: self.master_pan,
                transpose: self.transpose,
                tuning: self.master_tuning,
                voice_cap: self.voices.voice_cap(),
                high_performance: self.voices.high_performance(),
            },
        }
    }

    /// Restore a snapshot. Sounding voices are stopped.
    pub fn apply_snapshot(&mut self, snapshot: &SynthSnapshot) {
        self.voices.stop_all(None, true);
        self.ensure_channels(snapshot.channels.len());
        let bank = Arc::clone(&self.current_bank);
        for (ch, saved) in self.channels.iter_mut().zip(&snapshot.channels) {
            saved.restore_into(ch);
            let lookup_bank = if saved.is_drum { DRUM_BANK } else { saved.bank };
            ch.set_preset(Arc::clone(bank.get_preset(lookup_bank, saved.program)));
            ch.lock_preset = saved.lock_preset;
        }

        self.key_modifiers.clear();
        for mapping in &snapshot.key_mappings {
            self.key_modifiers
                .add(mapping.channel, mapping.key, mapping.modifier);
        }

        let master = snapshot.master;
        self.master_volume = master.volume.max(0.0);
        self.master_pan = master.pan.clamp(-1.0, 1.0);
        self.transpose = master.transpose;
        self.master_tuning = master.tuning;
        self.voices.set_voice_cap(master.voice_cap);
        self.voices.set_high_performance(master.high_performance);
        if self.log.state {
            info!("Applied snapshot with {} channels", snapshot.channels.len());
        }
    }
}
