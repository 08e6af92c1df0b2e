//! Per-channel MIDI state.
//!
//! Controllers are kept as 14-bit values (`value << 7`, LSB merged in for
//! 33..=45). Voice-level consequences of a controller change are reported
//! back as a [`ControllerEffect`] so the caller can apply them to the voice
//! pool.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use fontsynth_midi::controller;
use fontsynth_midi::PITCH_WHEEL_CENTER;

use crate::config::LogConfig;
use crate::data_entry::DataEntryState;
use crate::soundbank::{Preset, DRUM_BANK};
use crate::units::portamento_seconds;
use crate::voice::{ChannelRender, ChannelVibrato, Glide};

const CONTROLLER_COUNT: usize = 128;

/// Full scale of a 7-bit controller stored in the 14-bit table.
const CONTROLLER_FULL_SCALE: f64 = (127 << 7) as f64;

/// Default pitch bend range: 2 semitones.
const DEFAULT_BEND_RANGE: u16 = 2 << 7;

/// What the voice pool has to do after a controller change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEffect {
    None,
    /// Release every voice on the channel.
    AllNotesOff,
    /// Kill every voice on the channel.
    AllSoundOff,
    /// The hold pedal went up; release the sustained voices.
    HoldPedalReleased,
}

/// Tuning and depth values that are not MIDI controllers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CustomControllers {
    /// RPN fine tuning, cents.
    pub channel_tuning: f64,
    /// Fractional part of the transpose, cents.
    pub channel_transpose_fine: f64,
    /// Modulation wheel depth in units of 50 cents.
    pub modulation_multiplier: f64,
    /// System-exclusive master tuning, cents.
    pub master_tuning: f64,
    /// RPN coarse tuning, semitones.
    pub channel_tuning_semitones: f64,
}

impl Default for CustomControllers {
    fn default() -> Self {
        Self {
            channel_tuning: 0.0,
            channel_transpose_fine: 0.0,
            modulation_multiplier: 1.0,
            master_tuning: 0.0,
            channel_tuning_semitones: 0.0,
        }
    }
}

impl CustomControllers {
    /// Combined channel tuning in cents.
    #[inline]
    pub fn tuning_cents(&self) -> f64 {
        self.channel_tuning
            + self.channel_transpose_fine
            + self.master_tuning
            + self.channel_tuning_semitones * 100.0
    }
}

/// Power-on controller table.
fn reset_table() -> [u16; CONTROLLER_COUNT] {
    let mut table = [0u16; CONTROLLER_COUNT];
    for (cc, slot) in table.iter_mut().enumerate() {
        *slot = (controller::default_value(cc as u8) as u16) << 7;
    }
    table
}

#[derive(Debug, Clone)]
pub struct ChannelState {
    number: usize,
    pub(crate) controllers: [u16; CONTROLLER_COUNT],
    pub(crate) locked: [bool; CONTROLLER_COUNT],
    /// Last key for portamento; `None` until a glide source exists.
    portamento_from: Option<u8>,
    pub(crate) pitch_wheel: u16,
    /// 14-bit semitones: MSB whole semitones, LSB 1/128ths.
    pub(crate) pitch_bend_range: u16,
    pub(crate) custom: CustomControllers,
    pub(crate) vibrato: ChannelVibrato,
    pub(crate) lock_vibrato: bool,
    pub(crate) data_entry: DataEntryState,
    pub(crate) hold_pedal: bool,
    pub(crate) key_shift: i32,
    pub(crate) bank: u16,
    pub(crate) bank_lsb: u8,
    pub(crate) is_drum: bool,
    preset: Option<Arc<Preset>>,
    pub(crate) lock_preset: bool,
    pub(crate) muted: bool,
    pub(crate) velocity_override: Option<u8>,
    pub(crate) log: LogConfig,
}

impl ChannelState {
    pub fn new(number: usize, log: LogConfig) -> Self {
        Self {
            number,
            controllers: reset_table(),
            locked: [false; CONTROLLER_COUNT],
            portamento_from: None,
            pitch_wheel: PITCH_WHEEL_CENTER,
            pitch_bend_range: DEFAULT_BEND_RANGE,
            custom: CustomControllers::default(),
            vibrato: ChannelVibrato::default(),
            lock_vibrato: false,
            data_entry: DataEntryState::Idle,
            hold_pedal: false,
            key_shift: 0,
            bank: 0,
            bank_lsb: 0,
            is_drum: number % fontsynth_midi::CHANNELS_PER_PORT
                == fontsynth_midi::DEFAULT_PERCUSSION_CHANNEL,
            preset: None,
            lock_preset: false,
            muted: false,
            velocity_override: None,
            log,
        }
    }

    #[inline]
    pub fn number(&self) -> usize {
        self.number
    }

    /// 7-bit value of a controller.
    #[inline]
    pub fn controller(&self, cc: u8) -> u8 {
        (self.controllers[cc as usize & 0x7F] >> 7) as u8
    }

    /// Raw 14-bit table value.
    #[inline]
    pub fn controller_14bit(&self, cc: u8) -> u16 {
        self.controllers[cc as usize & 0x7F]
    }

    pub fn controllers(&self) -> &[u16; CONTROLLER_COUNT] {
        &self.controllers
    }

    pub fn locked_controllers(&self) -> &[bool; CONTROLLER_COUNT] {
        &self.locked
    }

    pub fn lock_controller(&mut self, cc: u8, locked: bool) {
        self.locked[cc as usize & 0x7F] = locked;
    }

    #[inline]
    pub fn hold_pedal(&self) -> bool {
        self.hold_pedal
    }

    #[inline]
    pub fn is_drum(&self) -> bool {
        self.is_drum
    }

    #[inline]
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    #[inline]
    pub fn key_shift(&self) -> i32 {
        self.key_shift
    }

    #[inline]
    pub fn custom_controllers(&self) -> &CustomControllers {
        &self.custom
    }

    #[inline]
    pub fn vibrato(&self) -> ChannelVibrato {
        self.vibrato
    }

    #[inline]
    pub fn data_entry_state(&self) -> DataEntryState {
        self.data_entry
    }

    #[inline]
    pub fn preset(&self) -> Option<&Arc<Preset>> {
        self.preset.as_ref()
    }

    #[inline]
    pub fn program(&self) -> u8 {
        self.preset.as_ref().map_or(0, |preset| preset.program)
    }

    /// Bank used for preset lookup.
    #[inline]
    pub fn bank(&self) -> u16 {
        if self.is_drum {
            DRUM_BANK
        } else {
            self.bank
        }
    }

    /// Raw bank select values (MSB, LSB) as received.
    pub fn bank_select(&self) -> (u16, u8) {
        (self.bank, self.bank_lsb)
    }

    pub(crate) fn set_bank_select(&mut self, bank: u16) {
        if !self.lock_preset {
            self.bank = bank;
        }
    }

    /// Replace the preset unless the preset is locked.
    pub(crate) fn set_preset(&mut self, preset: Arc<Preset>) {
        if self.lock_preset {
            return;
        }
        if self.log.info {
            debug!(
                "Channel {} preset {}:{} '{}'",
                self.number, preset.bank, preset.program, preset.name
            );
        }
        self.preset = Some(preset);
    }

    pub(crate) fn set_drums(&mut self, is_drum: bool) {
        if self.lock_preset || self.is_drum == is_drum {
            return;
        }
        self.is_drum = is_drum;
        if is_drum {
            self.custom.channel_transpose_fine = 0.0;
            self.key_shift = 0;
        }
        if self.log.state {
            info!("Channel {} drum mode: {}", self.number, is_drum);
        }
    }

    /// Apply a controller change.
    pub fn controller_change(&mut self, cc: u8, value: u8) -> ControllerEffect {
        let cc = cc & 0x7F;
        let value = value & 0x7F;

        if (controller::LSB_MODULATION_WHEEL..=controller::LSB_EFFECT_CONTROL_2).contains(&cc)
            && cc != controller::LSB_DATA_ENTRY
        {
            let msb = (cc - 32) as usize;
            if self.locked[msb] {
                return ControllerEffect::None;
            }
            self.controllers[msb] = (self.controllers[msb] & 0x3F80) | value as u16;
        }
        if self.locked[cc as usize] {
            return ControllerEffect::None;
        }
        self.controllers[cc as usize] = (value as u16) << 7;

        match cc {
            controller::ALL_NOTES_OFF => ControllerEffect::AllNotesOff,
            controller::ALL_SOUND_OFF => ControllerEffect::AllSoundOff,
            controller::BANK_SELECT => {
                self.set_bank_select(value as u16);
                ControllerEffect::None
            }
            controller::LSB_BANK_SELECT => {
                if !self.lock_preset {
                    self.bank_lsb = value;
                }
                ControllerEffect::None
            }
            controller::RPN_LSB => {
                self.data_entry = DataEntryState::RpnFine;
                ControllerEffect::None
            }
            controller::RPN_MSB => {
                self.data_entry = DataEntryState::RpnCoarse;
                ControllerEffect::None
            }
            controller::NRPN_MSB => {
                self.data_entry = DataEntryState::NrpnCoarse;
                ControllerEffect::None
            }
            controller::NRPN_LSB => {
                self.data_entry = DataEntryState::NrpnFine;
                ControllerEffect::None
            }
            controller::DATA_ENTRY_MSB => self.data_entry_coarse(value),
            controller::LSB_DATA_ENTRY => {
                self.data_entry_fine(value);
                ControllerEffect::None
            }
            controller::RESET_ALL_CONTROLLERS => self.reset_controllers_rp15(),
            controller::PORTAMENTO_CONTROL => {
                self.portamento_from = Some(value);
                ControllerEffect::None
            }
            controller::SUSTAIN_PEDAL => {
                let was_held = self.hold_pedal;
                self.hold_pedal = value >= 64;
                if was_held && !self.hold_pedal {
                    ControllerEffect::HoldPedalReleased
                } else {
                    ControllerEffect::None
                }
            }
            _ => ControllerEffect::None,
        }
    }

    /// Set the 14-bit pitch wheel.
    pub fn set_pitch_wheel(&mut self, value: u16) {
        self.pitch_wheel = value.min(0x3FFF);
    }

    #[inline]
    pub fn pitch_wheel(&self) -> u16 {
        self.pitch_wheel
    }

    /// Pitch bend range in semitones.
    #[inline]
    pub fn pitch_bend_range(&self) -> f64 {
        (self.pitch_bend_range >> 7) as f64 + (self.pitch_bend_range & 0x7F) as f64 / 128.0
    }

    pub(crate) fn set_pitch_bend_range_coarse(&mut self, semitones: u8) {
        self.pitch_bend_range = (semitones as u16) << 7;
    }

    pub(crate) fn set_pitch_bend_range_fine(&mut self, fraction: u8) {
        self.pitch_bend_range |= fraction as u16 & 0x7F;
    }

    /// Transpose by `semitones`; the integer part shifts keys, the rest
    /// tunes. Drum channels ignore this unless `force` is set.
    pub fn transpose(&mut self, semitones: f64, force: bool) {
        if self.is_drum && !force {
            return;
        }
        let whole = semitones.trunc();
        self.key_shift = whole as i32;
        self.custom.channel_transpose_fine = (semitones - whole) * 100.0;
    }

    pub(crate) fn set_tuning(&mut self, cents: f64) {
        self.custom.channel_tuning = cents;
        if self.log.info {
            debug!("Channel {} fine tuning: {} cents", self.number, cents);
        }
    }

    pub(crate) fn set_modulation_depth(&mut self, cents: f64) {
        self.custom.modulation_multiplier = cents / 50.0;
        if self.log.info {
            debug!("Channel {} modulation depth: {} cents", self.number, cents);
        }
    }

    pub(crate) fn set_master_tuning(&mut self, cents: f64) {
        self.custom.master_tuning = cents;
    }

    /// Portamento glide for a note on `key`, updating the portamento source.
    pub(crate) fn take_glide(&mut self, key: u8) -> Option<Glide> {
        let time = self.controller(controller::PORTAMENTO_TIME);
        let engaged = !self.is_drum
            && self.portamento_from != Some(key)
            && self.controller(controller::PORTAMENTO_ON_OFF) >= 64
            && time > 0;
        if !engaged {
            return None;
        }
        let glide = self.portamento_from.map(|from_key| Glide {
            from_key,
            seconds: portamento_seconds(time, from_key.abs_diff(key)),
        });
        self.controller_change(controller::PORTAMENTO_CONTROL, key);
        glide
    }

    /// Power-on reset of controllers, tuning and vibrato. Locked
    /// controllers and the transpose survive.
    pub fn reset_controllers(&mut self) -> ControllerEffect {
        let was_held = self.hold_pedal;
        let defaults = reset_table();
        for (cc, &default) in defaults.iter().enumerate() {
            if !self.locked[cc] {
                self.controllers[cc] = default;
            }
        }
        self.portamento_from = None;
        self.pitch_wheel = PITCH_WHEEL_CENTER;
        self.pitch_bend_range = DEFAULT_BEND_RANGE;
        if !self.lock_vibrato {
            self.vibrato = ChannelVibrato::default();
        }
        self.hold_pedal = false;
        let transpose_fine = self.custom.channel_transpose_fine;
        let master_tuning = self.custom.master_tuning;
        self.custom = CustomControllers {
            channel_transpose_fine: transpose_fine,
            master_tuning,
            ..CustomControllers::default()
        };
        self.reset_parameters();
        if was_held {
            ControllerEffect::HoldPedalReleased
        } else {
            ControllerEffect::None
        }
    }

    /// RP-15 "reset all controllers": pitch wheel and vibrato reset, every
    /// resettable controller back to its default.
    pub fn reset_controllers_rp15(&mut self) -> ControllerEffect {
        let was_held = self.hold_pedal;
        self.pitch_wheel = PITCH_WHEEL_CENTER;
        if !self.lock_vibrato {
            self.vibrato = ChannelVibrato::default();
        }
        for cc in 0..CONTROLLER_COUNT as u8 {
            if controller::is_non_resettable(cc) || self.locked[cc as usize] {
                continue;
            }
            let default = (controller::default_value(cc) as u16) << 7;
            if cc == controller::PORTAMENTO_CONTROL {
                self.portamento_from = None;
                self.controllers[cc as usize] = default;
            } else if cc == controller::SUSTAIN_PEDAL {
                self.hold_pedal = false;
                self.controllers[cc as usize] = default;
            } else if cc != controller::RESET_ALL_CONTROLLERS {
                self.controllers[cc as usize] = default;
            }
        }
        self.reset_parameters();
        if self.log.state {
            info!("Channel {} controllers reset", self.number);
        }
        if was_held {
            ControllerEffect::HoldPedalReleased
        } else {
            ControllerEffect::None
        }
    }

    /// Forget the selected parameter number.
    pub fn reset_parameters(&mut self) {
        self.data_entry = DataEntryState::Idle;
        let idle = (controller::default_value(controller::RPN_MSB) as u16) << 7;
        for cc in [
            controller::RPN_MSB,
            controller::RPN_LSB,
            controller::NRPN_MSB,
            controller::NRPN_LSB,
        ] {
            self.controllers[cc as usize] = idle;
        }
    }

    /// Snapshot of everything voices read while rendering.
    pub fn render_state(&self, master_gain: f64, master_pan: f64) -> ChannelRender {
        let volume = self.controllers[controller::MAIN_VOLUME as usize] as f64
            / CONTROLLER_FULL_SCALE;
        let expression =
            self.controllers[controller::EXPRESSION as usize] as f64 / CONTROLLER_FULL_SCALE;
        let pan = (self.controller(controller::PAN) as f64 - 64.0) / 64.0;
        let bend = (self.pitch_wheel as f64 - PITCH_WHEEL_CENTER as f64)
            / PITCH_WHEEL_CENTER as f64
            * self.pitch_bend_range()
            * 100.0;
        let mod_wheel = self.controllers[controller::MODULATION_WHEEL as usize] as f64
            / CONTROLLER_FULL_SCALE;
        ChannelRender {
            gain: volume * volume * expression * expression * master_gain,
            pan: (pan + master_pan).clamp(-1.0, 1.0),
            pitch_cents: bend + self.custom.tuning_cents(),
            mod_wheel_cents: self.custom.modulation_multiplier * 50.0 * mod_wheel,
            vibrato: self.vibrato,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn channel() -> ChannelState {
        ChannelState::new(0, LogConfig::silent())
    }

    #[test]
    fn test_power_on_defaults() {
        let ch = channel();
        assert_eq!(ch.controller(controller::MAIN_VOLUME), 100);
        assert_eq!(ch.controller(controller::EXPRESSION), 127);
        assert_eq!(ch.pitch_wheel(), 8192);
        assert_relative_eq!(ch.pitch_bend_range(), 2.0);
        assert!(!ch.is_drum());
        assert!(ChannelState::new(9, LogConfig::silent()).is_drum());
        assert!(ChannelState::new(25, LogConfig::silent()).is_drum());
    }

    #[test]
    fn test_lsb_merges_into_msb() {
        let mut ch = channel();
        ch.controller_change(controller::MAIN_VOLUME, 100);
        ch.controller_change(controller::LSB_MAIN_VOLUME, 5);
        assert_eq!(ch.controller_14bit(controller::MAIN_VOLUME), (100 << 7) | 5);
        assert_eq!(ch.controller(controller::MAIN_VOLUME), 100);
    }

    #[test]
    fn test_locked_controller_ignored() {
        let mut ch = channel();
        ch.lock_controller(controller::MAIN_VOLUME, true);
        ch.controller_change(controller::MAIN_VOLUME, 10);
        ch.controller_change(controller::LSB_MAIN_VOLUME, 10);
        assert_eq!(ch.controller_14bit(controller::MAIN_VOLUME), 100 << 7);
    }

    #[test]
    fn test_sustain_pedal_effects() {
        let mut ch = channel();
        assert_eq!(
            ch.controller_change(controller::SUSTAIN_PEDAL, 127),
            ControllerEffect::None
        );
        assert!(ch.hold_pedal());
        assert_eq!(
            ch.controller_change(controller::SUSTAIN_PEDAL, 0),
            ControllerEffect::HoldPedalReleased
        );
        assert!(!ch.hold_pedal());
    }

    #[test]
    fn test_rp15_reset_keeps_volume_and_pan() {
        let mut ch = channel();
        ch.controller_change(controller::MAIN_VOLUME, 20);
        ch.controller_change(controller::PAN, 0);
        ch.controller_change(controller::EXPRESSION, 30);
        ch.controller_change(controller::MODULATION_WHEEL, 90);
        ch.controller_change(controller::SUSTAIN_PEDAL, 127);
        ch.set_pitch_wheel(0);

        let effect = ch.controller_change(controller::RESET_ALL_CONTROLLERS, 0);
        assert_eq!(effect, ControllerEffect::HoldPedalReleased);
        assert_eq!(ch.controller(controller::MAIN_VOLUME), 20);
        assert_eq!(ch.controller(controller::PAN), 0);
        assert_eq!(ch.controller(controller::EXPRESSION), 127);
        assert_eq!(ch.controller(controller::MODULATION_WHEEL), 0);
        assert_eq!(ch.pitch_wheel(), 8192);
        assert_eq!(ch.data_entry_state(), DataEntryState::Idle);
    }

    #[test]
    fn test_full_reset_keeps_transpose_fine() {
        let mut ch = channel();
        ch.transpose(2.5, false);
        ch.set_tuning(30.0);
        ch.controller_change(controller::MAIN_VOLUME, 20);
        ch.reset_controllers();
        assert_eq!(ch.controller(controller::MAIN_VOLUME), 100);
        assert_relative_eq!(ch.custom_controllers().channel_tuning, 0.0);
        assert_relative_eq!(ch.custom_controllers().channel_transpose_fine, 50.0);
        assert_eq!(ch.key_shift(), 2);
    }

    #[test]
    fn test_drum_ignores_transpose() {
        let mut ch = ChannelState::new(9, LogConfig::silent());
        ch.transpose(3.0, false);
        assert_eq!(ch.key_shift(), 0);
        ch.transpose(3.0, true);
        assert_eq!(ch.key_shift(), 3);
    }

    #[test]
    fn test_render_state() {
        let mut ch = channel();
        ch.controller_change(controller::MAIN_VOLUME, 127);
        ch.controller_change(controller::PAN, 127);
        ch.set_pitch_wheel(0x3FFF);
        let state = ch.render_state(1.0, 0.0);
        assert_relative_eq!(state.gain, 1.0);
        assert_relative_eq!(state.pan, 63.0 / 64.0);
        assert_relative_eq!(state.pitch_cents, 8191.0 / 8192.0 * 200.0);
    }

    #[test]
    fn test_glide_needs_source_key() {
        let mut ch = channel();
        ch.controller_change(controller::PORTAMENTO_TIME, 32);
        // CC65 powers on at 127.
        assert_eq!(ch.take_glide(60), None);
        let glide = ch.take_glide(72).unwrap();
        assert_eq!(glide.from_key, 60);
        assert_relative_eq!(glide.seconds, portamento_seconds(32, 12));
    }

    #[test]
    fn test_no_glide_on_drums() {
        let mut ch = ChannelState::new(9, LogConfig::silent());
        ch.controller_change(controller::PORTAMENTO_TIME, 32);
        ch.controller_change(controller::PORTAMENTO_CONTROL, 50);
        assert_eq!(ch.take_glide(60), None);
    }
}
