//! Serializable synthesizer state.
//!
//! A snapshot holds what a host needs to restore a session: every channel
//! (program, bank, locks, controllers, tuning, vibrato), the key mappings
//! and the master parameters. Sounding voices are not part of it.

use serde::{Deserialize, Serialize};

use fontsynth_midi::controller;

use crate::channel::{ChannelState, CustomControllers};
use crate::key_modifier::KeyMapping;
use crate::voice::ChannelVibrato;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub program: u8,
    /// Bank select MSB as received (not the resolved drum bank).
    pub bank: u16,
    pub bank_lsb: u8,
    pub is_drum: bool,
    pub lock_preset: bool,
    /// Name of the preset at capture time, informational.
    pub preset_name: String,
    /// 14-bit controller table.
    pub controllers: Vec<u16>,
    pub locked_controllers: Vec<bool>,
    pub custom: CustomControllers,
    pub vibrato: ChannelVibrato,
    pub lock_vibrato: bool,
    pub key_shift: i32,
    pub muted: bool,
    pub velocity_override: Option<u8>,
    pub pitch_wheel: u16,
    /// 14-bit pitch bend range.
    pub pitch_bend_range: u16,
}

impl ChannelSnapshot {
    pub fn capture(channel: &ChannelState) -> Self {
        Self {
            program: channel.program(),
            bank: channel.bank,
            bank_lsb: channel.bank_lsb,
            is_drum: channel.is_drum,
            lock_preset: channel.lock_preset,
            preset_name: channel
                .preset()
                .map(|preset| preset.name.clone())
                .unwrap_or_default(),
            controllers: channel.controllers.to_vec(),
            locked_controllers: channel.locked.to_vec(),
            custom: channel.custom,
            vibrato: channel.vibrato,
            lock_vibrato: channel.lock_vibrato,
            key_shift: channel.key_shift,
            muted: channel.muted,
            velocity_override: channel.velocity_override,
            pitch_wheel: channel.pitch_wheel,
            pitch_bend_range: channel.pitch_bend_range,
        }
    }

    /// Write everything except the preset into `channel`. The caller looks
    /// the preset up in its sound bank and applies the preset lock after.
    pub(crate) fn restore_into(&self, channel: &mut ChannelState) {
        for (slot, &value) in channel.controllers.iter_mut().zip(&self.controllers) {
            *slot = value & 0x3FFF;
        }
        for (slot, &locked) in channel.locked.iter_mut().zip(&self.locked_controllers) {
            *slot = locked;
        }
        channel.hold_pedal = channel.controller(controller::SUSTAIN_PEDAL) >= 64;
        channel.bank = self.bank;
        channel.bank_lsb = self.bank_lsb;
        channel.is_drum = self.is_drum;
        channel.lock_preset = false;
        channel.custom = self.custom;
        channel.vibrato = self.vibrato;
        channel.lock_vibrato = self.lock_vibrato;
        channel.key_shift = self.key_shift;
        channel.muted = self.muted;
        channel.velocity_override = self.velocity_override;
        channel.pitch_wheel = self.pitch_wheel.min(0x3FFF);
        channel.pitch_bend_range = self.pitch_bend_range;
        channel.reset_parameters();
    }
}

/// Master parameters as stored in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MasterSettings {
    pub volume: f64,
    pub pan: f64,
    pub transpose: f64,
    /// Cents.
    pub tuning: f64,
    pub voice_cap: usize,
    pub high_performance: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthSnapshot {
    pub channels: Vec<ChannelSnapshot>,
    pub key_mappings: Vec<KeyMapping>,
    pub master: MasterSettings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogConfig;

    #[test]
    fn test_channel_restore() {
        let mut source = ChannelState::new(2, LogConfig::silent());
        source.controller_change(controller::MAIN_VOLUME, 42);
        source.controller_change(controller::SUSTAIN_PEDAL, 127);
        source.lock_controller(controller::PAN, true);
        source.transpose(-3.0, false);
        source.muted = true;
        let snapshot = ChannelSnapshot::capture(&source);

        let mut target = ChannelState::new(2, LogConfig::silent());
        snapshot.restore_into(&mut target);
        assert_eq!(target.controller(controller::MAIN_VOLUME), 42);
        assert!(target.hold_pedal());
        assert!(target.locked_controllers()[controller::PAN as usize]);
        assert_eq!(target.key_shift(), -3);
        assert!(target.is_muted());
    }
}
