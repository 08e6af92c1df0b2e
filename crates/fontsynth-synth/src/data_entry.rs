//! RPN / NRPN data entry.
//!
//! CC 101/100 select a registered parameter, CC 99/98 a non-registered
//! one. CC 6 (coarse) and CC 38 (fine) then write the selected parameter.
//! Non-registered parameters follow the Roland SC-88 part parameters.

use tracing::{debug, warn};

use fontsynth_midi::controller;

use crate::channel::{ChannelState, ControllerEffect};

/// Where the channel is in the parameter-number protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum DataEntryState {
    #[default]
    Idle,
    RpnCoarse,
    RpnFine,
    NrpnCoarse,
    NrpnFine,
}

/// Registered parameter numbers.
mod rpn {
    pub const PITCH_BEND_RANGE: u16 = 0x0000;
    pub const FINE_TUNING: u16 = 0x0001;
    pub const COARSE_TUNING: u16 = 0x0002;
    pub const MODULATION_DEPTH: u16 = 0x0005;
    pub const RESET_PARAMETERS: u16 = 0x3FFF;
}

/// Non-registered parameter numbers (MSB, then LSB for part parameters).
mod nrpn {
    pub const PART_PARAMETER: u8 = 0x01;
    pub const DRUM_REVERB: u8 = 0x1D;

    pub const VIBRATO_RATE: u8 = 0x08;
    pub const VIBRATO_DEPTH: u8 = 0x09;
    pub const VIBRATO_DELAY: u8 = 0x0A;
    pub const FILTER_CUTOFF: u8 = 0x20;
    pub const ENVELOPE_ATTACK: u8 = 0x63;
    pub const ENVELOPE_RELEASE: u8 = 0x66;
}

/// Value meaning "leave at default" for NRPN part parameters.
const NRPN_NO_CHANGE: u8 = 64;

impl ChannelState {
    /// Selected registered parameter (MSB << 7 | LSB).
    fn rpn_value(&self) -> u16 {
        self.controller_14bit(controller::RPN_MSB) | self.controller(controller::RPN_LSB) as u16
    }

    /// CC 6.
    pub(crate) fn data_entry_coarse(&mut self, value: u8) -> ControllerEffect {
        match self.data_entry {
            DataEntryState::Idle | DataEntryState::NrpnCoarse => ControllerEffect::None,
            DataEntryState::NrpnFine => self.nrpn_coarse(value),
            DataEntryState::RpnCoarse | DataEntryState::RpnFine => {
                match self.rpn_value() {
                    rpn::PITCH_BEND_RANGE => {
                        self.set_pitch_bend_range_coarse(value);
                        self.log_parameter("Pitch bend range", value as f64, "semitones");
                    }
                    rpn::COARSE_TUNING => {
                        let semitones = value as f64 - 64.0;
                        self.custom.channel_tuning_semitones = semitones;
                        self.log_parameter("Coarse tuning", semitones, "semitones");
                    }
                    // Stored as cents until the LSB arrives.
                    rpn::FINE_TUNING => self.set_tuning(value as f64 - 64.0),
                    rpn::MODULATION_DEPTH => self.set_modulation_depth(value as f64 * 100.0),
                    rpn::RESET_PARAMETERS => self.reset_parameters(),
                    other => {
                        if self.log.warnings {
                            warn!(
                                "Unrecognized RPN for channel {}: 0x{:04X} data value: {}",
                                self.number(),
                                other,
                                value
                            );
                        }
                    }
                }
                ControllerEffect::None
            }
        }
    }

    /// CC 38.
    pub(crate) fn data_entry_fine(&mut self, value: u8) {
        if !matches!(
            self.data_entry,
            DataEntryState::RpnCoarse | DataEntryState::RpnFine
        ) {
            return;
        }
        match self.rpn_value() {
            rpn::PITCH_BEND_RANGE => {
                if value == 0 {
                    return;
                }
                self.set_pitch_bend_range_fine(value);
                let range = self.pitch_bend_range();
                self.log_parameter("Pitch bend range", range, "semitones");
            }
            rpn::FINE_TUNING => {
                let coarse = self.custom.channel_tuning as i32;
                let fine = (coarse << 7) | value as i32;
                self.set_tuning(fine as f64 * 100.0 / 8192.0);
            }
            rpn::MODULATION_DEPTH => {
                let current = self.custom.modulation_multiplier * 50.0;
                self.set_modulation_depth(current + value as f64 / 128.0 * 100.0);
            }
            rpn::RESET_PARAMETERS => self.reset_parameters(),
            _ => {}
        }
    }

    fn nrpn_coarse(&mut self, value: u8) -> ControllerEffect {
        if self.lock_vibrato {
            return ControllerEffect::None;
        }
        let msb = self.controller(controller::NRPN_MSB);
        let lsb = self.controller(controller::NRPN_LSB);
        match (msb, lsb) {
            (nrpn::PART_PARAMETER, nrpn::VIBRATO_RATE) => {
                if value == NRPN_NO_CHANGE {
                    return ControllerEffect::None;
                }
                self.seed_vibrato();
                self.vibrato.rate_hz = value as f64 / 64.0 * 8.0;
                self.log_parameter("Vibrato rate", self.vibrato.rate_hz, "Hz");
                ControllerEffect::None
            }
            (nrpn::PART_PARAMETER, nrpn::VIBRATO_DEPTH) => {
                if value == NRPN_NO_CHANGE {
                    return ControllerEffect::None;
                }
                self.seed_vibrato();
                self.vibrato.depth_cents = value as f64 / 2.0;
                self.log_parameter("Vibrato depth", self.vibrato.depth_cents, "cents");
                ControllerEffect::None
            }
            (nrpn::PART_PARAMETER, nrpn::VIBRATO_DELAY) => {
                if value == NRPN_NO_CHANGE {
                    return ControllerEffect::None;
                }
                self.seed_vibrato();
                self.vibrato.delay = value as f64 / 64.0 / 3.0;
                self.log_parameter("Vibrato delay", self.vibrato.delay, "seconds");
                ControllerEffect::None
            }
            (nrpn::PART_PARAMETER, nrpn::FILTER_CUTOFF) => {
                self.controller_change(controller::BRIGHTNESS, value)
            }
            (nrpn::PART_PARAMETER, nrpn::ENVELOPE_ATTACK) => {
                self.controller_change(controller::ATTACK_TIME, value)
            }
            (nrpn::PART_PARAMETER, nrpn::ENVELOPE_RELEASE) => {
                self.controller_change(controller::RELEASE_TIME, value)
            }
            (nrpn::DRUM_REVERB, _) => self.controller_change(controller::REVERB_DEPTH, value),
            _ => {
                if value != NRPN_NO_CHANGE && self.log.warnings {
                    warn!(
                        "Unrecognized NRPN for channel {}: (0x{:02X} 0x{:02X}) data value: {}",
                        self.number(),
                        msb,
                        lsb,
                        value
                    );
                }
                ControllerEffect::None
            }
        }
    }

    /// First use of NRPN vibrato starts from a usable preset.
    fn seed_vibrato(&mut self) {
        let vibrato = &mut self.vibrato;
        if vibrato.delay == 0.0 && vibrato.rate_hz == 0.0 && vibrato.depth_cents == 0.0 {
            vibrato.depth_cents = 50.0;
            vibrato.rate_hz = 8.0;
            vibrato.delay = 0.6;
        }
    }

    fn log_parameter(&self, what: &str, value: f64, unit: &str) {
        if self.log.info {
            debug!("{} for channel {} is now {} {}", what, self.number(), value, unit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogConfig;
    use approx::assert_relative_eq;

    fn channel() -> ChannelState {
        ChannelState::new(0, LogConfig::silent())
    }

    fn select_rpn(ch: &mut ChannelState, msb: u8, lsb: u8) {
        ch.controller_change(controller::RPN_MSB, msb);
        ch.controller_change(controller::RPN_LSB, lsb);
    }

    fn select_nrpn(ch: &mut ChannelState, msb: u8, lsb: u8) {
        ch.controller_change(controller::NRPN_MSB, msb);
        ch.controller_change(controller::NRPN_LSB, lsb);
    }

    #[test]
    fn test_state_transitions() {
        let mut ch = channel();
        ch.controller_change(controller::RPN_MSB, 0);
        assert_eq!(ch.data_entry_state(), DataEntryState::RpnCoarse);
        ch.controller_change(controller::RPN_LSB, 0);
        assert_eq!(ch.data_entry_state(), DataEntryState::RpnFine);
        ch.controller_change(controller::NRPN_MSB, 1);
        assert_eq!(ch.data_entry_state(), DataEntryState::NrpnCoarse);
        ch.controller_change(controller::NRPN_LSB, 8);
        assert_eq!(ch.data_entry_state(), DataEntryState::NrpnFine);
    }

    #[test]
    fn test_pitch_bend_range() {
        let mut ch = channel();
        select_rpn(&mut ch, 0, 0);
        ch.controller_change(controller::DATA_ENTRY_MSB, 12);
        assert_relative_eq!(ch.pitch_bend_range(), 12.0);
        ch.controller_change(controller::LSB_DATA_ENTRY, 64);
        assert_relative_eq!(ch.pitch_bend_range(), 12.5);
    }

    #[test]
    fn test_coarse_tuning() {
        let mut ch = channel();
        select_rpn(&mut ch, 0, 2);
        ch.controller_change(controller::DATA_ENTRY_MSB, 66);
        assert_relative_eq!(ch.custom_controllers().tuning_cents(), 200.0);
    }

    #[test]
    fn test_fine_tuning_combines_msb_and_lsb() {
        let mut ch = channel();
        select_rpn(&mut ch, 0, 1);
        ch.controller_change(controller::DATA_ENTRY_MSB, 65);
        assert_relative_eq!(ch.custom_controllers().channel_tuning, 1.0);
        ch.controller_change(controller::LSB_DATA_ENTRY, 0);
        assert_relative_eq!(ch.custom_controllers().channel_tuning, 128.0 * 100.0 / 8192.0);
    }

    #[test]
    fn test_modulation_depth() {
        let mut ch = channel();
        select_rpn(&mut ch, 0, 5);
        ch.controller_change(controller::DATA_ENTRY_MSB, 1);
        assert_relative_eq!(ch.custom_controllers().modulation_multiplier, 2.0);
        ch.controller_change(controller::LSB_DATA_ENTRY, 64);
        assert_relative_eq!(ch.custom_controllers().modulation_multiplier, 3.0);
    }

    #[test]
    fn test_rpn_reset_returns_to_idle() {
        let mut ch = channel();
        select_rpn(&mut ch, 0x7F, 0x7F);
        ch.controller_change(controller::DATA_ENTRY_MSB, 0);
        assert_eq!(ch.data_entry_state(), DataEntryState::Idle);
        // Data entry while idle changes nothing.
        ch.controller_change(controller::DATA_ENTRY_MSB, 24);
        assert_relative_eq!(ch.pitch_bend_range(), 2.0);
    }

    #[test]
    fn test_nrpn_vibrato_seeds_defaults() {
        let mut ch = channel();
        select_nrpn(&mut ch, 0x01, 0x08);
        ch.controller_change(controller::DATA_ENTRY_MSB, 32);
        let vibrato = ch.vibrato();
        assert_relative_eq!(vibrato.rate_hz, 4.0);
        assert_relative_eq!(vibrato.depth_cents, 50.0);
        assert_relative_eq!(vibrato.delay, 0.6);

        select_nrpn(&mut ch, 0x01, 0x09);
        ch.controller_change(controller::DATA_ENTRY_MSB, 64);
        assert_relative_eq!(ch.vibrato().depth_cents, 50.0);
        ch.controller_change(controller::DATA_ENTRY_MSB, 20);
        assert_relative_eq!(ch.vibrato().depth_cents, 10.0);
    }

    #[test]
    fn test_nrpn_needs_both_bytes() {
        let mut ch = channel();
        ch.controller_change(controller::NRPN_MSB, 0x01);
        ch.controller_change(controller::DATA_ENTRY_MSB, 10);
        assert_eq!(ch.vibrato(), Default::default());
    }

    #[test]
    fn test_nrpn_routes_to_controllers() {
        let mut ch = channel();
        select_nrpn(&mut ch, 0x01, 0x20);
        ch.controller_change(controller::DATA_ENTRY_MSB, 90);
        assert_eq!(ch.controller(controller::BRIGHTNESS), 90);

        select_nrpn(&mut ch, 0x1D, 36);
        ch.controller_change(controller::DATA_ENTRY_MSB, 100);
        assert_eq!(ch.controller(controller::REVERB_DEPTH), 100);
    }

    #[test]
    fn test_vibrato_lock() {
        let mut ch = channel();
        ch.lock_vibrato = true;
        select_nrpn(&mut ch, 0x01, 0x08);
        ch.controller_change(controller::DATA_ENTRY_MSB, 32);
        assert_eq!(ch.vibrato(), Default::default());
    }
}
