//! System exclusive messages: GM/GS/XG resets, universal device control
//! and the common Roland GS part parameters.

use tracing::{info, warn};

use fontsynth_midi::controller;

use crate::processor::{MasterParameter, SynthProcessor};

const UNIVERSAL_NON_REALTIME: u8 = 0x7E;
const UNIVERSAL_REALTIME: u8 = 0x7F;
const ROLAND: u8 = 0x41;
const YAMAHA: u8 = 0x43;

/// GS part number to MIDI channel: part 0 is the rhythm part on channel 10.
const GS_PART_TO_CHANNEL: [usize; 16] = [9, 0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 11, 12, 13, 14, 15];

impl SynthProcessor {
    /// Execute a system exclusive message. `data` excludes the leading 0xF0;
    /// `channel_offset` is the first channel of the port it arrived on.
    pub fn system_exclusive(&mut self, data: &[u8], channel_offset: usize) {
        let byte = |index: usize| data.get(index).copied().unwrap_or(0);
        let handled = match byte(0) {
            UNIVERSAL_NON_REALTIME | UNIVERSAL_REALTIME => match (byte(2), byte(3)) {
                // Device control
                (0x04, 0x01) => {
                    let volume = u16::from(byte(5)) << 7 | u16::from(byte(4));
                    self.set_midi_volume(volume as f64 / 16383.0);
                    self.log_sysex("Master volume", volume as f64);
                    true
                }
                (0x04, 0x02) => {
                    let balance = u16::from(byte(5)) << 7 | u16::from(byte(4));
                    let pan = (balance as f64 - 8192.0) / 8192.0;
                    self.set_master_parameter(MasterParameter::MasterPan(pan));
                    true
                }
                (0x04, 0x03) => {
                    let value = (i32::from(byte(5)) << 7 | i32::from(byte(4))) - 8192;
                    let cents = (value as f64 / 81.92).floor();
                    self.set_master_parameter(MasterParameter::MasterTuning(cents));
                    true
                }
                (0x04, 0x04) => {
                    let cents = (byte(5) as f64 - 64.0) * 100.0;
                    self.set_master_parameter(MasterParameter::MasterTuning(cents));
                    true
                }
                // General MIDI on (1, 3) and off (2)
                (0x09, 0x01 | 0x02 | 0x03) => {
                    self.log_sysex("General MIDI system message", byte(3) as f64);
                    self.system_reset();
                    true
                }
                _ => false,
            },
            ROLAND if byte(2) == 0x42 && byte(3) == 0x12 => {
                self.roland_gs(data, channel_offset)
            }
            YAMAHA if byte(2) == 0x4C && byte(3) == 0x00 && byte(4) == 0x00 => {
                match byte(5) {
                    0x04 => {
                        self.set_midi_volume(byte(6) as f64 / 127.0);
                        true
                    }
                    // XG system on / reset all parameters
                    0x7E | 0x7F => {
                        self.log_sysex("XG reset", byte(6) as f64);
                        self.system_reset();
                        true
                    }
                    _ => false,
                }
            }
            _ => false,
        };
        if !handled && self.config().log.warnings {
            warn!("Unrecognized SysEx: {:02X?}", data);
        }
    }

    fn roland_gs(&mut self, data: &[u8], channel_offset: usize) -> bool {
        let byte = |index: usize| data.get(index).copied().unwrap_or(0);
        let value = byte(7);
        if byte(6) == 0x7F {
            // GS reset (0x00) or GS mode off (0x7F)
            self.log_sysex("GS reset", value as f64);
            self.system_reset();
            return true;
        }
        if byte(4) != 0x40 {
            return false;
        }
        if byte(5) & 0x10 != 0 {
            let channel = GS_PART_TO_CHANNEL[(byte(5) & 0x0F) as usize] + channel_offset;
            return match byte(6) {
                // Use for rhythm part
                0x15 => {
                    self.set_drums(channel, value > 0);
                    true
                }
                // Pitch key shift
                0x16 => {
                    self.transpose_channel(channel, value as f64 - 64.0, false);
                    true
                }
                0x1C if value > 0 => {
                    self.controller_change(channel, controller::PAN, value);
                    true
                }
                0x21 => {
                    self.controller_change(channel, controller::CHORUS_DEPTH, value);
                    true
                }
                0x22 => {
                    self.controller_change(channel, controller::REVERB_DEPTH, value);
                    true
                }
                _ => false,
            };
        }
        match (byte(5), byte(6)) {
            (0x00, 0x04) => {
                self.set_midi_volume(value as f64 / 127.0);
                true
            }
            (0x00, 0x05) => {
                self.set_master_parameter(MasterParameter::Transpose(value as f64 - 64.0));
                true
            }
            (0x00, 0x06) => {
                let pan = (value as f64 - 64.0) / 64.0;
                self.set_master_parameter(MasterParameter::MasterPan(pan));
                true
            }
            _ => false,
        }
    }

    fn log_sysex(&self, what: &str, value: f64) {
        if self.config().log.info {
            info!("SysEx {}: {}", what, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogConfig, SynthConfig};
    use crate::soundbank::{Instrument, InstrumentZone, Preset, PresetZone, Sample, SoundBank};
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn synth() -> SynthProcessor {
        let sample = Arc::new(Sample::new("s", vec![0.1; 512], 44100));
        let instrument = Arc::new(Instrument::new("i", vec![InstrumentZone::new(sample)]));
        let bank = SoundBank::new(
            "b",
            vec![
                Preset::new("Piano", 0, 0, vec![PresetZone::new(Arc::clone(&instrument))]),
                Preset::new("Drums", 128, 0, vec![PresetZone::new(instrument)]),
            ],
        )
        .unwrap();
        let config = SynthConfig {
            log: LogConfig::silent(),
            ..Default::default()
        };
        SynthProcessor::with_sound_bank(config, bank).unwrap()
    }

    #[test]
    fn test_gs_rhythm_part() {
        let mut synth = synth();
        // Part 3 (channel 2) becomes a drum part.
        synth.system_exclusive(&[0x41, 0x10, 0x42, 0x12, 0x40, 0x13, 0x15, 0x01, 0x17], 0);
        let ch = synth.channel(2).unwrap();
        assert!(ch.is_drum());
        assert_eq!(ch.preset().unwrap().name, "Drums");
    }

    #[test]
    fn test_gs_reset_restores_defaults() {
        let mut synth = synth();
        synth.controller_change(0, controller::MAIN_VOLUME, 3);
        synth.note_on(0, 60, 100);
        synth.system_exclusive(&[0x41, 0x10, 0x42, 0x12, 0x40, 0x00, 0x7F, 0x00, 0x41], 0);
        assert_eq!(synth.voice_count(), 0);
        assert_eq!(synth.channel(0).unwrap().controller(controller::MAIN_VOLUME), 100);
    }

    #[test]
    fn test_master_coarse_tuning() {
        let mut synth = synth();
        synth.system_exclusive(&[0x7F, 0x7F, 0x04, 0x04, 0x00, 0x42], 0);
        let tuning = synth.channel(0).unwrap().custom_controllers().master_tuning;
        assert_relative_eq!(tuning, 200.0);
    }

    #[test]
    fn test_unknown_sysex_is_ignored() {
        let mut synth = synth();
        synth.system_exclusive(&[0x00, 0x01], 0);
        synth.system_exclusive(&[], 0);
        assert_eq!(synth.channel_count(), 16);
    }
}
