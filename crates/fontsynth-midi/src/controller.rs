//! MIDI controller numbers used by the synth and the sequencer.

pub const BANK_SELECT: u8 = 0;
pub const MODULATION_WHEEL: u8 = 1;
pub const BREATH_CONTROLLER: u8 = 2;
pub const FOOT_CONTROLLER: u8 = 4;
pub const PORTAMENTO_TIME: u8 = 5;
pub const DATA_ENTRY_MSB: u8 = 6;
pub const MAIN_VOLUME: u8 = 7;
pub const BALANCE: u8 = 8;
pub const PAN: u8 = 10;
pub const EXPRESSION: u8 = 11;

/// First LSB controller (modulation wheel LSB).
pub const LSB_MODULATION_WHEEL: u8 = 33;
pub const LSB_BANK_SELECT: u8 = 32;
pub const LSB_DATA_ENTRY: u8 = 38;
pub const LSB_MAIN_VOLUME: u8 = 39;
pub const LSB_PAN: u8 = 42;
/// Last LSB controller merged into its MSB counterpart (effect control 2).
pub const LSB_EFFECT_CONTROL_2: u8 = 45;

pub const SUSTAIN_PEDAL: u8 = 64;
pub const PORTAMENTO_ON_OFF: u8 = 65;
pub const SOSTENUTO_PEDAL: u8 = 66;
pub const SOFT_PEDAL: u8 = 67;

pub const SOUND_VARIATION: u8 = 70;
pub const FILTER_RESONANCE: u8 = 71;
pub const RELEASE_TIME: u8 = 72;
pub const ATTACK_TIME: u8 = 73;
pub const BRIGHTNESS: u8 = 74;
pub const DECAY_TIME: u8 = 75;
pub const VIBRATO_RATE: u8 = 76;
pub const VIBRATO_DEPTH: u8 = 77;
pub const VIBRATO_DELAY: u8 = 78;
pub const SOUND_CONTROLLER_10: u8 = 79;
pub const GENERAL_PURPOSE_6: u8 = 81;
pub const GENERAL_PURPOSE_8: u8 = 83;

pub const PORTAMENTO_CONTROL: u8 = 84;

pub const REVERB_DEPTH: u8 = 91;
pub const TREMOLO_DEPTH: u8 = 92;
pub const CHORUS_DEPTH: u8 = 93;
pub const DETUNE_DEPTH: u8 = 94;
pub const PHASER_DEPTH: u8 = 95;

pub const DATA_INCREMENT: u8 = 96;
pub const DATA_DECREMENT: u8 = 97;
pub const NRPN_LSB: u8 = 98;
pub const NRPN_MSB: u8 = 99;
pub const RPN_LSB: u8 = 100;
pub const RPN_MSB: u8 = 101;

/// RPG Maker style loop start marker.
pub const LOOP_START: u8 = 111;

pub const ALL_SOUND_OFF: u8 = 120;
pub const RESET_ALL_CONTROLLERS: u8 = 121;
pub const LOCAL_CONTROL: u8 = 122;
pub const ALL_NOTES_OFF: u8 = 123;
pub const OMNI_OFF: u8 = 124;
pub const OMNI_ON: u8 = 125;
pub const MONO_ON: u8 = 126;
pub const POLY_ON: u8 = 127;

/// Controllers a sequencer seek must apply immediately instead of
/// deferring to the end of the seek.
///
/// These change how later events are interpreted (parameter numbers,
/// data entry, bank) so they cannot be collapsed into a final value.
#[inline]
pub fn is_non_skippable(controller: u8) -> bool {
    matches!(
        controller,
        DATA_INCREMENT
            | DATA_DECREMENT
            | DATA_ENTRY_MSB
            | LSB_DATA_ENTRY
            | RPN_LSB
            | RPN_MSB
            | NRPN_LSB
            | NRPN_MSB
            | BANK_SELECT
            | LSB_BANK_SELECT
            | RESET_ALL_CONTROLLERS
    )
}

/// Controllers left untouched by an RP-15 "reset all controllers".
#[inline]
pub fn is_non_resettable(controller: u8) -> bool {
    matches!(
        controller,
        BANK_SELECT
            | LSB_BANK_SELECT
            | MAIN_VOLUME
            | LSB_MAIN_VOLUME
            | PAN
            | LSB_PAN
            | REVERB_DEPTH
            | TREMOLO_DEPTH
            | CHORUS_DEPTH
            | DETUNE_DEPTH
            | PHASER_DEPTH
            | SOUND_VARIATION
            | FILTER_RESONANCE
            | RELEASE_TIME
            | ATTACK_TIME
            | BRIGHTNESS
            | DECAY_TIME
            | VIBRATO_RATE
            | VIBRATO_DEPTH
            | VIBRATO_DELAY
            | SOUND_CONTROLLER_10
    )
}

/// Power-on value (7-bit) of every controller.
pub const fn default_value(controller: u8) -> u8 {
    match controller {
        MAIN_VOLUME => 100,
        EXPRESSION => 127,
        BALANCE | PAN => 64,
        PORTAMENTO_ON_OFF => 127,
        FILTER_RESONANCE | RELEASE_TIME | ATTACK_TIME | BRIGHTNESS | DECAY_TIME | VIBRATO_RATE
        | VIBRATO_DEPTH | VIBRATO_DELAY | GENERAL_PURPOSE_6 | GENERAL_PURPOSE_8 => 64,
        RPN_LSB | RPN_MSB | NRPN_LSB | NRPN_MSB => 127,
        _ => 0,
    }
}
