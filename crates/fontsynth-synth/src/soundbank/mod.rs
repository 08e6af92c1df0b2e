//! Sound bank data model: samples, generators, instruments and presets.
//!
//! This is the already-parsed form of a SoundFont. Binary chunk decoding is
//! the loader's job; the synth only consumes these structures.

mod generator;
mod preset;
mod sample;

use std::sync::Arc;

use tracing::debug;

pub use generator::{
    sum_generator, Generator, GeneratorLimits, GeneratorTable, GeneratorType, GENERATOR_COUNT,
};
pub use preset::{
    Instrument, InstrumentZone, NoteLayer, Preset, PresetZone, ZoneRange, DRUM_BANK,
};
pub use sample::Sample;

use crate::{Error, Result};

/// A collection of presets addressed by (bank, program).
#[derive(Debug, Clone)]
pub struct SoundBank {
    name: String,
    /// Never empty.
    presets: Vec<Arc<Preset>>,
}

impl SoundBank {
    /// Build a bank, validating every referenced sample.
    pub fn new(name: impl Into<String>, presets: Vec<Preset>) -> Result<Self> {
        let name = name.into();
        if presets.is_empty() {
            return Err(Error::SoundBank(format!("'{name}' contains no presets")));
        }
        for preset in &presets {
            for sample in preset.samples() {
                sample.validate()?;
            }
        }
        debug!("Sound bank '{}' with {} presets", name, presets.len());
        Ok(Self {
            name,
            presets: presets.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn presets(&self) -> &[Arc<Preset>] {
        &self.presets
    }

    /// Exact (bank, program) match.
    pub fn get_preset_no_fallback(&self, bank: u16, program: u8) -> Option<&Arc<Preset>> {
        self.presets
            .iter()
            .find(|preset| preset.bank == bank && preset.program == program)
    }

    /// Exact match, otherwise the closest usable preset.
    ///
    /// Drum requests fall back to any drum kit (same program first). Melodic
    /// requests fall back to the same program in any melodic bank. The last
    /// resort is the first preset of the bank.
    pub fn get_preset(&self, bank: u16, program: u8) -> &Arc<Preset> {
        if let Some(preset) = self.get_preset_no_fallback(bank, program) {
            return preset;
        }
        let fallback = if bank == DRUM_BANK {
            self.get_preset_no_fallback(DRUM_BANK, program)
                .or_else(|| self.get_preset_no_fallback(DRUM_BANK, 0))
                .or_else(|| self.presets.iter().find(|preset| preset.is_drum()))
        } else {
            self.presets
                .iter()
                .find(|preset| preset.program == program && !preset.is_drum())
        };
        fallback.unwrap_or(&self.presets[0])
    }
}
