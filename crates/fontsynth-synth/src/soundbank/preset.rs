//! Presets, instruments and their zones.

use std::sync::Arc;

use smallvec::SmallVec;

use super::generator::{Generator, GeneratorTable, GeneratorType};
use super::sample::Sample;

/// Percussion bank number.
pub const DRUM_BANK: u16 = 128;

/// Inclusive key or velocity range of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneRange {
    pub lo: u8,
    pub hi: u8,
}

impl ZoneRange {
    pub const FULL: ZoneRange = ZoneRange { lo: 0, hi: 127 };

    pub const fn new(lo: u8, hi: u8) -> Self {
        Self { lo, hi }
    }

    #[inline]
    pub fn contains(&self, value: u8) -> bool {
        value >= self.lo && value <= self.hi
    }
}

impl Default for ZoneRange {
    fn default() -> Self {
        Self::FULL
    }
}

#[derive(Debug, Clone)]
pub struct InstrumentZone {
    pub key_range: ZoneRange,
    pub vel_range: ZoneRange,
    pub generators: GeneratorTable,
    pub sample: Arc<Sample>,
}

impl InstrumentZone {
    pub fn new(sample: Arc<Sample>) -> Self {
        Self {
            key_range: ZoneRange::FULL,
            vel_range: ZoneRange::FULL,
            generators: GeneratorTable::default(),
            sample,
        }
    }

    pub fn with_key_range(mut self, lo: u8, hi: u8) -> Self {
        self.key_range = ZoneRange::new(lo, hi);
        self
    }

    pub fn with_vel_range(mut self, lo: u8, hi: u8) -> Self {
        self.vel_range = ZoneRange::new(lo, hi);
        self
    }

    pub fn with_generator(mut self, kind: GeneratorType, value: i16) -> Self {
        self.generators.set(kind, value);
        self
    }

    pub fn with_generators(mut self, generators: &[Generator]) -> Self {
        for generator in generators {
            self.generators.set(generator.kind, generator.value);
        }
        self
    }
}

#[derive(Debug, Clone)]
pub struct Instrument {
    pub name: String,
    /// Global zone generators, overridden by each zone.
    pub global: GeneratorTable,
    pub zones: Vec<InstrumentZone>,
}

impl Instrument {
    pub fn new(name: impl Into<String>, zones: Vec<InstrumentZone>) -> Self {
        Self {
            name: name.into(),
            global: GeneratorTable::default(),
            zones,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PresetZone {
    pub key_range: ZoneRange,
    pub vel_range: ZoneRange,
    pub generators: GeneratorTable,
    pub instrument: Arc<Instrument>,
}

impl PresetZone {
    pub fn new(instrument: Arc<Instrument>) -> Self {
        Self {
            key_range: ZoneRange::FULL,
            vel_range: ZoneRange::FULL,
            generators: GeneratorTable::default(),
            instrument,
        }
    }

    pub fn with_key_range(mut self, lo: u8, hi: u8) -> Self {
        self.key_range = ZoneRange::new(lo, hi);
        self
    }

    pub fn with_generator(mut self, kind: GeneratorType, value: i16) -> Self {
        self.generators.set(kind, value);
        self
    }
}

/// Generators and sample for one sounding layer of a note.
#[derive(Debug, Clone)]
pub struct NoteLayer {
    pub instrument_generators: GeneratorTable,
    pub preset_generators: GeneratorTable,
    pub sample: Arc<Sample>,
}

/// Instrument definition selected by (bank, program).
#[derive(Debug, Clone)]
pub struct Preset {
    pub name: String,
    pub bank: u16,
    pub program: u8,
    pub global: GeneratorTable,
    pub zones: Vec<PresetZone>,
}

impl Preset {
    pub fn new(name: impl Into<String>, bank: u16, program: u8, zones: Vec<PresetZone>) -> Self {
        Self {
            name: name.into(),
            bank,
            program,
            global: GeneratorTable::default(),
            zones,
        }
    }

    #[inline]
    pub fn is_drum(&self) -> bool {
        self.bank == DRUM_BANK
    }

    /// All layers that sound for `key` at `velocity`.
    pub fn layers(&self, key: u8, velocity: u8) -> SmallVec<[NoteLayer; 4]> {
        let mut layers = SmallVec::new();
        for zone in &self.zones {
            if !zone.key_range.contains(key) || !zone.vel_range.contains(velocity) {
                continue;
            }
            let preset_generators = self.global.merged_with(&zone.generators);
            let instrument = &zone.instrument;
            for instrument_zone in &instrument.zones {
                if !instrument_zone.key_range.contains(key)
                    || !instrument_zone.vel_range.contains(velocity)
                {
                    continue;
                }
                layers.push(NoteLayer {
                    instrument_generators: instrument.global.merged_with(&instrument_zone.generators),
                    preset_generators,
                    sample: Arc::clone(&instrument_zone.sample),
                });
            }
        }
        layers
    }

    pub(crate) fn samples(&self) -> impl Iterator<Item = &Arc<Sample>> {
        self.zones
            .iter()
            .flat_map(|zone| zone.instrument.zones.iter().map(|z| &z.sample))
    }
}
