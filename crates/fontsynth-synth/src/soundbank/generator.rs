//! SoundFont generators and their value ranges.

use serde::{Deserialize, Serialize};

/// Number of generator slots (SoundFont 2.04 ids 0..=59).
pub const GENERATOR_COUNT: usize = 60;

/// SoundFont generator identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum GeneratorType {
    StartAddrsOffset = 0,
    EndAddrsOffset = 1,
    StartloopAddrsOffset = 2,
    EndloopAddrsOffset = 3,
    StartAddrsCoarseOffset = 4,
    ModLfoToPitch = 5,
    VibLfoToPitch = 6,
    ModEnvToPitch = 7,
    InitialFilterFc = 8,
    InitialFilterQ = 9,
    ModLfoToFilterFc = 10,
    ModEnvToFilterFc = 11,
    EndAddrsCoarseOffset = 12,
    ModLfoToVolume = 13,
    Unused1 = 14,
    ChorusEffectsSend = 15,
    ReverbEffectsSend = 16,
    Pan = 17,
    Unused2 = 18,
    Unused3 = 19,
    Unused4 = 20,
    DelayModLfo = 21,
    FreqModLfo = 22,
    DelayVibLfo = 23,
    FreqVibLfo = 24,
    DelayModEnv = 25,
    AttackModEnv = 26,
    HoldModEnv = 27,
    DecayModEnv = 28,
    SustainModEnv = 29,
    ReleaseModEnv = 30,
    KeyNumToModEnvHold = 31,
    KeyNumToModEnvDecay = 32,
    DelayVolEnv = 33,
    AttackVolEnv = 34,
    HoldVolEnv = 35,
    DecayVolEnv = 36,
    SustainVolEnv = 37,
    ReleaseVolEnv = 38,
    KeyNumToVolEnvHold = 39,
    KeyNumToVolEnvDecay = 40,
    Instrument = 41,
    Reserved1 = 42,
    KeyRange = 43,
    VelRange = 44,
    StartloopAddrsCoarseOffset = 45,
    KeyNum = 46,
    Velocity = 47,
    InitialAttenuation = 48,
    Reserved2 = 49,
    EndloopAddrsCoarseOffset = 50,
    CoarseTune = 51,
    FineTune = 52,
    SampleId = 53,
    SampleModes = 54,
    Reserved3 = 55,
    ScaleTuning = 56,
    ExclusiveClass = 57,
    OverridingRootKey = 58,
    Unused5 = 59,
}

/// Valid range and default of a generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorLimits {
    pub min: i32,
    pub max: i32,
    pub default: i32,
}

impl GeneratorLimits {
    const fn new(min: i32, max: i32, default: i32) -> Self {
        Self { min, max, default }
    }

    #[inline]
    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.min, self.max)
    }
}

impl GeneratorType {
    /// Look up a generator by its numeric id.
    pub fn from_id(id: u16) -> Option<Self> {
        use GeneratorType::*;
        const ALL: [GeneratorType; GENERATOR_COUNT] = [
            StartAddrsOffset,
            EndAddrsOffset,
            StartloopAddrsOffset,
            EndloopAddrsOffset,
            StartAddrsCoarseOffset,
            ModLfoToPitch,
            VibLfoToPitch,
            ModEnvToPitch,
            InitialFilterFc,
            InitialFilterQ,
            ModLfoToFilterFc,
            ModEnvToFilterFc,
            EndAddrsCoarseOffset,
            ModLfoToVolume,
            Unused1,
            ChorusEffectsSend,
            ReverbEffectsSend,
            Pan,
            Unused2,
            Unused3,
            Unused4,
            DelayModLfo,
            FreqModLfo,
            DelayVibLfo,
            FreqVibLfo,
            DelayModEnv,
            AttackModEnv,
            HoldModEnv,
            DecayModEnv,
            SustainModEnv,
            ReleaseModEnv,
            KeyNumToModEnvHold,
            KeyNumToModEnvDecay,
            DelayVolEnv,
            AttackVolEnv,
            HoldVolEnv,
            DecayVolEnv,
            SustainVolEnv,
            ReleaseVolEnv,
            KeyNumToVolEnvHold,
            KeyNumToVolEnvDecay,
            Instrument,
            Reserved1,
            KeyRange,
            VelRange,
            StartloopAddrsCoarseOffset,
            KeyNum,
            Velocity,
            InitialAttenuation,
            Reserved2,
            EndloopAddrsCoarseOffset,
            CoarseTune,
            FineTune,
            SampleId,
            SampleModes,
            Reserved3,
            ScaleTuning,
            ExclusiveClass,
            OverridingRootKey,
            Unused5,
        ];
        ALL.get(id as usize).copied()
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Range and default used when summing instrument and preset values.
    pub const fn limits(self) -> GeneratorLimits {
        use GeneratorType::*;
        match self {
            StartAddrsOffset | StartAddrsCoarseOffset => GeneratorLimits::new(0, 32768, 0),
            EndAddrsOffset
            | StartloopAddrsOffset
            | EndloopAddrsOffset
            | EndAddrsCoarseOffset
            | StartloopAddrsCoarseOffset
            | EndloopAddrsCoarseOffset => GeneratorLimits::new(-32768, 32768, 0),
            ModLfoToPitch | VibLfoToPitch | ModEnvToPitch | ModLfoToFilterFc
            | ModEnvToFilterFc => GeneratorLimits::new(-12000, 12000, 0),
            InitialFilterFc => GeneratorLimits::new(1500, 13500, 13500),
            InitialFilterQ => GeneratorLimits::new(0, 960, 0),
            ModLfoToVolume => GeneratorLimits::new(-960, 960, 0),
            ChorusEffectsSend | ReverbEffectsSend => GeneratorLimits::new(0, 1000, 0),
            Pan => GeneratorLimits::new(-500, 500, 0),
            DelayModLfo | DelayVibLfo => GeneratorLimits::new(-12000, 5000, -12000),
            FreqModLfo | FreqVibLfo => GeneratorLimits::new(-16000, 4500, 0),
            DelayModEnv | AttackModEnv => GeneratorLimits::new(-32768, 5000, -32768),
            HoldModEnv => GeneratorLimits::new(-12000, 5000, -12000),
            DecayModEnv => GeneratorLimits::new(-12000, 8000, -12000),
            SustainModEnv => GeneratorLimits::new(0, 1000, 0),
            ReleaseModEnv => GeneratorLimits::new(-7200, 8000, -12000),
            KeyNumToModEnvHold | KeyNumToModEnvDecay | KeyNumToVolEnvHold
            | KeyNumToVolEnvDecay => GeneratorLimits::new(-1200, 1200, 0),
            DelayVolEnv => GeneratorLimits::new(-12000, 5000, -12000),
            AttackVolEnv => GeneratorLimits::new(-12000, 8000, -12000),
            HoldVolEnv => GeneratorLimits::new(-12000, 5000, -12000),
            DecayVolEnv => GeneratorLimits::new(-12000, 8000, -12000),
            SustainVolEnv => GeneratorLimits::new(0, 1440, 0),
            ReleaseVolEnv => GeneratorLimits::new(-7200, 8000, -12000),
            KeyNum | Velocity | OverridingRootKey => GeneratorLimits::new(-1, 127, -1),
            InitialAttenuation => GeneratorLimits::new(0, 1440, 0),
            CoarseTune => GeneratorLimits::new(-120, 120, 0),
            FineTune => GeneratorLimits::new(-99, 99, 0),
            ScaleTuning => GeneratorLimits::new(0, 1200, 100),
            ExclusiveClass => GeneratorLimits::new(0, 99999, 0),
            SampleModes => GeneratorLimits::new(0, 3, 0),
            Instrument | SampleId | KeyRange | VelRange | Unused1 | Unused2 | Unused3
            | Unused4 | Unused5 | Reserved1 | Reserved2 | Reserved3 => {
                GeneratorLimits::new(0, 32768, 0)
            }
        }
    }
}

/// One (generator, value) pair from a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generator {
    pub kind: GeneratorType,
    pub value: i16,
}

impl Generator {
    pub const fn new(kind: GeneratorType, value: i16) -> Self {
        Self { kind, value }
    }
}

/// Dense generator table for one zone level.
///
/// Absent generators are tracked separately from zero so the instrument
/// level can fall back to the generator default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorTable {
    values: [i16; GENERATOR_COUNT],
    present: u64,
}

impl Default for GeneratorTable {
    fn default() -> Self {
        Self {
            values: [0; GENERATOR_COUNT],
            present: 0,
        }
    }
}

impl GeneratorTable {
    pub fn from_generators(generators: &[Generator]) -> Self {
        let mut table = Self::default();
        for generator in generators {
            table.set(generator.kind, generator.value);
        }
        table
    }

    #[inline]
    pub fn set(&mut self, kind: GeneratorType, value: i16) {
        self.values[kind.index()] = value;
        self.present |= 1u64 << kind.index();
    }

    #[inline]
    pub fn get(&self, kind: GeneratorType) -> Option<i16> {
        if self.present & (1u64 << kind.index()) != 0 {
            Some(self.values[kind.index()])
        } else {
            None
        }
    }

    /// Overlay `other` on top of `self` (used for global zones).
    pub fn merged_with(&self, other: &GeneratorTable) -> GeneratorTable {
        let mut merged = *self;
        for index in 0..GENERATOR_COUNT {
            if other.present & (1u64 << index) != 0 {
                merged.values[index] = other.values[index];
                merged.present |= 1u64 << index;
            }
        }
        merged
    }
}

/// Effective value of a generator: instrument value (or default) plus
/// preset value, clamped to the generator's range.
#[inline]
pub fn sum_generator(
    kind: GeneratorType,
    instrument: &GeneratorTable,
    preset: &GeneratorTable,
) -> i32 {
    let limits = kind.limits();
    let base = instrument.get(kind).map_or(limits.default, i32::from);
    let offset = preset.get(kind).map_or(0, i32::from);
    limits.clamp(base + offset)
}
