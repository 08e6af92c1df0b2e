//! Decoded sample data.

use crate::{Error, Result};

/// Mono PCM sample with loop points and root pitch.
///
/// Samples are immutable once built and shared between voices through
/// `Arc<Sample>`; rendering never copies PCM.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    data: Vec<f32>,
    pub sample_rate: u32,
    /// Loop start frame.
    pub loop_start: usize,
    /// Loop end frame (exclusive).
    pub loop_end: usize,
    /// MIDI key at which the sample plays at its recorded pitch.
    pub original_key: u8,
    /// Pitch correction in cents.
    pub pitch_correction: i8,
}

impl Sample {
    /// A sample without loop points, rooted at middle C.
    pub fn new(name: impl Into<String>, data: Vec<f32>, sample_rate: u32) -> Self {
        let loop_end = data.len();
        Self {
            name: name.into(),
            data,
            sample_rate,
            loop_start: 0,
            loop_end,
            original_key: 60,
            pitch_correction: 0,
        }
    }

    pub fn with_loop(mut self, start: usize, end: usize) -> Self {
        self.loop_start = start;
        self.loop_end = end;
        self
    }

    pub fn with_original_key(mut self, key: u8, pitch_correction: i8) -> Self {
        self.original_key = key;
        self.pitch_correction = pitch_correction;
        self
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Error::InvalidSample {
            name: self.name.clone(),
            reason,
        };
        if self.data.is_empty() {
            return Err(invalid("no sample data".into()));
        }
        if self.sample_rate == 0 {
            return Err(invalid("sample rate is zero".into()));
        }
        if self.loop_start > self.loop_end || self.loop_end > self.data.len() {
            return Err(invalid(format!(
                "loop {}..{} outside of {} frames",
                self.loop_start,
                self.loop_end,
                self.data.len()
            )));
        }
        if self.original_key > 127 {
            return Err(invalid(format!("original key {}", self.original_key)));
        }
        Ok(())
    }
}
