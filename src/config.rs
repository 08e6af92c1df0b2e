//! Engine configuration.

use serde::{Deserialize, Serialize};

use fontsynth_sequencer::SequencerConfig;
use fontsynth_synth::{SynthConfig, DEFAULT_QUEUE_CAPACITY};

use crate::{Error, Result};

/// Synth and sequencer settings plus the size of the command queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub synth: SynthConfig,
    pub sequencer: SequencerConfig,
    /// Commands the control thread can queue between two buffers.
    pub command_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            synth: SynthConfig::default(),
            sequencer: SequencerConfig::default(),
            command_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        self.synth.validate()?;
        self.sequencer.validate()?;
        if self.command_capacity == 0 {
            return Err(Error::InvalidConfig(
                "command_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
