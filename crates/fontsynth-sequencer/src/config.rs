//! Sequencer configuration.

use serde::{Deserialize, Serialize};

use fontsynth_synth::LogConfig;

use crate::{Error, Result};

/// Configuration for [`SequencerEngine`](crate::SequencerEngine).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencerConfig {
    /// Seeking to zero (or out of range) lands just before the first note.
    pub skip_to_first_note_on: bool,
    /// A seek while paused stays paused.
    pub preserve_playback_state: bool,
    pub loop_enabled: bool,
    /// Remaining loop repetitions. `None` loops forever.
    pub loop_count: Option<u32>,
    /// Capacity of the notification queue.
    pub notification_capacity: usize,
    /// Fixed seed for shuffle mode. `None` seeds from the OS.
    pub shuffle_seed: Option<u64>,
    pub log: LogConfig,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            skip_to_first_note_on: true,
            preserve_playback_state: false,
            loop_enabled: true,
            loop_count: None,
            notification_capacity: 256,
            shuffle_seed: None,
            log: LogConfig::default(),
        }
    }
}

impl SequencerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.notification_capacity == 0 {
            return Err(Error::InvalidConfig(
                "notification_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
