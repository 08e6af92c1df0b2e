//! Synthesizer configuration.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default polyphony cap across all channels.
pub const DEFAULT_VOICE_CAP: usize = 350;

/// Which log categories the core emits.
///
/// Passed in at construction; the core never installs a subscriber or reads
/// global flags. The host decides where `tracing` output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Per-message details (controller changes, data entry, program changes).
    pub info: bool,
    /// Recoverable problems with the input (unknown NRPN, bad note numbers).
    pub warnings: bool,
    /// Larger state changes (resets, preset swaps, voice cap changes).
    pub state: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            info: false,
            warnings: true,
            state: true,
        }
    }
}

impl LogConfig {
    /// Nothing at all.
    pub const fn silent() -> Self {
        Self {
            info: false,
            warnings: false,
            state: false,
        }
    }

    pub const fn verbose() -> Self {
        Self {
            info: true,
            warnings: true,
            state: true,
        }
    }
}

/// Configuration for [`SynthProcessor`](crate::SynthProcessor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthConfig {
    pub sample_rate: f64,
    /// Initial polyphony cap.
    pub voice_cap: usize,
    /// Voices allocated up front. The cap can never exceed this.
    pub voice_pool_capacity: usize,
    /// Channels created at startup.
    pub channel_count: usize,
    /// Upper bound on channels (multi-port sequences add blocks of 16).
    pub max_channels: usize,
    /// Kill instead of release on melodic channels and drop quiet notes.
    pub high_performance_mode: bool,
    pub log: LogConfig,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            voice_cap: DEFAULT_VOICE_CAP,
            voice_pool_capacity: 1024,
            channel_count: 16,
            max_channels: 64,
            high_performance_mode: false,
            log: LogConfig::default(),
        }
    }
}

impl SynthConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate < 8000.0 || self.sample_rate > 384000.0 {
            return Err(Error::InvalidConfig(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        if self.voice_cap == 0 {
            return Err(Error::InvalidConfig("voice_cap must be at least 1".into()));
        }
        if self.voice_cap > self.voice_pool_capacity {
            return Err(Error::InvalidConfig(format!(
                "voice_cap {} exceeds voice_pool_capacity {}",
                self.voice_cap, self.voice_pool_capacity
            )));
        }
        if self.channel_count == 0 || self.channel_count > self.max_channels {
            return Err(Error::InvalidConfig(format!(
                "channel_count {} must be within 1..={}",
                self.channel_count, self.max_channels
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SynthConfig::default();
        assert_eq!(config.voice_cap, 350);
        assert_eq!(config.channel_count, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cap_above_pool_rejected() {
        let config = SynthConfig {
            voice_cap: 2000,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_bad_sample_rate_rejected() {
        let config = SynthConfig {
            sample_rate: 100.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
