//! Builder for configuring and constructing an [`Engine`].

use fontsynth_synth::{LogConfig, SoundBank};

use crate::config::EngineConfig;
use crate::{Engine, EngineHandle, Result};

/// Every setting starts from [`EngineConfig::default`].
///
/// # Example
///
/// ```ignore
/// use fontsynth::prelude::*;
///
/// let (engine, handle) = Engine::builder()
///     .sample_rate(48000.0)
///     .voice_cap(128)
///     .loop_count(Some(2))
///     .build(bank)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    config: EngineConfig,
}

impl EngineBuilder {
    /// Start from a complete configuration.
    pub fn from_config(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Default: 44100
    pub fn sample_rate(mut self, sample_rate: f64) -> Self {
        self.config.synth.sample_rate = sample_rate;
        self
    }

    /// Default: 350
    pub fn voice_cap(mut self, cap: usize) -> Self {
        self.config.synth.voice_cap = cap;
        self
    }

    /// Upper bound on channels; multi-port songs add 16 per port.
    pub fn max_channels(mut self, channels: usize) -> Self {
        self.config.synth.max_channels = channels;
        self
    }

    pub fn high_performance_mode(mut self, enabled: bool) -> Self {
        self.config.synth.high_performance_mode = enabled;
        self
    }

    /// Applies to both the synth and the sequencer.
    pub fn log(mut self, log: LogConfig) -> Self {
        self.config.synth.log = log;
        self.config.sequencer.log = log;
        self
    }

    /// Default: 1024
    pub fn command_capacity(mut self, capacity: usize) -> Self {
        self.config.command_capacity = capacity;
        self
    }

    /// Default: true
    pub fn skip_to_first_note_on(mut self, skip: bool) -> Self {
        self.config.sequencer.skip_to_first_note_on = skip;
        self
    }

    /// Default: false
    pub fn preserve_playback_state(mut self, preserve: bool) -> Self {
        self.config.sequencer.preserve_playback_state = preserve;
        self
    }

    /// `None` loops forever. Default: `None`
    pub fn loop_count(mut self, count: Option<u32>) -> Self {
        self.config.sequencer.loop_enabled = true;
        self.config.sequencer.loop_count = count;
        self
    }

    pub fn no_loop(mut self) -> Self {
        self.config.sequencer.loop_enabled = false;
        self
    }

    pub fn shuffle_seed(mut self, seed: u64) -> Self {
        self.config.sequencer.shuffle_seed = Some(seed);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn build(self, bank: SoundBank) -> Result<(Engine, EngineHandle)> {
        Engine::new(self.config, bank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_applies_to_both() {
        let builder = EngineBuilder::default().log(LogConfig::silent());
        assert_eq!(builder.config().synth.log, LogConfig::silent());
        assert_eq!(builder.config().sequencer.log, LogConfig::silent());
    }

    #[test]
    fn test_loop_count_enables_loop() {
        let builder = EngineBuilder::default().no_loop().loop_count(Some(3));
        assert!(builder.config().sequencer.loop_enabled);
        assert_eq!(builder.config().sequencer.loop_count, Some(3));
    }
}
