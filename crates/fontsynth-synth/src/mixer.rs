//! Per-buffer voice rendering.

use crate::voice::{ChannelRender, Voice};

/// Sums voices into a stereo buffer and retires the finished ones.
#[derive(Debug, Clone, Copy)]
pub struct VoiceMixer {
    sample_rate: f64,
}

impl VoiceMixer {
    pub fn new(sample_rate: f64) -> Self {
        Self { sample_rate }
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Render every voice into `left` / `right` (added to their contents).
    ///
    /// `channels[voice.channel]` supplies the channel values; voices whose
    /// channel is missing render at unity. Voices that finish during this
    /// buffer are removed before returning.
    pub fn render_buffer(
        &self,
        voices: &mut Vec<Voice>,
        channels: &[ChannelRender],
        left: &mut [f32],
        right: &mut [f32],
    ) {
        let fallback = ChannelRender::default();
        voices.retain_mut(|voice| {
            let channel = channels.get(voice.channel).unwrap_or(&fallback);
            voice.render(left, right, channel, self.sample_rate)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::GeneratorResolver;
    use crate::soundbank::{GeneratorTable, Sample};
    use crate::voice::{ChannelVibrato, NoteStart};
    use std::sync::Arc;

    fn voice(channel: usize, frames: usize) -> Voice {
        let sample = Arc::new(Sample::new("s", vec![0.25; frames], 44100));
        let table = GeneratorTable::default();
        let params = GeneratorResolver::new(&table, &table).resolve(&sample, 60, 127, 44100.0);
        Voice::new(
            sample,
            params,
            NoteStart {
                channel,
                real_key: 60,
                is_drum: false,
                preset: (0, 0),
                start_time: 0.0,
                gain: 1.0,
                glide: None,
                vibrato: ChannelVibrato::default(),
            },
        )
    }

    #[test]
    fn test_voices_are_summed() {
        let mixer = VoiceMixer::new(44100.0);
        let mut voices = vec![voice(0, 1024), voice(1, 1024)];
        let mut left = vec![0.0; 64];
        let mut right = vec![0.0; 64];
        mixer.render_buffer(&mut voices, &[], &mut left, &mut right);
        assert!(left.iter().all(|&s| (s - 0.5).abs() < 1e-6));
        assert_eq!(voices.len(), 2);
    }

    #[test]
    fn test_channel_gain_applies() {
        let mixer = VoiceMixer::new(44100.0);
        let mut voices = vec![voice(1, 1024)];
        let channels = [
            ChannelRender::default(),
            ChannelRender {
                gain: 0.0,
                ..Default::default()
            },
        ];
        let mut left = vec![0.0; 64];
        let mut right = vec![0.0; 64];
        mixer.render_buffer(&mut voices, &channels, &mut left, &mut right);
        assert!(left.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_finished_voices_retired() {
        let mixer = VoiceMixer::new(44100.0);
        let mut voices = vec![voice(0, 16), voice(0, 1024)];
        let mut left = vec![0.0; 64];
        let mut right = vec![0.0; 64];
        mixer.render_buffer(&mut voices, &[], &mut left, &mut right);
        assert_eq!(voices.len(), 1);
    }
}
