//! The synthesizer surface the sequencer drives.

use fontsynth_synth::SynthProcessor;

/// Receiver of sequenced channel messages.
///
/// The sequencer reads its clock from the sink so that playback follows
/// the audio thread's rendered time rather than the wall clock.
/// [`SynthProcessor`] is the production implementation.
pub trait SequencerSink {
    /// Seconds of audio rendered so far.
    fn current_time(&self) -> f64;

    fn channel_count(&self) -> usize;

    /// Grow to at least `count` channels (one block of 16 per MIDI port).
    fn ensure_channels(&mut self, count: usize);

    fn note_on(&mut self, channel: usize, key: u8, velocity: u8);

    fn note_off(&mut self, channel: usize, key: u8);

    fn controller_change(&mut self, channel: usize, controller: u8, value: u8);

    fn program_change(&mut self, channel: usize, program: u8);

    /// 14-bit pitch wheel position.
    fn pitch_wheel(&mut self, channel: usize, value: u16);

    fn system_exclusive(&mut self, data: &[u8], channel_offset: usize);

    /// Reset the controllers of every channel.
    fn reset_all_controllers(&mut self);

    /// Release (or kill, with `force`) every voice.
    fn stop_all(&mut self, force: bool);
}

impl SequencerSink for SynthProcessor {
    #[inline]
    fn current_time(&self) -> f64 {
        SynthProcessor::current_time(self)
    }

    #[inline]
    fn channel_count(&self) -> usize {
        SynthProcessor::channel_count(self)
    }

    fn ensure_channels(&mut self, count: usize) {
        SynthProcessor::ensure_channels(self, count);
    }

    fn note_on(&mut self, channel: usize, key: u8, velocity: u8) {
        SynthProcessor::note_on(self, channel, key, velocity);
    }

    fn note_off(&mut self, channel: usize, key: u8) {
        SynthProcessor::note_off(self, channel, key);
    }

    fn controller_change(&mut self, channel: usize, controller: u8, value: u8) {
        SynthProcessor::controller_change(self, channel, controller, value);
    }

    fn program_change(&mut self, channel: usize, program: u8) {
        SynthProcessor::program_change(self, channel, program);
    }

    fn pitch_wheel(&mut self, channel: usize, value: u16) {
        SynthProcessor::set_pitch_wheel(self, channel, value);
    }

    fn system_exclusive(&mut self, data: &[u8], channel_offset: usize) {
        SynthProcessor::system_exclusive(self, data, channel_offset);
    }

    fn reset_all_controllers(&mut self) {
        SynthProcessor::reset_all_controllers(self, None);
    }

    fn stop_all(&mut self, force: bool) {
        SynthProcessor::stop_all(self, None, force);
    }
}
