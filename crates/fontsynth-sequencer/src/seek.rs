//! Channel state collected while seeking.
//!
//! A seek replays the song from tick 0 without sounding notes. Pitch
//! wheel, controller and program events are folded into their final
//! values here and sent once the target is reached, so a seek costs one
//! message per changed parameter instead of one per event.

use fontsynth_midi::{controller, PITCH_WHEEL_CENTER};

use crate::sink::SequencerSink;

const CONTROLLER_COUNT: usize = 128;

#[derive(Debug, Clone)]
struct SavedChannel {
    pitch_wheel: u16,
    /// Bank select travels live; only the program is deferred.
    program: Option<u8>,
    controllers: [u8; CONTROLLER_COUNT],
}

impl SavedChannel {
    fn reset(&mut self) {
        self.pitch_wheel = PITCH_WHEEL_CENTER;
        self.program = None;
        self.controllers = DEFAULT_CONTROLLERS;
    }
}

impl Default for SavedChannel {
    fn default() -> Self {
        Self {
            pitch_wheel: PITCH_WHEEL_CENTER,
            program: None,
            controllers: DEFAULT_CONTROLLERS,
        }
    }
}

const DEFAULT_CONTROLLERS: [u8; CONTROLLER_COUNT] = {
    let mut table = [0u8; CONTROLLER_COUNT];
    let mut cc = 0;
    while cc < CONTROLLER_COUNT {
        table[cc] = controller::default_value(cc as u8);
        cc += 1;
    }
    table
};

/// Per-channel values saved during a seek.
#[derive(Debug, Default)]
pub(crate) struct SeekState {
    channels: Vec<SavedChannel>,
}

impl SeekState {
    /// Start a new seek over `channel_count` channels.
    pub(crate) fn reset(&mut self, channel_count: usize) {
        self.channels.resize_with(channel_count, SavedChannel::default);
        for channel in &mut self.channels {
            channel.reset();
        }
    }

    pub(crate) fn note_on(&mut self, channel: usize, key: u8) {
        // The last note is the portamento source after the seek.
        if let Some(saved) = self.channels.get_mut(channel) {
            saved.controllers[controller::PORTAMENTO_CONTROL as usize] = key;
        }
    }

    pub(crate) fn pitch_wheel(&mut self, channel: usize, value: u16) {
        if let Some(saved) = self.channels.get_mut(channel) {
            saved.pitch_wheel = value;
        }
    }

    pub(crate) fn program_change(&mut self, channel: usize, program: u8) {
        if let Some(saved) = self.channels.get_mut(channel) {
            saved.program = Some(program);
        }
    }

    /// Record or forward a controller. Controllers that change how later
    /// events are read go straight to the sink.
    pub(crate) fn controller_change<S: SequencerSink>(
        &mut self,
        sink: &mut S,
        channel: usize,
        cc: u8,
        value: u8,
    ) {
        let Some(saved) = self.channels.get_mut(channel) else {
            return;
        };
        if !controller::is_non_skippable(cc) {
            if let Some(slot) = saved.controllers.get_mut(cc as usize) {
                *slot = value;
            }
            return;
        }
        if cc == controller::RESET_ALL_CONTROLLERS {
            saved.pitch_wheel = PITCH_WHEEL_CENTER;
            for (index, slot) in saved.controllers.iter_mut().enumerate() {
                if !controller::is_non_resettable(index as u8) {
                    *slot = DEFAULT_CONTROLLERS[index];
                }
            }
        }
        sink.controller_change(channel, cc, value);
    }

    /// Send the collected state.
    pub(crate) fn apply<S: SequencerSink>(&self, sink: &mut S) {
        for (channel, saved) in self.channels.iter().enumerate() {
            sink.pitch_wheel(channel, saved.pitch_wheel);
            for (cc, &value) in saved.controllers.iter().enumerate() {
                let cc = cc as u8;
                if value != DEFAULT_CONTROLLERS[cc as usize] && !controller::is_non_skippable(cc) {
                    sink.controller_change(channel, cc, value);
                }
            }
            if let Some(program) = saved.program {
                sink.program_change(channel, program);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        controllers: Vec<(usize, u8, u8)>,
        programs: Vec<(usize, u8)>,
        pitch: Vec<(usize, u16)>,
    }

    impl SequencerSink for Recorder {
        fn current_time(&self) -> f64 {
            0.0
        }
        fn channel_count(&self) -> usize {
            16
        }
        fn ensure_channels(&mut self, _count: usize) {}
        fn note_on(&mut self, _channel: usize, _key: u8, _velocity: u8) {}
        fn note_off(&mut self, _channel: usize, _key: u8) {}
        fn controller_change(&mut self, channel: usize, controller: u8, value: u8) {
            self.controllers.push((channel, controller, value));
        }
        fn program_change(&mut self, channel: usize, program: u8) {
            self.programs.push((channel, program));
        }
        fn pitch_wheel(&mut self, channel: usize, value: u16) {
            self.pitch.push((channel, value));
        }
        fn system_exclusive(&mut self, _data: &[u8], _channel_offset: usize) {}
        fn reset_all_controllers(&mut self) {}
        fn stop_all(&mut self, _force: bool) {}
    }

    #[test]
    fn test_only_final_value_is_sent() {
        let mut seek = SeekState::default();
        let mut sink = Recorder::default();
        seek.reset(2);
        for value in [10, 20, 30] {
            seek.controller_change(&mut sink, 1, controller::MAIN_VOLUME, value);
        }
        assert!(sink.controllers.is_empty());
        seek.apply(&mut sink);
        assert_eq!(sink.controllers, vec![(1, controller::MAIN_VOLUME, 30)]);
        assert_eq!(sink.pitch, vec![(0, 8192), (1, 8192)]);
    }

    #[test]
    fn test_data_entry_goes_through_live() {
        let mut seek = SeekState::default();
        let mut sink = Recorder::default();
        seek.reset(1);
        seek.controller_change(&mut sink, 0, controller::RPN_MSB, 0);
        seek.controller_change(&mut sink, 0, controller::DATA_ENTRY_MSB, 12);
        assert_eq!(sink.controllers.len(), 2);
        sink.controllers.clear();
        seek.apply(&mut sink);
        assert!(sink.controllers.is_empty());
    }

    #[test]
    fn test_bank_select_goes_through_live() {
        let mut seek = SeekState::default();
        let mut sink = Recorder::default();
        seek.reset(1);
        seek.controller_change(&mut sink, 0, controller::BANK_SELECT, 5);
        seek.controller_change(&mut sink, 0, controller::LSB_BANK_SELECT, 1);
        assert_eq!(
            sink.controllers,
            vec![
                (0, controller::BANK_SELECT, 5),
                (0, controller::LSB_BANK_SELECT, 1)
            ]
        );

        // Only the program is deferred; the bank is not sent again.
        seek.program_change(0, 19);
        sink.controllers.clear();
        seek.apply(&mut sink);
        assert!(sink.controllers.is_empty());
        assert_eq!(sink.programs, vec![(0, 19)]);
    }

    #[test]
    fn test_reset_all_controllers_clears_saved_values() {
        let mut seek = SeekState::default();
        let mut sink = Recorder::default();
        seek.reset(1);
        seek.pitch_wheel(0, 100);
        seek.controller_change(&mut sink, 0, controller::MODULATION_WHEEL, 90);
        seek.controller_change(&mut sink, 0, controller::MAIN_VOLUME, 50);
        seek.controller_change(&mut sink, 0, controller::RESET_ALL_CONTROLLERS, 0);
        sink.controllers.clear();
        seek.apply(&mut sink);
        // Volume survives an RP-15 reset; modulation does not.
        assert_eq!(sink.controllers, vec![(0, controller::MAIN_VOLUME, 50)]);
        assert_eq!(sink.pitch, vec![(0, 8192)]);
    }

    #[test]
    fn test_last_note_sets_portamento_control() {
        let mut seek = SeekState::default();
        let mut sink = Recorder::default();
        seek.reset(1);
        seek.note_on(0, 64);
        seek.apply(&mut sink);
        assert_eq!(
            sink.controllers,
            vec![(0, controller::PORTAMENTO_CONTROL, 64)]
        );
    }
}
