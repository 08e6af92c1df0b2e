//! Parsed MIDI sequence with the metadata playback needs.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::controller;
use crate::error::{Error, Result};
use crate::event::{MetaEvent, MidiEvent, TrackEvent};
use crate::tempo_map::{TempoChange, TempoMap};

/// Loop points in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopRegion {
    pub start: u64,
    pub end: u64,
}

impl LoopRegion {
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }
}

/// An immutable multi-track MIDI sequence.
///
/// Derived data (tempo map, loop region, first note, duration, ports) is
/// computed once on construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiSequence {
    name: String,
    time_division: u16,
    tracks: Vec<Vec<TrackEvent>>,
    tempo_map: TempoMap,
    loop_region: LoopRegion,
    first_note_on: u64,
    last_voice_event_tick: u64,
    /// MIDI port of each track.
    track_ports: Vec<u8>,
    /// Bit per channel used by each track.
    used_channels: Vec<u16>,
    duration: f64,
}

impl MidiSequence {
    /// Build a sequence from absolute-tick tracks.
    ///
    /// Tracks are stably sorted by tick. Fails when there are no tracks or
    /// the time division is zero.
    pub fn new(
        name: impl Into<String>,
        time_division: u16,
        mut tracks: Vec<Vec<TrackEvent>>,
    ) -> Result<Self> {
        if tracks.is_empty() {
            return Err(Error::NoTracks);
        }
        if time_division == 0 {
            return Err(Error::InvalidTimeDivision(time_division));
        }
        for track in &mut tracks {
            track.sort_by_key(|event| event.ticks);
        }

        let mut tempo_changes: SmallVec<[TempoChange; 8]> = SmallVec::new();
        let mut first_note_on: Option<u64> = None;
        let mut last_voice_event_tick = 0u64;
        let mut marker_loop_start: Option<u64> = None;
        let mut marker_loop_end: Option<u64> = None;
        let mut track_ports = Vec::with_capacity(tracks.len());
        let mut used_channels = Vec::with_capacity(tracks.len());
        let mut previous_port = 0u8;

        for track in &tracks {
            let mut port: Option<u8> = None;
            let mut channels = 0u16;
            for TrackEvent { ticks, event } in track {
                let ticks = *ticks;
                if let Some(channel) = event.channel() {
                    channels |= 1 << (channel & 0x0F);
                    last_voice_event_tick = last_voice_event_tick.max(ticks);
                }
                match event {
                    MidiEvent::NoteOn { velocity, .. } if *velocity > 0 => {
                        first_note_on = Some(first_note_on.map_or(ticks, |t| t.min(ticks)));
                    }
                    MidiEvent::ControlChange {
                        controller: controller::LOOP_START,
                        ..
                    } => {
                        marker_loop_start.get_or_insert(ticks);
                    }
                    MidiEvent::Meta(MetaEvent::SetTempo { micros_per_quarter }) => {
                        match TempoChange::from_micros(ticks, *micros_per_quarter) {
                            Some(change) => tempo_changes.push(change),
                            None => warn!("Zero tempo at tick {}, ignoring", ticks),
                        }
                    }
                    MidiEvent::Meta(MetaEvent::Marker(text)) => {
                        match text.trim().to_ascii_lowercase().as_str() {
                            "loopstart" | "start" => {
                                marker_loop_start.get_or_insert(ticks);
                            }
                            "loopend" => {
                                marker_loop_end.get_or_insert(ticks);
                            }
                            _ => {}
                        }
                    }
                    MidiEvent::Meta(MetaEvent::MidiPort(p)) => {
                        port.get_or_insert(*p);
                    }
                    _ => {}
                }
            }
            let port = port.unwrap_or(previous_port);
            previous_port = port;
            track_ports.push(port);
            used_channels.push(channels);
        }

        let first_note_on = first_note_on.unwrap_or(0);
        let tempo_map = TempoMap::new(time_division, tempo_changes);

        let mut loop_region = LoopRegion::new(
            marker_loop_start.unwrap_or(first_note_on),
            marker_loop_end.unwrap_or(last_voice_event_tick),
        );
        if loop_region.start >= loop_region.end && last_voice_event_tick > first_note_on {
            warn!(
                "Loop start {} is not before loop end {}, using defaults",
                loop_region.start, loop_region.end
            );
            loop_region = LoopRegion::new(first_note_on, last_voice_event_tick);
        }

        let duration = tempo_map.ticks_to_seconds(last_voice_event_tick);
        let name = name.into();
        debug!(
            "Sequence '{}': {} tracks, division {}, duration {:.3}s",
            name,
            tracks.len(),
            time_division,
            duration
        );

        Ok(Self {
            name,
            time_division,
            tracks,
            tempo_map,
            loop_region,
            first_note_on,
            last_voice_event_tick,
            track_ports,
            used_channels,
            duration,
        })
    }

    /// Replace the loop region detected from the file.
    pub fn with_loop_region(mut self, region: LoopRegion) -> Self {
        self.loop_region = region;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn time_division(&self) -> u16 {
        self.time_division
    }

    #[inline]
    pub fn tracks(&self) -> &[Vec<TrackEvent>] {
        &self.tracks
    }

    #[inline]
    pub fn tempo_map(&self) -> &TempoMap {
        &self.tempo_map
    }

    #[inline]
    pub fn loop_region(&self) -> LoopRegion {
        self.loop_region
    }

    /// Tick of the earliest sounding note-on.
    #[inline]
    pub fn first_note_on(&self) -> u64 {
        self.first_note_on
    }

    #[inline]
    pub fn last_voice_event_tick(&self) -> u64 {
        self.last_voice_event_tick
    }

    #[inline]
    pub fn track_ports(&self) -> &[u8] {
        &self.track_ports
    }

    /// Whether `track` carries any channel events.
    #[inline]
    pub fn track_has_channels(&self, track: usize) -> bool {
        self.used_channels.get(track).is_some_and(|mask| *mask != 0)
    }

    /// True when tracks address more than one MIDI port.
    pub fn is_multi_port(&self) -> bool {
        let mut ports = self
            .track_ports
            .iter()
            .enumerate()
            .filter(|(i, _)| self.track_has_channels(*i))
            .map(|(_, port)| *port);
        match ports.next() {
            Some(first) => ports.any(|port| port != first),
            None => false,
        }
    }

    /// Seconds until the last channel event.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    #[inline]
    pub fn ticks_to_seconds(&self, ticks: u64) -> f64 {
        self.tempo_map.ticks_to_seconds(ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn one_note() -> Vec<TrackEvent> {
        vec![
            TrackEvent::note_on(0, 0, 60, 100),
            TrackEvent::note_off(480, 0, 60),
            TrackEvent::end_of_track(480),
        ]
    }

    #[test]
    fn test_no_tracks_is_error() {
        assert!(matches!(
            MidiSequence::new("empty", 480, vec![]),
            Err(Error::NoTracks)
        ));
    }

    #[test]
    fn test_zero_division_is_error() {
        assert!(matches!(
            MidiSequence::new("bad", 0, vec![one_note()]),
            Err(Error::InvalidTimeDivision(0))
        ));
    }

    #[test]
    fn test_single_note_metadata() {
        let seq = MidiSequence::new("note", 480, vec![one_note()]).unwrap();
        assert_eq!(seq.first_note_on(), 0);
        assert_eq!(seq.last_voice_event_tick(), 480);
        assert_relative_eq!(seq.duration(), 0.5);
        assert_eq!(seq.loop_region(), LoopRegion::new(0, 480));
        assert!(!seq.is_multi_port());
    }

    #[test]
    fn test_markers_set_loop() {
        let track = vec![
            TrackEvent::note_on(10, 0, 60, 100),
            TrackEvent::marker(100, "loopStart"),
            TrackEvent::marker(900, "LoopEnd"),
            TrackEvent::note_off(1000, 0, 60),
        ];
        let seq = MidiSequence::new("loop", 96, vec![track]).unwrap();
        assert_eq!(seq.loop_region(), LoopRegion::new(100, 900));
    }

    #[test]
    fn test_cc111_sets_loop_start() {
        let track = vec![
            TrackEvent::note_on(0, 0, 60, 100),
            TrackEvent::control_change(240, 0, controller::LOOP_START, 0),
            TrackEvent::note_off(960, 0, 60),
        ];
        let seq = MidiSequence::new("rpg", 480, vec![track]).unwrap();
        assert_eq!(seq.loop_region().start, 240);
        assert_eq!(seq.loop_region().end, 960);
    }

    #[test]
    fn test_tracks_sorted_and_ports_inherited() {
        let conductor = vec![
            TrackEvent::new(0, MidiEvent::Meta(MetaEvent::MidiPort(1))),
            TrackEvent::tempo(0, 60.0),
        ];
        let notes = vec![TrackEvent::note_off(96, 2, 60), TrackEvent::note_on(0, 2, 60, 90)];
        let seq = MidiSequence::new("ports", 96, vec![conductor, notes]).unwrap();
        assert_eq!(seq.tracks()[1][0].ticks, 0);
        assert_eq!(seq.track_ports(), &[1, 1]);
        assert!(!seq.track_has_channels(0));
        assert!(seq.track_has_channels(1));
        assert_relative_eq!(seq.duration(), 1.0);
    }

    #[test]
    fn test_multi_port_detection() {
        let a = vec![
            TrackEvent::new(0, MidiEvent::Meta(MetaEvent::MidiPort(0))),
            TrackEvent::note_on(0, 0, 60, 90),
        ];
        let b = vec![
            TrackEvent::new(0, MidiEvent::Meta(MetaEvent::MidiPort(1))),
            TrackEvent::note_on(0, 0, 62, 90),
        ];
        let seq = MidiSequence::new("multi", 96, vec![a, b]).unwrap();
        assert!(seq.is_multi_port());
    }
}
