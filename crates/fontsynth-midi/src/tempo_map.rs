//! Tick to seconds conversion over a MIDI tempo map.
//!
//! Tempo changes are stored latest-first. Converting a tick position walks
//! backwards: find the latest change strictly before the remaining ticks,
//! add that segment's duration, continue from the change's tick.

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_BPM: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoChange {
    pub ticks: u64,
    pub bpm: f64,
}

impl TempoChange {
    pub const fn new(ticks: u64, bpm: f64) -> Self {
        Self { ticks, bpm }
    }

    /// From a Set Tempo meta value. `None` for a zero tempo.
    pub fn from_micros(ticks: u64, micros_per_quarter: u32) -> Option<Self> {
        if micros_per_quarter == 0 {
            return None;
        }
        Some(Self::new(ticks, 60_000_000.0 / micros_per_quarter as f64))
    }
}

/// Seconds per tick at a tempo.
#[inline]
pub fn seconds_per_tick(bpm: f64, time_division: u16) -> f64 {
    60.0 / (bpm * time_division as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoMap {
    /// Sorted by descending tick; the last entry is always at tick 0.
    changes: Vec<TempoChange>,
    time_division: u16,
}

impl TempoMap {
    /// Build a map from changes in any order.
    ///
    /// Non-finite or non-positive tempos are dropped. A 120 BPM entry at
    /// tick 0 is added when the changes do not start there. Of several
    /// changes on the same tick the one given last wins.
    pub fn new(time_division: u16, changes: impl IntoIterator<Item = TempoChange>) -> Self {
        let mut changes: Vec<TempoChange> = changes
            .into_iter()
            .filter(|change| {
                let valid = change.bpm.is_finite() && change.bpm > 0.0;
                if !valid {
                    warn!(
                        "Ignoring invalid tempo {} at tick {}",
                        change.bpm, change.ticks
                    );
                }
                valid
            })
            .collect();

        changes.sort_by_key(|change| change.ticks);
        // Keep the last change of each tick.
        changes.reverse();
        changes.dedup_by_key(|change| change.ticks);

        if changes.last().map_or(true, |change| change.ticks != 0) {
            changes.push(TempoChange::new(0, DEFAULT_BPM));
        }

        Self {
            changes,
            time_division,
        }
    }

    /// A constant-tempo map.
    pub fn constant(time_division: u16, bpm: f64) -> Self {
        Self::new(time_division, [TempoChange::new(0, bpm)])
    }

    #[inline]
    pub fn time_division(&self) -> u16 {
        self.time_division
    }

    /// Changes, latest first.
    #[inline]
    pub fn changes(&self) -> &[TempoChange] {
        &self.changes
    }

    /// Tempo in effect at `ticks`.
    pub fn bpm_at(&self, ticks: u64) -> f64 {
        self.changes
            .iter()
            .find(|change| change.ticks <= ticks)
            .map_or(DEFAULT_BPM, |change| change.bpm)
    }

    /// Absolute time of a tick position.
    pub fn ticks_to_seconds(&self, ticks: u64) -> f64 {
        let division = self.time_division as f64;
        let mut remaining = ticks;
        let mut seconds = 0.0;
        while remaining > 0 {
            let Some(change) = self.changes.iter().find(|c| c.ticks < remaining) else {
                break;
            };
            seconds += (remaining - change.ticks) as f64 * 60.0 / (change.bpm * division);
            remaining = change.ticks;
        }
        seconds
    }

    /// Inverse of [`ticks_to_seconds`](Self::ticks_to_seconds), rounded down.
    pub fn seconds_to_ticks(&self, seconds: f64) -> u64 {
        if seconds <= 0.0 {
            return 0;
        }
        // Walk forward: oldest change first.
        let mut elapsed = 0.0;
        for (i, change) in self.changes.iter().enumerate().rev() {
            let per_tick = seconds_per_tick(change.bpm, self.time_division);
            let segment_end = if i == 0 {
                None
            } else {
                Some(self.changes[i - 1].ticks)
            };
            match segment_end {
                Some(end) => {
                    let segment = (end - change.ticks) as f64 * per_tick;
                    if elapsed + segment > seconds {
                        return change.ticks + whole_ticks(seconds - elapsed, per_tick);
                    }
                    elapsed += segment;
                }
                None => return change.ticks + whole_ticks(seconds - elapsed, per_tick),
            }
        }
        0
    }
}

/// Whole ticks in `seconds`, tolerant of rounding just below an integer.
#[inline]
fn whole_ticks(seconds: f64, per_tick: f64) -> u64 {
    (seconds / per_tick + 1e-9).floor() as u64
}
