//! Per-key overrides: velocity, patch and gain for one (channel, key).

use serde::{Deserialize, Serialize};

/// Override applied to every note-on of one key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyModifier {
    /// Replace the note velocity.
    pub velocity: Option<u8>,
    /// Play this (bank, program) instead of the channel preset.
    pub patch: Option<(u16, u8)>,
    /// Linear gain applied to the voices.
    pub gain: f64,
}

impl Default for KeyModifier {
    fn default() -> Self {
        Self {
            velocity: None,
            patch: None,
            gain: 1.0,
        }
    }
}

impl KeyModifier {
    pub fn with_velocity(mut self, velocity: u8) -> Self {
        self.velocity = Some(velocity.min(127));
        self
    }

    pub fn with_patch(mut self, bank: u16, program: u8) -> Self {
        self.patch = Some((bank, program));
        self
    }

    pub fn with_gain(mut self, gain: f64) -> Self {
        self.gain = gain;
        self
    }
}

/// A stored mapping, as exported into snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyMapping {
    pub channel: usize,
    pub key: u8,
    pub modifier: KeyModifier,
}

/// Fixed table of modifiers, one slot per (channel, key).
///
/// Sized once for the maximum channel count so adding a mapping from the
/// render thread never allocates.
#[derive(Debug, Clone)]
pub struct KeyModifierManager {
    table: Vec<[Option<KeyModifier>; 128]>,
}

impl KeyModifierManager {
    pub fn new(max_channels: usize) -> Self {
        Self {
            table: vec![[None; 128]; max_channels],
        }
    }

    pub fn add(&mut self, channel: usize, key: u8, modifier: KeyModifier) {
        if let Some(slot) = self.slot_mut(channel, key) {
            *slot = Some(modifier);
        }
    }

    pub fn remove(&mut self, channel: usize, key: u8) {
        if let Some(slot) = self.slot_mut(channel, key) {
            *slot = None;
        }
    }

    pub fn clear(&mut self) {
        for channel in &mut self.table {
            channel.fill(None);
        }
    }

    #[inline]
    pub fn get(&self, channel: usize, key: u8) -> Option<&KeyModifier> {
        self.table
            .get(channel)
            .and_then(|keys| keys.get(key as usize))
            .and_then(Option::as_ref)
    }

    /// Override velocity, if any.
    #[inline]
    pub fn velocity(&self, channel: usize, key: u8) -> Option<u8> {
        self.get(channel, key).and_then(|modifier| modifier.velocity)
    }

    /// Voice gain; 1.0 without a mapping.
    #[inline]
    pub fn gain(&self, channel: usize, key: u8) -> f64 {
        self.get(channel, key).map_or(1.0, |modifier| modifier.gain)
    }

    #[inline]
    pub fn patch(&self, channel: usize, key: u8) -> Option<(u16, u8)> {
        self.get(channel, key).and_then(|modifier| modifier.patch)
    }

    /// Every stored mapping.
    pub fn mappings(&self) -> Vec<KeyMapping> {
        self.table
            .iter()
            .enumerate()
            .flat_map(|(channel, keys)| {
                keys.iter().enumerate().filter_map(move |(key, modifier)| {
                    modifier.map(|modifier| KeyMapping {
                        channel,
                        key: key as u8,
                        modifier,
                    })
                })
            })
            .collect()
    }

    fn slot_mut(&mut self, channel: usize, key: u8) -> Option<&mut Option<KeyModifier>> {
        self.table
            .get_mut(channel)
            .and_then(|keys| keys.get_mut(key as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_query() {
        let mut manager = KeyModifierManager::new(16);
        manager.add(
            3,
            60,
            KeyModifier::default().with_velocity(100).with_gain(0.5),
        );
        assert_eq!(manager.velocity(3, 60), Some(100));
        assert_eq!(manager.gain(3, 60), 0.5);
        assert_eq!(manager.velocity(3, 61), None);
        assert_eq!(manager.gain(4, 60), 1.0);
    }

    #[test]
    fn test_out_of_range_channel_ignored() {
        let mut manager = KeyModifierManager::new(16);
        manager.add(40, 60, KeyModifier::default().with_velocity(1));
        assert!(manager.get(40, 60).is_none());
        assert!(manager.mappings().is_empty());
    }

    #[test]
    fn test_mappings_and_remove() {
        let mut manager = KeyModifierManager::new(16);
        manager.add(0, 36, KeyModifier::default().with_patch(128, 25));
        manager.add(9, 42, KeyModifier::default());
        assert_eq!(manager.mappings().len(), 2);
        assert_eq!(manager.patch(0, 36), Some((128, 25)));
        manager.remove(0, 36);
        assert_eq!(manager.mappings().len(), 1);
        manager.clear();
        assert!(manager.mappings().is_empty());
    }
}
