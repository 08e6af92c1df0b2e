//! Unit conversions shared by the resolver, envelope and voice.

/// EMU hardware applied only 40% of the nominal attenuation.
pub const EMU_ATTENUATION_CORRECTION: f64 = 0.4;

/// Below this linear gain a voice is treated as silent.
pub const MIN_AUDIBLE_GAIN: f64 = 1e-6;

/// Hard cap on the volume envelope release.
pub const MAX_RELEASE_SECONDS: f64 = 5.0;

/// Frequency of absolute cents 0 (SoundFont LFO reference).
pub const ABSOLUTE_CENTS_BASE_HZ: f64 = 8.176;

#[inline]
pub fn timecents_to_seconds(timecents: f64) -> f64 {
    (timecents / 1200.0).exp2()
}

#[inline]
pub fn seconds_to_timecents(seconds: f64) -> f64 {
    1200.0 * seconds.log2()
}

/// Attenuation in dB to linear gain.
#[inline]
pub fn decibel_attenuation_to_gain(decibels: f64) -> f64 {
    10f64.powf(-decibels / 20.0)
}

/// Linear gain to attenuation in dB.
#[inline]
pub fn gain_to_decibel_attenuation(gain: f64) -> f64 {
    -20.0 * gain.log10()
}

#[inline]
pub fn cents_to_ratio(cents: f64) -> f64 {
    (cents / 1200.0).exp2()
}

#[inline]
pub fn absolute_cents_to_hz(cents: f64) -> f64 {
    ABSOLUTE_CENTS_BASE_HZ * cents_to_ratio(cents)
}

/// Portamento time for a CC 5 value over a key distance.
///
/// The table is a set of hardware measurements; values in between are
/// interpolated linearly. A 30 key glide takes the table time.
pub fn portamento_seconds(time: u8, distance: u8) -> f64 {
    const TABLE: [(u8, f64); 15] = [
        (0, 0.0),
        (1, 0.006),
        (2, 0.023),
        (4, 0.050),
        (8, 0.110),
        (16, 0.250),
        (32, 0.500),
        (64, 2.060),
        (80, 4.200),
        (96, 8.400),
        (112, 19.500),
        (116, 26.700),
        (120, 40.000),
        (124, 80.000),
        (127, 480.000),
    ];
    let time = time.min(127);
    let base = TABLE
        .windows(2)
        .find(|pair| time >= pair[0].0 && time <= pair[1].0)
        .map_or(0.0, |pair| {
            let (lo, lo_s) = pair[0];
            let (hi, hi_s) = pair[1];
            lo_s + (time - lo) as f64 * (hi_s - lo_s) / (hi - lo) as f64
        });
    base * distance as f64 / 30.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_timecents() {
        assert_relative_eq!(timecents_to_seconds(0.0), 1.0);
        assert_relative_eq!(timecents_to_seconds(1200.0), 2.0);
        assert_relative_eq!(timecents_to_seconds(-1200.0), 0.5);
        assert_relative_eq!(seconds_to_timecents(4.0), 2400.0);
    }

    #[test]
    fn test_attenuation() {
        assert_relative_eq!(decibel_attenuation_to_gain(0.0), 1.0);
        assert_relative_eq!(decibel_attenuation_to_gain(20.0), 0.1);
        assert_relative_eq!(gain_to_decibel_attenuation(0.01), 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_portamento_table() {
        assert_relative_eq!(portamento_seconds(32, 30), 0.5);
        assert_relative_eq!(portamento_seconds(0, 12), 0.0);
        // Halfway between 64 and 80.
        assert_relative_eq!(portamento_seconds(72, 30), 3.13, epsilon = 1e-9);
        assert_relative_eq!(portamento_seconds(127, 15), 240.0);
    }
}
