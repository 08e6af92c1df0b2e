//! Low-frequency oscillators for vibrato.

use std::f64::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LfoShape {
    /// SoundFont vibrato LFO.
    #[default]
    Triangle,
    /// NRPN channel vibrato.
    Sine,
}

/// Free-running LFO with an onset delay. Output is in [-1, 1].
#[derive(Debug, Clone, Copy, Default)]
pub struct Lfo {
    shape: LfoShape,
    frequency_hz: f64,
    delay: f64,
    elapsed: f64,
    phase: f64,
}

impl Lfo {
    pub fn new(shape: LfoShape, frequency_hz: f64, delay: f64) -> Self {
        Self {
            shape,
            frequency_hz: frequency_hz.max(0.0),
            delay: delay.max(0.0),
            elapsed: 0.0,
            phase: 0.0,
        }
    }

    /// Current output without advancing.
    pub fn value(&self) -> f64 {
        if self.elapsed < self.delay {
            return 0.0;
        }
        match self.shape {
            LfoShape::Triangle => triangle(self.phase),
            LfoShape::Sine => (self.phase * TAU).sin(),
        }
    }

    /// Advance by `dt` seconds and return the new output.
    pub fn advance(&mut self, dt: f64) -> f64 {
        let before = self.elapsed;
        self.elapsed += dt;
        if self.elapsed > self.delay {
            let running = self.elapsed - before.max(self.delay);
            self.phase = (self.phase + running * self.frequency_hz).fract();
        }
        self.value()
    }
}

/// Unipolar-phase triangle starting at zero and rising.
#[inline]
fn triangle(phase: f64) -> f64 {
    if phase < 0.25 {
        4.0 * phase
    } else if phase < 0.75 {
        2.0 - 4.0 * phase
    } else {
        4.0 * phase - 4.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_triangle_shape() {
        assert_relative_eq!(triangle(0.0), 0.0);
        assert_relative_eq!(triangle(0.25), 1.0);
        assert_relative_eq!(triangle(0.5), 0.0);
        assert_relative_eq!(triangle(0.75), -1.0);
    }

    #[test]
    fn test_delay_holds_zero() {
        let mut lfo = Lfo::new(LfoShape::Triangle, 5.0, 0.1);
        assert_eq!(lfo.advance(0.05), 0.0);
        // 0.05 s past the delay at 5 Hz is a quarter cycle.
        assert_relative_eq!(lfo.advance(0.1), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sine() {
        let mut lfo = Lfo::new(LfoShape::Sine, 1.0, 0.0);
        assert_relative_eq!(lfo.advance(0.25), 1.0, epsilon = 1e-9);
        assert_relative_eq!(lfo.advance(0.5), -1.0, epsilon = 1e-9);
    }
}
