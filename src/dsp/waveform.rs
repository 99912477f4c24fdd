// src/dsp/waveform.rs

//! Stateless phase -> sample mapping for the four oscillator shapes.

use crate::params::Waveform;
use std::f64::consts::PI;

#[inline]
pub fn sine(phase: f64) -> f64 {
    phase.sin()
}

/// Sign of `sin(phase)`: -1, 0 or 1. Exact zeros of the sine stay at 0.
#[inline]
pub fn square(phase: f64) -> f64 {
    let s = phase.sin();
    if s > 0.0 {
        1.0
    } else if s < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[inline]
pub fn triangle(phase: f64) -> f64 {
    // sin() can overshoot 1.0 by an ulp on some platforms
    (2.0 / PI) * phase.sin().clamp(-1.0, 1.0).asin()
}

/// Ramp in [-1, 1). Euclidean remainder keeps negative phases in range.
#[inline]
pub fn sawtooth(phase: f64) -> f64 {
    (phase / PI).rem_euclid(2.0) - 1.0
}

#[inline]
pub fn evaluate(waveform: Waveform, phase: f64) -> f64 {
    match waveform {
        Waveform::Sine => sine(phase),
        Waveform::Square => square(phase),
        Waveform::Triangle => triangle(phase),
        Waveform::Sawtooth => sawtooth(phase),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    fn phases() -> impl Iterator<Item = f64> {
        (0..1000).map(|i| -TAU + i as f64 * (3.0 * TAU / 1000.0))
    }

    #[test]
    fn sine_is_plain_sin() {
        for p in phases() {
            assert_eq!(sine(p), p.sin());
        }
    }

    #[test]
    fn square_values() {
        assert_eq!(square(0.0), 0.0);
        assert_eq!(square(PI / 2.0), 1.0);
        assert_eq!(square(3.0 * PI / 2.0), -1.0);
        for p in phases() {
            let s = square(p);
            assert!(s == -1.0 || s == 0.0 || s == 1.0, "square out of set: {s}");
        }
    }

    #[test]
    fn triangle_range_and_peaks() {
        for p in phases() {
            let t = triangle(p);
            assert!((-1.0..=1.0).contains(&t), "triangle out of range: {t}");
        }
        assert!((triangle(PI / 2.0) - 1.0).abs() < 1e-9);
        assert!((triangle(PI / 4.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn sawtooth_range() {
        for p in phases() {
            let s = sawtooth(p);
            assert!((-1.0..1.0).contains(&s), "sawtooth out of range at {p}: {s}");
        }
        assert_eq!(sawtooth(0.0), -1.0);
        assert!(sawtooth(PI).abs() < 1e-12);
    }

    #[test]
    fn evaluate_dispatches() {
        let p = 1.234;
        assert_eq!(evaluate(Waveform::Sine, p), sine(p));
        assert_eq!(evaluate(Waveform::Square, p), square(p));
        assert_eq!(evaluate(Waveform::Triangle, p), triangle(p));
        assert_eq!(evaluate(Waveform::Sawtooth, p), sawtooth(p));
    }
}
