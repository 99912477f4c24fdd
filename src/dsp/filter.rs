// src/dsp/filter.rs

//! One-pole lowpass used to soften the synthesized tones.
//! `y[n] = y[n-1] + α·(x[n] - y[n-1])` with `α = dt / (RC + dt)`.

use std::f64::consts::TAU;

#[inline]
pub fn one_pole_alpha(cutoff_hz: f64, sample_rate: f64) -> f64 {
    let dt = 1.0 / sample_rate;
    let rc = 1.0 / (TAU * cutoff_hz);
    dt / (rc + dt)
}

/// Filter memory for both channels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterState {
    pub y_left: f64,
    pub y_right: f64,
}

/// Stereo one-pole lowpass with the coefficient cached per block.
#[derive(Debug, Clone, Default)]
pub struct OnePoleLowpass {
    pub state: FilterState,
    cached_cutoff: Option<f64>,
    alpha: f64,
}

impl OnePoleLowpass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once per block. Returns `false` when the filter is bypassed.
    /// α is only recomputed when the cutoff changes.
    pub fn prepare(&mut self, cutoff_hz: Option<f64>, sample_rate: f64) -> bool {
        let cutoff = match cutoff_hz {
            Some(c) if c > 0.0 && c.is_finite() => c,
            _ => return false,
        };
        if self.cached_cutoff != Some(cutoff) {
            self.alpha = one_pole_alpha(cutoff, sample_rate);
            self.cached_cutoff = Some(cutoff);
        }
        true
    }

    #[inline]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    #[inline]
    pub fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        let s = &mut self.state;
        s.y_left += self.alpha * (left - s.y_left);
        s.y_right += self.alpha * (right - s.y_right);
        (s.y_left, s.y_right)
    }
}
