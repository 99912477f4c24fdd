// src/dsp/phase.rs

//! Per-channel phase accumulation and the carrier/beat frequency split.

use crate::params::BeatMode;
use std::f64::consts::{PI, TAU};

/// Running oscillator phases for the two channels, both kept in [0, 2π).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseState {
    pub phase1: f64,
    pub phase2: f64,
}

impl PhaseState {
    /// Advances both phases by one sample and wraps them.
    #[inline]
    pub fn advance(&mut self, inc_left: f64, inc_right: f64) {
        self.phase1 = wrap_phase(self.phase1 + inc_left);
        self.phase2 = wrap_phase(self.phase2 + inc_right);
    }
}

/// Brings `phase` back into [0, 2π). Increments are normally far below 2π so
/// a single subtraction suffices; the fallback covers huge or negative
/// frequencies passed through unvalidated.
#[inline]
pub fn wrap_phase(phase: f64) -> f64 {
    if (0.0..TAU).contains(&phase) {
        return phase;
    }
    if phase >= TAU && phase < 2.0 * TAU {
        return phase - TAU;
    }
    if !phase.is_finite() {
        return 0.0;
    }
    let wrapped = phase.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Returns `(freq_left, freq_right)` in Hz.
#[inline]
pub fn channel_frequencies(mode: BeatMode, carrier_hz: f64, beat_hz: f64) -> (f64, f64) {
    match mode {
        BeatMode::Binaural => (carrier_hz - beat_hz / 2.0, carrier_hz + beat_hz / 2.0),
        BeatMode::Monaural => (carrier_hz, carrier_hz),
    }
}

#[inline]
pub fn phase_increment(freq_hz: f64, sample_rate: f64) -> f64 {
    TAU * freq_hz / sample_rate
}

#[inline]
pub fn degrees_to_radians(deg: f64) -> f64 {
    deg * PI / 180.0
}
