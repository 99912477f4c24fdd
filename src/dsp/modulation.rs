// src/dsp/modulation.rs

//! The focus-level engine. Runs once per block, before phase accumulation,
//! and turns the base snapshot into the effective beat, phase shift and
//! amplitude used for that block.

use crate::params::{FocusLevel, ParameterSnapshot};
use rand::Rng;
use std::f64::consts::TAU;

const FOCUS_10_BEAT_HZ: f64 = 7.0;
const FOCUS_12_BEAT_HZ: f64 = 8.5;
const FOCUS_12_SWIRL_RATE_HZ: f64 = 0.05;
const FOCUS_12_SWIRL_DEPTH_DEG: f64 = 45.0;
const FOCUS_15_BEAT_HZ: f64 = 7.0;
const FOCUS_15_PULSE_RATE_HZ: f64 = 0.75;
const FOCUS_15_PULSE_DEPTH: f64 = 0.3;
/// Full width of the per-block beat jitter (±0.5 Hz).
const FOCUS_21_BEAT_SPREAD_HZ: f64 = 1.0;
/// Full width of the per-block phase jitter (±1°).
const FOCUS_21_PHASE_SPREAD_DEG: f64 = 2.0;

/// Slow modulation clocks. Monotonic; only reset by constructing a new state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModulationState {
    pub swirl_phase: f64,
    pub delta_phase: f64,
    /// Seconds rendered so far. Drives the monaural envelope.
    pub elapsed_time: f64,
}

impl ModulationState {
    #[inline]
    pub fn advance_clock(&mut self, block_duration: f64) {
        self.elapsed_time += block_duration;
    }
}

/// Per-block values after the focus preset has been applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveParams {
    pub beat_hz: f64,
    pub phase_shift_deg: f64,
    pub amplitude: f64,
}

/// Maps the snapshot through the active focus preset.
///
/// `block_duration` is `frames / sample_rate` for the current call. The
/// swirl and pulse clocks advance before they are read.
pub fn map_focus<R: Rng>(
    params: &ParameterSnapshot,
    state: &mut ModulationState,
    block_duration: f64,
    rng: &mut R,
) -> EffectiveParams {
    let mut out = EffectiveParams {
        beat_hz: params.beat_hz,
        phase_shift_deg: params.phase_shift_deg,
        amplitude: params.amplitude,
    };

    match params.focus_level {
        FocusLevel::None => {}
        FocusLevel::Focus10 => {
            out.beat_hz = FOCUS_10_BEAT_HZ;
        }
        FocusLevel::Focus12 => {
            state.swirl_phase += TAU * FOCUS_12_SWIRL_RATE_HZ * block_duration;
            out.beat_hz = FOCUS_12_BEAT_HZ;
            out.phase_shift_deg =
                params.phase_shift_deg + FOCUS_12_SWIRL_DEPTH_DEG * state.swirl_phase.sin();
        }
        FocusLevel::Focus15 => {
            state.delta_phase += TAU * FOCUS_15_PULSE_RATE_HZ * block_duration;
            out.beat_hz = FOCUS_15_BEAT_HZ;
            out.amplitude =
                params.amplitude * (1.0 + FOCUS_15_PULSE_DEPTH * state.delta_phase.sin());
        }
        FocusLevel::Focus21 => {
            // Redrawn every block, not smoothed.
            out.beat_hz = params.beat_hz + (rng.gen::<f64>() - 0.5) * FOCUS_21_BEAT_SPREAD_HZ;
            out.phase_shift_deg =
                params.phase_shift_deg + (rng.gen::<f64>() - 0.5) * FOCUS_21_PHASE_SPREAD_DEG;
        }
    }

    out
}
