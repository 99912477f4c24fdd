// src/synth_engine.rs

//! Dual-channel beat synthesizer.
//!
//! `render_block` is the whole algorithm: it takes an immutable parameter
//! snapshot and the owned `RenderState`, runs the focus mapper once, then
//! produces exactly one sample per frame on both channels. `SynthRenderer`
//! wraps it with the parameter mailbox and the random source so the audio
//! engine can drive it as a `BlockRenderer`.

use crate::audio_engine::BlockRenderer;
use crate::dsp::phase::{channel_frequencies, degrees_to_radians, phase_increment};
use crate::dsp::{map_focus, waveform, ModulationState, OnePoleLowpass, PhaseState};
use crate::params::{BeatMode, ParameterMailbox, ParameterSnapshot, ParameterUpdate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// How a monaural beat is folded into one tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonauralCombine {
    /// Single carrier tone amplitude-modulated by `0.5·(1 + sin(2π·beat·t))`.
    #[default]
    Envelope,
    /// Average of the two carrier tracks. Both run at the carrier frequency,
    /// so no beat is audible.
    #[deprecated(note = "flattens the beat; use MonauralCombine::Envelope")]
    Average,
}

/// Everything the synthesizer mutates between blocks.
#[derive(Debug, Clone, Default)]
pub struct RenderState {
    pub phase: PhaseState,
    pub filter: OnePoleLowpass,
    pub modulation: ModulationState,
}

/// Renders one block. Writes every frame of both channels.
pub fn render_block<R: Rng>(
    params: &ParameterSnapshot,
    state: &mut RenderState,
    combine: MonauralCombine,
    sample_rate: f64,
    rng: &mut R,
    left: &mut [f32],
    right: &mut [f32],
) {
    let frames = left.len().min(right.len());
    left[frames..].fill(0.0);
    right[frames..].fill(0.0);
    if frames == 0 {
        return;
    }

    let block_duration = frames as f64 / sample_rate;
    let effective = map_focus(params, &mut state.modulation, block_duration, rng);

    let (freq_left, freq_right) =
        channel_frequencies(params.mode, params.carrier_hz, effective.beat_hz);
    let inc_left = phase_increment(freq_left, sample_rate);
    let inc_right = phase_increment(freq_right, sample_rate);
    let phase_offset = degrees_to_radians(effective.phase_shift_deg);
    let amplitude = effective.amplitude;
    let beat_hz = effective.beat_hz;
    let start_time = state.modulation.elapsed_time;
    let filter_enabled = state.filter.prepare(params.filter_cutoff_hz, sample_rate);

    for i in 0..frames {
        let phase = state.phase;
        let left_base = waveform::evaluate(params.waveform, phase.phase1);

        let (mut l, mut r) = match params.mode {
            BeatMode::Binaural => {
                let right_base = waveform::evaluate(params.waveform, phase.phase2 + phase_offset);
                (left_base * amplitude, right_base * amplitude)
            }
            BeatMode::Monaural => {
                #[allow(deprecated)]
                let mono = match combine {
                    MonauralCombine::Envelope => {
                        let t = start_time + i as f64 / sample_rate;
                        let envelope = 0.5 * (1.0 + (TAU * beat_hz * t).sin());
                        left_base * envelope * amplitude
                    }
                    MonauralCombine::Average => {
                        let right_base =
                            waveform::evaluate(params.waveform, phase.phase2 + phase_offset);
                        0.5 * (left_base + right_base) * amplitude
                    }
                };
                (mono, mono)
            }
        };

        if filter_enabled {
            (l, r) = state.filter.process(l, r);
        }

        left[i] = l as f32;
        right[i] = r as f32;

        state.phase.advance(inc_left, inc_right);
    }

    state.modulation.advance_clock(block_duration);
}

/// The synthesis path as seen by the audio engine.
pub struct SynthRenderer<R: Rng = StdRng> {
    mailbox: ParameterMailbox,
    state: RenderState,
    rng: R,
    sample_rate: f64,
    monaural_combine: MonauralCombine,
}

impl SynthRenderer<StdRng> {
    pub fn new(sample_rate: f32) -> Self {
        Self::with_rng(sample_rate, StdRng::from_entropy())
    }

    pub fn with_seed(sample_rate: f32, seed: u64) -> Self {
        Self::with_rng(sample_rate, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> SynthRenderer<R> {
    pub fn with_rng(sample_rate: f32, rng: R) -> Self {
        Self {
            mailbox: ParameterMailbox::default(),
            state: RenderState::default(),
            rng,
            // a zero rate would turn every increment into inf
            sample_rate: f64::from(sample_rate).max(1.0),
            monaural_combine: MonauralCombine::default(),
        }
    }

    pub fn set_monaural_combine(&mut self, combine: MonauralCombine) {
        self.monaural_combine = combine;
    }

    pub fn receive(&mut self, update: &ParameterUpdate) {
        self.mailbox.receive(update);
    }

    pub fn snapshot(&self) -> ParameterSnapshot {
        self.mailbox.snapshot()
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

impl<R: Rng + Send> BlockRenderer for SynthRenderer<R> {
    fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        let params = self.mailbox.snapshot();
        render_block(
            &params,
            &mut self.state,
            self.monaural_combine,
            self.sample_rate,
            &mut self.rng,
            left,
            right,
        );
    }
}
