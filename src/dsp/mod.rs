// src/dsp/mod.rs

pub mod filter;
pub mod modulation;
pub mod phase;
pub mod waveform;

pub use filter::{FilterState, OnePoleLowpass};
pub use modulation::{map_focus, EffectiveParams, ModulationState};
pub use phase::PhaseState;
