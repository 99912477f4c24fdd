//! Real-time two-channel tone engine for binaural and monaural beats.
//!
//! Two interchangeable block renderers run on the host's audio callback:
//! a dual-channel synthesizer and a jitter-buffered PCM player. Both are
//! driven by [`audio_engine::AudioEngine`], which drains commands sent
//! through an [`controller::EngineController`] before every block.

pub mod audio_engine;
pub mod audio_io;
pub mod command;
pub mod controller;
pub mod dsp;
pub mod jitter_buffer;
pub mod params;
pub mod pcm;
pub mod playback_engine;
pub mod settings;
pub mod synth_engine;

pub use audio_engine::{AudioEngine, BlockRenderer, Renderer, RendererKind};
pub use command::{AudioCommand, ControlError, ControlMessage};
pub use controller::{create_engine, EngineController};
pub use params::{BeatMode, FocusLevel, ParameterSnapshot, ParameterUpdate, Waveform};
