// src/command.rs

//! Messages crossing from the control path to the render thread.

use crate::jitter_buffer::AudioChunk;
use crate::params::{BeatMode, FocusLevel, ParameterUpdate, Waveform};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Debug)]
pub enum AudioCommand {
    UpdateParams(ParameterUpdate),
    PushChunk(AudioChunk),
    /// Advisory. Raises the stop flag; rendering continues until the host
    /// tears the stream down.
    Stop,
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("invalid control message: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("command queue full, command dropped")]
    QueueFull(AudioCommand),
    #[error("command queue has room for {free} of {needed} commands, message not sent")]
    NoRoom { needed: usize, free: usize },
    #[error("empty PCM packet")]
    EmptyPacket,
}

/// The JSON control message as sent by a UI or network client.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ControlMessage {
    pub carrier: Option<f64>,
    pub beat: Option<f64>,
    pub phase_shift: Option<f64>,
    pub amplitude: Option<f64>,
    pub waveform: Option<String>,
    pub mode: Option<String>,
    /// `null` disables the filter, absence keeps the current cutoff.
    #[serde(deserialize_with = "present_or_null")]
    pub filter_cutoff: Option<Option<f64>>,
    pub focus_level: Option<String>,
    pub command: Option<String>,
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}

impl ControlMessage {
    pub fn from_json(text: &str) -> Result<Self, ControlError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn parameter_update(&self) -> ParameterUpdate {
        ParameterUpdate {
            carrier_hz: self.carrier,
            beat_hz: self.beat,
            phase_shift_deg: self.phase_shift,
            amplitude: self.amplitude,
            waveform: self.waveform.as_deref().map(Waveform::from_name),
            mode: self.mode.as_deref().map(BeatMode::from_name),
            filter_cutoff_hz: self.filter_cutoff,
            focus_level: self.focus_level.as_deref().map(FocusLevel::from_name),
        }
    }

    /// Parameter fields first, then the command, preserving message order.
    /// Unrecognised command strings are logged and skipped.
    pub fn into_commands(self) -> Vec<AudioCommand> {
        let mut commands = Vec::with_capacity(2);
        let update = self.parameter_update();
        if !update.is_empty() {
            commands.push(AudioCommand::UpdateParams(update));
        }
        match self.command.as_deref() {
            Some("stop") => commands.push(AudioCommand::Stop),
            Some(other) => log::warn!("Ignoring unknown control command {:?}", other),
            None => {}
        }
        commands
    }
}
