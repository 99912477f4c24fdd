// src/settings.rs

use crate::audio_engine::RendererKind;
use crate::controller::DEFAULT_COMMAND_CAPACITY;
use crate::jitter_buffer::DEFAULT_FILL_THRESHOLD;
use crate::synth_engine::MonauralCombine;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_ENV_VAR: &str = "BEATWAVE_SETTINGS";
const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    pub output_device: Option<String>,
    pub sample_rate: Option<u32>,
    pub buffer_size: Option<u32>,
    pub renderer: RendererKind,
    /// Feed the playback path from an in-process synthesized packet source.
    pub loopback_source: bool,
    pub command_queue_capacity: usize,
    pub jitter_fill_threshold: usize,
    pub monaural_combine: MonauralCombine,
    /// Seeds the focus "21" jitter for reproducible output.
    pub rng_seed: Option<u64>,
    /// A control message applied before the stream starts.
    pub initial: Option<serde_json::Value>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            output_device: None,
            sample_rate: None,
            buffer_size: None,
            renderer: RendererKind::Synthesis,
            loopback_source: false,
            command_queue_capacity: DEFAULT_COMMAND_CAPACITY,
            jitter_fill_threshold: DEFAULT_FILL_THRESHOLD,
            monaural_combine: MonauralCombine::Envelope,
            rng_seed: None,
            initial: None,
        }
    }
}

pub fn get_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "beatwave").map(|dirs| dirs.config_dir().to_path_buf())
}

/// `$BEATWAVE_SETTINGS` if set, otherwise `settings.json` in the config dir.
pub fn settings_path() -> Option<PathBuf> {
    if let Ok(path) = env::var(SETTINGS_ENV_VAR) {
        return Some(PathBuf::from(path));
    }
    get_config_dir().map(|dir| dir.join(SETTINGS_FILE_NAME))
}

pub fn load_settings() -> EngineSettings {
    match settings_path() {
        Some(path) => load_settings_from(&path),
        None => {
            log::warn!("Could not determine configuration directory, using default settings.");
            EngineSettings::default()
        }
    }
}

pub fn load_settings_from(path: &Path) -> EngineSettings {
    if !path.exists() {
        log::info!("No settings file at {}, using defaults.", path.display());
        return EngineSettings::default();
    }
    match fs::read_to_string(path) {
        Ok(json_string) => match serde_json::from_str(&json_string) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Failed to parse settings file, using defaults. Error: {}", e);
                EngineSettings::default()
            }
        },
        Err(e) => {
            log::warn!("Failed to read settings file, using defaults. Error: {}", e);
            EngineSettings::default()
        }
    }
}
