// src/settings.rs

use crate::fx_components::ReverbParams;
use crate::sample_store::DEFAULT_MAX_SAMPLE_LENGTH_SECS;
use crate::sampler_engine::NUM_VOICES;
use crate::synth::EnvelopeSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Room shape of the output reverb. Wet and dry levels are live controls and
/// are not stored here.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ReverbSettings {
    pub room_size: f32,
    pub damping: f32,
    pub width: f32,
}

impl Default for ReverbSettings {
    fn default() -> Self {
        let params = ReverbParams::default();
        Self {
            room_size: params.room_size,
            damping: params.damping,
            width: params.width,
        }
    }
}

impl ReverbSettings {
    pub fn to_params(self) -> ReverbParams {
        ReverbParams {
            room_size: self.room_size,
            damping: self.damping,
            width: self.width,
            ..ReverbParams::default()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    /// Directory holding C.wav through B.wav.
    pub sample_dir: Option<PathBuf>,
    pub voices_per_key: usize,
    pub envelope: EnvelopeSettings,
    /// Longer samples are cut. `None` keeps the whole file.
    pub max_sample_length_secs: Option<f32>,
    pub reverb: ReverbSettings,
    /// Number of device input channels mixed under the instrument output.
    pub input_channels: usize,
    pub output_device: Option<String>,
    pub sample_rate: Option<u32>,
    pub buffer_size: Option<u32>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_dir: None,
            voices_per_key: NUM_VOICES,
            envelope: EnvelopeSettings::default(),
            max_sample_length_secs: Some(DEFAULT_MAX_SAMPLE_LENGTH_SECS),
            reverb: ReverbSettings::default(),
            input_channels: 0,
            output_device: None,
            sample_rate: None,
            buffer_size: None,
        }
    }
}

/// Settings directory next to the executable, created on demand.
pub fn get_config_dir() -> Option<PathBuf> {
    let exe_path = match env::current_exe() {
        Ok(path) => path,
        Err(e) => {
            warn!("Could not determine application directory: {}", e);
            return None;
        }
    };
    let dir = exe_path.parent()?.join("AppSettings");
    if !dir.exists() {
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!("Failed to create directory at {}: {}", dir.display(), e);
            return None;
        }
    }
    Some(dir)
}

pub fn default_settings_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(SETTINGS_FILE_NAME))
}

pub fn save_settings(path: &Path, settings: &EngineSettings) -> Result<()> {
    let json_string =
        serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;
    fs::write(path, json_string)
        .with_context(|| format!("Failed to write settings to {}", path.display()))?;
    debug!("Saved settings to {}", path.display());
    Ok(())
}

/// Reads settings from `path`. A missing file gives the defaults; an
/// unreadable or malformed one gives the defaults with a warning.
pub fn load_settings(path: &Path) -> EngineSettings {
    if !path.exists() {
        debug!("No settings at {}, using defaults", path.display());
        return EngineSettings::default();
    }
    match fs::read_to_string(path) {
        Ok(json_string) => match serde_json::from_str(&json_string) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to parse settings file, using defaults. Error: {}", e);
                EngineSettings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read settings file, using defaults. Error: {}", e);
            EngineSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        let settings = EngineSettings {
            sample_dir: Some(PathBuf::from("/samples")),
            voices_per_key: 4,
            envelope: EnvelopeSettings {
                attack: 0.0,
                release: 0.25,
            },
            max_sample_length_secs: None,
            input_channels: 2,
            sample_rate: Some(48000),
            ..EngineSettings::default()
        };
        save_settings(&path, &settings).unwrap();
        assert_eq!(load_settings(&path), settings);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, r#"{ "voices_per_key": 3, "reverb": { "width": 1.0 } }"#).unwrap();

        let settings = load_settings(&path);
        assert_eq!(settings.voices_per_key, 3);
        assert_eq!(settings.reverb.width, 1.0);
        assert_eq!(settings.reverb.room_size, ReverbSettings::default().room_size);
        assert_eq!(settings.envelope, EnvelopeSettings::default());
        assert_eq!(settings.max_sample_length_secs, Some(6.0));
    }

    #[test]
    fn bad_or_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            load_settings(&dir.path().join("absent.json")),
            EngineSettings::default()
        );

        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, "not json").unwrap();
        assert_eq!(load_settings(&path), EngineSettings::default());
    }

    #[test]
    fn reverb_settings_keep_live_levels_at_default() {
        let params = ReverbSettings {
            room_size: 0.2,
            damping: 0.3,
            width: 0.4,
        }
        .to_params();
        assert_eq!(params.room_size, 0.2);
        assert_eq!(params.wet_level, 0.0);
        assert_eq!(params.dry_level, 1.0);
    }
}
