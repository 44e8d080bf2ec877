//! Pipeline settings
//!
//! Persisted as JSON. Looked up at `<config_dir>/flac-batch/settings.json`
//! unless a path is given explicitly. Every field has a default so partial
//! files are fine.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PipelineError, Result};

/// Which backend reports the duration of a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProbeBackend {
    /// Parse `Duration:` from ffmpeg's diagnostic output
    #[default]
    Ffmpeg,
    /// Read the container in-process with symphonia
    Native,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Where uploads are staged
    pub temp_dir: PathBuf,
    /// Where derivatives and the download archive go (defaults to `<temp_dir>/output`)
    pub output_dir: Option<PathBuf>,
    pub ffmpeg_path: PathBuf,
    pub mp3gain_path: PathBuf,
    /// Upper bound on any single external tool run
    pub tool_timeout_secs: u64,
    pub probe: ProbeBackend,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir().join("flac_to_mp3"),
            output_dir: None,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            mp3gain_path: PathBuf::from("mp3gain"),
            tool_timeout_secs: 600,
            probe: ProbeBackend::default(),
        }
    }
}

impl PipelineSettings {
    const SETTINGS_FILE: &'static str = "settings.json";

    /// Default settings file location, if a config dir exists on this platform
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("flac-batch").join(Self::SETTINGS_FILE))
    }

    /// Load settings
    ///
    /// An explicit path must exist and parse. Without one, the default
    /// location is used if present, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(p) => Self::load_from(p)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(p) => Self::load_from(&p)?,
                None => {
                    log::debug!("No settings file found, using defaults");
                    Self::default()
                }
            },
        };
        settings.validate()?;
        Ok(settings)
    }

    fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let settings = serde_json::from_str(&contents).map_err(|e| {
            PipelineError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        log::debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::Config(format!("failed to serialize settings: {}", e)))?;
        std::fs::write(path, json)?;
        log::debug!("Saved settings to {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.tool_timeout_secs == 0 {
            return Err(PipelineError::Config(
                "tool_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.temp_dir.as_os_str().is_empty() {
            return Err(PipelineError::Config("temp_dir must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.temp_dir.join("output"))
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}
