use ::config::{Config as Layers, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::command::{EncodeSettings, MixSettings, MotionSettings};

pub const CONFIG_PATH_ENV: &str = "RENDER_CONFIG";
const WORK_DIR_ENV: &str = "RENDER_WORK_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub api_secret: String,
    pub work_dir: PathBuf,
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
    pub narration_gain: f64,
    pub background_gain: f64,
    pub motion_effects: bool,
    pub tool_timeout_secs: u64,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 3000,
            api_secret: "admin".to_string(),
            work_dir: std::env::temp_dir(),
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
            narration_gain: 1.0,
            background_gain: 0.3,
            motion_effects: false,
            tool_timeout_secs: 600,
            max_upload_bytes: 512 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] ::config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Process environment, skipping variables that are not valid UTF-8.
pub fn process_env() -> HashMap<String, String> {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

impl Config {
    /// Precedence: defaults, then the JSON file named by `RENDER_CONFIG`, then
    /// the process environment.
    pub fn resolve() -> Result<Self, LoadError> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        Self::load(path.as_deref(), process_env())
    }

    /// Layers `file` (required when given) and `env` over the defaults.
    ///
    /// Variables map onto fields by lowercased name (`PORT` -> `port`), except
    /// `RENDER_WORK_DIR` which sets `work_dir`. Empty values count as unset.
    pub fn load(file: Option<&Path>, env: HashMap<String, String>) -> Result<Self, LoadError> {
        let mut builder = Layers::builder();

        if let Some(path) = file {
            builder = builder.add_source(
                File::from(path)
                    .format(FileFormat::Json)
                    .required(true),
            );
        }

        let work_dir = env.get(WORK_DIR_ENV).filter(|v| !v.is_empty()).cloned();
        builder = builder
            .add_source(Environment::default().ignore_empty(true).source(Some(env)))
            .set_override_option("work_dir", work_dir)?;

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        if self.api_secret.is_empty() {
            return Err(LoadError::invalid("api_secret", "must not be empty"));
        }
        for (key, gain) in [
            ("narration_gain", self.narration_gain),
            ("background_gain", self.background_gain),
        ] {
            if !gain.is_finite() || gain < 0.0 {
                return Err(LoadError::invalid(
                    key,
                    format!("must be a non-negative number, got {gain}"),
                ));
            }
        }
        if self.tool_timeout_secs == 0 {
            return Err(LoadError::invalid("tool_timeout_secs", "must be greater than zero"));
        }
        if self.max_upload_bytes == 0 {
            return Err(LoadError::invalid("max_upload_bytes", "must be greater than zero"));
        }
        Ok(())
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            mix: MixSettings {
                narration_gain: self.narration_gain,
                background_gain: self.background_gain,
            },
            motion: MotionSettings {
                enabled: self.motion_effects,
                ..MotionSettings::default()
            },
            ..EncodeSettings::default()
        }
    }
}
