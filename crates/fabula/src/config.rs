//! Server configuration.
//!
//! Built once at startup from, lowest priority first: built-in defaults,
//! `fabula.toml`, environment variables (including `.env`), CLI flags.
//! Environment and flags arrive together through clap's `env` support.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use fabula_core::{SessionLimits, StoryConfig};
use fabula_model::RetryPolicy;

/// The config file name
pub const CONFIG_FILE_NAME: &str = "fabula.toml";

/// Settings read from `fabula.toml`. Every field is optional.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_retries: Option<usize>,
    pub retry_delay_secs: Option<u64>,
    pub max_story_parts: Option<usize>,
    pub stories_dir: Option<PathBuf>,
    pub speech_speed: Option<f32>,
    pub bind: Option<String>,
    pub recent_capacity: Option<usize>,
    pub max_sessions: Option<usize>,
    pub session_idle_secs: Option<u64>,
}

impl FileConfig {
    /// Load a config file.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if the file exists and parses
    /// - `Ok(None)` if it does not exist
    /// - `Err(...)` if it exists but fails to parse
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(Some(config))
    }
}

/// Values that beat the config file (environment or command line)
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub stories_dir: Option<PathBuf>,
    pub bind: Option<String>,
    pub max_story_parts: Option<usize>,
}

/// Effective, immutable server configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_retries: usize,
    pub retry_delay: Duration,
    pub max_story_parts: usize,
    pub stories_dir: PathBuf,
    pub speech_speed: f32,
    pub bind: String,
    pub recent_capacity: usize,
    pub max_sessions: usize,
    pub session_idle: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.7,
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            max_story_parts: 10,
            stories_dir: default_stories_dir(),
            speech_speed: 1.15,
            bind: "127.0.0.1:5000".to_string(),
            recent_capacity: 5,
            max_sessions: 1000,
            session_idle: Duration::from_secs(60 * 60),
        }
    }
}

fn default_stories_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("fabula").join("stories"))
        .unwrap_or_else(|| PathBuf::from("stories"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppConfig {
    /// Read the config file (explicit path, or `fabula.toml` in the working directory) and apply overrides
    pub fn load(config_path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let file = match config_path {
            Some(path) => Some(
                FileConfig::load(path)?
                    .with_context(|| format!("Config file {} not found", path.display()))?,
            ),
            None => FileConfig::load(Path::new(CONFIG_FILE_NAME))?,
        };
        Self::resolve(file.unwrap_or_default(), overrides)
    }

    /// Layer `file` then `overrides` over the defaults and validate the result
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            api_key: non_blank(overrides.api_key).or(non_blank(file.api_key)),
            model: non_blank(overrides.model)
                .or(non_blank(file.model))
                .unwrap_or(defaults.model),
            temperature: file.temperature.unwrap_or(defaults.temperature),
            max_retries: file.max_retries.unwrap_or(defaults.max_retries),
            retry_delay: file
                .retry_delay_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry_delay),
            max_story_parts: overrides
                .max_story_parts
                .or(file.max_story_parts)
                .unwrap_or(defaults.max_story_parts),
            stories_dir: overrides
                .stories_dir
                .or(file.stories_dir)
                .unwrap_or(defaults.stories_dir),
            speech_speed: file.speech_speed.unwrap_or(defaults.speech_speed),
            bind: non_blank(overrides.bind)
                .or(non_blank(file.bind))
                .unwrap_or(defaults.bind),
            recent_capacity: file.recent_capacity.unwrap_or(defaults.recent_capacity),
            max_sessions: file.max_sessions.unwrap_or(defaults.max_sessions),
            session_idle: file
                .session_idle_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_idle),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            bail!("temperature must be between 0.0 and 2.0, got {}", self.temperature);
        }
        if self.max_retries == 0 {
            bail!("max_retries must be at least 1");
        }
        if self.max_story_parts < 2 {
            bail!("max_story_parts must be at least 2, got {}", self.max_story_parts);
        }
        if self.max_sessions == 0 {
            bail!("max_sessions must be at least 1");
        }
        if self.session_idle.is_zero() {
            bail!("session_idle_secs must be at least 1");
        }
        if !(self.speech_speed.is_finite() && self.speech_speed > 0.0) {
            bail!("speech_speed must be positive, got {}", self.speech_speed);
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.max_retries)
            .with_delay(self.retry_delay)
            .with_temperature(self.temperature)
    }

    pub fn session_limits(&self) -> SessionLimits {
        SessionLimits {
            recent_capacity: self.recent_capacity,
            max_sessions: self.max_sessions,
            idle_ttl: self.session_idle,
        }
    }

    pub fn story_config(&self) -> StoryConfig {
        StoryConfig::default().with_max_story_parts(self.max_story_parts)
    }
}
