//! Configuration management for Aula

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Playback percentages that drive completion, quiz unlock and resume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// A lesson counts as completed at or beyond this percent
    pub completion_percent: f64,
    /// Quiz questions may be triggered at or beyond this percent
    pub unlock_percent: f64,
    /// Saved positions at or beyond this fraction of the duration are not resumed
    pub resume_cap_percent: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { completion_percent: 90.0, unlock_percent: 80.0, resume_cap_percent: 90.0 }
    }
}

impl Thresholds {
    /// Whether a percent counts as a completed lesson
    pub fn is_complete(&self, percent: f64) -> bool {
        percent >= self.completion_percent
    }

    /// Whether a percent unlocks quiz questions
    pub fn is_unlocked(&self, percent: f64) -> bool {
        percent >= self.unlock_percent
    }
}

/// Delays used by the playback, quiz and navigation timers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Coalescing window for progress writes (milliseconds)
    pub debounce_ms: u64,
    /// How long answer feedback stays up before playback resumes (milliseconds)
    pub answer_display_ms: u64,
    /// Countdown before moving to the next lesson (milliseconds)
    pub auto_advance_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self { debounce_ms: 2_000, answer_display_ms: 2_000, auto_advance_ms: 3_000 }
    }
}

impl Timings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn answer_display(&self) -> Duration {
        Duration::from_millis(self.answer_display_ms)
    }

    pub fn auto_advance(&self) -> Duration {
        Duration::from_millis(self.auto_advance_ms)
    }
}

/// Remote record store connection (PostgREST-style API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the project, e.g. `https://example.supabase.co`
    pub url: String,
    /// Anonymous API key sent with every request
    pub api_key: String,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Completion, unlock and resume percentages
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Timer delays
    #[serde(default)]
    pub timings: Timings,

    /// Remote record store (progress is kept locally only when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,

    /// Chat service endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_url: Option<String>,

    /// Endpoint returning `{"ip": "..."}`, used to derive the user key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_probe_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            timings: Timings::default(),
            remote: None,
            chat_url: None,
            device_probe_url: Some("https://api.ipify.org?format=json".to_string()),
        }
    }
}

impl Config {
    /// Load configuration from disk, or create default if not exists
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config from {:?}", config_path))?;
            serde_json::from_str(&contents).with_context(|| "Failed to parse config.json")
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config to {:?}", config_path))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs =
            ProjectDirs::from("", "", "aula").context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.json"))
    }

    /// Get the data directory path
    pub fn data_dir() -> Result<PathBuf> {
        let proj_dirs =
            ProjectDirs::from("", "", "aula").context("Failed to determine data directory")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    /// Get the path of the persisted local state (progress cache, answers, device id)
    pub fn state_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("state.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_match_course_rules() {
        let thresholds = Thresholds::default();
        assert!(thresholds.is_complete(90.0));
        assert!(!thresholds.is_complete(89.9));
        assert!(thresholds.is_unlocked(80.0));
        assert!(!thresholds.is_unlocked(79.99));
    }

    #[test]
    fn default_timings() {
        let timings = Timings::default();
        assert_eq!(timings.debounce(), Duration::from_secs(2));
        assert_eq!(timings.answer_display(), Duration::from_secs(2));
        assert_eq!(timings.auto_advance(), Duration::from_secs(3));
    }

    #[test]
    fn config_deserializes_with_missing_sections() {
        let json = r#"{"chat_url":"http://localhost:3000/api/chat"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.thresholds, Thresholds::default());
        assert_eq!(config.chat_url.as_deref(), Some("http://localhost:3000/api/chat"));
        assert!(config.remote.is_none());
    }

    #[test]
    fn config_serializes_to_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("completion_percent"));
        assert!(!json.contains("remote"));
    }
}
