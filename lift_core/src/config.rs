//! Configuration file support for lift.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/lift/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub rest_timer: RestTimerConfig,

    #[serde(default)]
    pub records: RecordsConfig,

    #[serde(default)]
    pub templates: TemplateConfig,

    #[serde(default)]
    pub health: HealthConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Rest timer behaviour
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RestTimerConfig {
    /// Countdown recompute period
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// How long the "completed" state stays visible before auto-reset
    #[serde(default = "default_completion_grace_ms")]
    pub completion_grace_ms: u64,

    #[serde(default = "default_completion_sound_id")]
    pub completion_sound_id: u32,

    /// Identifier reused for every rest-complete notification
    #[serde(default = "default_notification_id")]
    pub notification_id: String,
}

impl Default for RestTimerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            completion_grace_ms: default_completion_grace_ms(),
            completion_sound_id: default_completion_sound_id(),
            notification_id: default_notification_id(),
        }
    }
}

impl RestTimerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn completion_grace(&self) -> Duration {
        Duration::from_millis(self.completion_grace_ms)
    }
}

/// Personal record display configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordsConfig {
    #[serde(default = "default_toast_seconds")]
    pub toast_seconds: u64,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            toast_seconds: default_toast_seconds(),
        }
    }
}

impl RecordsConfig {
    pub fn toast_duration(&self) -> Duration {
        Duration::from_secs(self.toast_seconds)
    }
}

/// Template expansion parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Warm-up weight as a fraction of working weight
    #[serde(default = "default_warmup_ratio")]
    pub warmup_ratio: f64,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            warmup_ratio: default_warmup_ratio(),
        }
    }
}

/// Health sync configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Export file, relative paths resolve against the data dir
    #[serde(default = "default_export_file")]
    pub export_file: PathBuf,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            export_file: default_export_file(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|_| PathBuf::from("."))
    });
    base.join("lift")
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_completion_grace_ms() -> u64 {
    1500
}

fn default_completion_sound_id() -> u32 {
    1007
}

fn default_notification_id() -> String {
    "restTimerComplete".into()
}

fn default_toast_seconds() -> u64 {
    3
}

fn default_warmup_ratio() -> f64 {
    0.5
}

fn default_export_file() -> PathBuf {
    PathBuf::from("health").join("sessions.jsonl")
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.templates.warmup_ratio) {
            return Err(Error::Config(format!(
                "templates.warmup_ratio must be within 0..=1, got {}",
                self.templates.warmup_ratio
            )));
        }
        if self.rest_timer.notification_id.trim().is_empty() {
            return Err(Error::Config(
                "rest_timer.notification_id must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|_| PathBuf::from("."))
        });
        base.join("lift").join("config.toml")
    }

    /// Resolve the health export file against a data directory
    pub fn health_export_path(&self, data_dir: &Path) -> PathBuf {
        if self.health.export_file.is_absolute() {
            self.health.export_file.clone()
        } else {
            data_dir.join(&self.health.export_file)
        }
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.rest_timer.tick_interval_ms, 1000);
        assert_eq!(config.rest_timer.completion_grace_ms, 1500);
        assert_eq!(config.rest_timer.notification_id, "restTimerComplete");
        assert_eq!(config.records.toast_seconds, 3);
        assert_eq!(config.templates.warmup_ratio, 0.5);
        assert!(!config.health.enabled);
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.records.toast_seconds = 5;
        config.save_to(&path).unwrap();

        let parsed = Config::load_from(&path).unwrap();
        assert_eq!(parsed.records.toast_seconds, 5);
        assert_eq!(
            parsed.rest_timer.completion_sound_id,
            config.rest_timer.completion_sound_id
        );
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[rest_timer]
completion_grace_ms = 500
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.rest_timer.completion_grace_ms, 500);
        assert_eq!(config.rest_timer.tick_interval_ms, 1000); // default
        assert_eq!(config.templates.warmup_ratio, 0.5); // default
    }

    #[test]
    fn test_invalid_warmup_ratio_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[templates]\nwarmup_ratio = 1.5\n").unwrap();

        let result = Config::load_from(&path);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_health_export_path_resolution() {
        let config = Config::default();
        let resolved = config.health_export_path(Path::new("/data/lift"));
        assert_eq!(resolved, PathBuf::from("/data/lift/health/sessions.jsonl"));
    }
}
