//! Configuration file support for Lift.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/lift/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub progression: ProgressionConfig,

    #[serde(default)]
    pub rest: RestConfig,
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

/// Rep targets and milestone thresholds
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProgressionConfig {
    /// Target for a first attempt at a weight and for sets 2 and 3
    #[serde(default = "default_baseline_target")]
    pub baseline_target: u32,

    /// Minimum set-1 reps for the progression milestone
    #[serde(default = "default_milestone_first_set")]
    pub milestone_first_set: u32,

    /// Minimum set-2 and set-3 reps for the progression milestone
    #[serde(default = "default_milestone_follow_up")]
    pub milestone_follow_up: u32,

    /// Largest accepted rep input ("12+")
    #[serde(default = "default_max_reps")]
    pub max_reps: u32,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            baseline_target: default_baseline_target(),
            milestone_first_set: default_milestone_first_set(),
            milestone_follow_up: default_milestone_follow_up(),
            max_reps: default_max_reps(),
        }
    }
}

/// Rest timer behaviour
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RestConfig {
    /// Emit background rest notices
    #[serde(default = "default_notifications")]
    pub notifications: bool,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            notifications: default_notifications(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("lift")
}

fn default_baseline_target() -> u32 {
    8
}

fn default_milestone_first_set() -> u32 {
    12
}

fn default_milestone_follow_up() -> u32 {
    8
}

fn default_max_reps() -> u32 {
    13
}

fn default_notifications() -> bool {
    true
}

/// Standard file locations under a data directory:
/// (active workout, session history, rest notice)
pub fn data_paths(data_dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
    (
        data_dir.join("active_workout.json"),
        data_dir.join("history").join("sessions.jsonl"),
        data_dir.join("rest_notice.json"),
    )
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
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

    /// Reject thresholds that would make targets or input meaningless
    pub fn validate(&self) -> Result<()> {
        let p = &self.progression;
        if p.baseline_target == 0 {
            return Err(Error::Config("baseline_target must be positive".into()));
        }
        if p.max_reps == 0 {
            return Err(Error::Config("max_reps must be positive".into()));
        }
        if p.milestone_first_set > p.max_reps || p.milestone_follow_up > p.max_reps {
            return Err(Error::Config(format!(
                "milestone thresholds must not exceed max_reps ({})",
                p.max_reps
            )));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("lift").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
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
