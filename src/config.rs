//! Configuration loading and management
//!
//! Handles parsing of `.taskmaster.toml` configuration files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::task::{Category, Priority, DEFAULT_CONTENT_MAX_LEN, DEFAULT_CONTENT_MIN_LEN};

/// Config file name, looked up in the working directory unless `--config` is given
pub const CONFIG_FILE: &str = ".taskmaster.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the stored keys (defaults to the platform data dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Task defaults and validation
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Statistics configuration
    #[serde(default)]
    pub stats: StatsConfig,
}

/// What `edit_task` does with a priority or category outside its enum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumUpdatePolicy {
    /// Drop the bad field, apply the rest
    Ignore,
    /// Refuse the whole edit with a validation error
    #[default]
    Reject,
}

/// Tasks configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Priority for new tasks when none is given
    #[serde(default)]
    pub default_priority: Priority,

    /// Category for new tasks when none is given
    #[serde(default)]
    pub default_category: Category,

    /// Handling of out-of-range enum values on edit
    #[serde(default)]
    pub invalid_enum_updates: EnumUpdatePolicy,

    /// Minimum content length after trimming
    #[serde(default = "default_content_min_len")]
    pub content_min_len: usize,

    /// Maximum content length after trimming
    #[serde(default = "default_content_max_len")]
    pub content_max_len: usize,
}

fn default_content_min_len() -> usize {
    DEFAULT_CONTENT_MIN_LEN
}

fn default_content_max_len() -> usize {
    DEFAULT_CONTENT_MAX_LEN
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_priority: Priority::default(),
            default_category: Category::default(),
            invalid_enum_updates: EnumUpdatePolicy::default(),
            content_min_len: default_content_min_len(),
            content_max_len: default_content_max_len(),
        }
    }
}

/// Statistics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Days used as the divisor for the average-per-day figure
    #[serde(default = "default_average_window_days")]
    pub average_window_days: u32,
}

fn default_average_window_days() -> u32 {
    7
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            average_window_days: default_average_window_days(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.taskmaster.toml` from a directory, or return defaults
    pub fn load_from_dir(dir: &Path) -> Self {
        let config_path = dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(
                    path = %config_path.display(),
                    error = %err,
                    "ignoring invalid config"
                );
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve the data directory: explicit setting, then platform default
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        default_data_dir()
            .ok_or_else(|| Error::InvalidConfig("no data directory available".to_string()))
    }

    fn validate(&self) -> Result<()> {
        self.tasks.validate()?;
        self.stats.validate()?;
        Ok(())
    }
}

/// Platform data directory for taskmaster, if the OS provides one
pub fn default_data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "taskmaster").map(|dirs| dirs.data_dir().to_path_buf())
}

impl TasksConfig {
    fn validate(&self) -> Result<()> {
        if self.content_min_len == 0 {
            return Err(Error::InvalidConfig(
                "tasks.content_min_len must be >= 1".to_string(),
            ));
        }
        if self.content_min_len > self.content_max_len {
            return Err(Error::InvalidConfig(format!(
                "tasks.content_min_len ({}) exceeds tasks.content_max_len ({})",
                self.content_min_len, self.content_max_len
            )));
        }
        Ok(())
    }
}

impl StatsConfig {
    fn validate(&self) -> Result<()> {
        if self.average_window_days == 0 {
            return Err(Error::InvalidConfig(
                "stats.average_window_days must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}
