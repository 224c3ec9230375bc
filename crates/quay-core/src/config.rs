//! Configuration management for Quay.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Quay configuration loaded from .git/quay/config.toml.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// History view settings.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Operation queue settings.
    #[serde(default)]
    pub queue: QueueConfig,
}

impl Config {
    /// Location of the config file inside a repository's git directory.
    #[must_use]
    pub fn path_in(git_dir: impl AsRef<Path>) -> PathBuf {
        git_dir.as_ref().join("quay").join("config.toml")
    }

    /// Load config from a TOML file.
    ///
    /// # Errors
    /// Returns error if file can't be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

/// General Quay settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Remote to fetch from when the branch has none configured.
    #[serde(default = "default_remote")]
    pub default_remote: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_remote: default_remote(),
        }
    }
}

fn default_remote() -> String {
    quay_git::DEFAULT_REMOTE.into()
}

/// History view settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Try a fetch before loading history so upstream data is current.
    #[serde(default = "default_true")]
    pub fetch_before_load: bool,

    /// Maximum number of commits in a history snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            fetch_before_load: true,
            limit: None,
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Operation queue settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Name of the worker thread.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            thread_name: default_thread_name(),
        }
    }
}

fn default_thread_name() -> String {
    "quay-git-queue".into()
}
