//! User settings
//!
//! Per-user knobs that are not part of a project's manifest: retry policy
//! for fetching hook repositories, cache location, hook timeout and
//! scheduling. Loaded from `$XDG_CONFIG_HOME/pinhook/config.toml`:
//!
//! ```toml
//! [resolver]
//! retries = 3
//! backoff_ms = 500
//! cache_dir = "/var/cache/pinhook"
//!
//! [run]
//! timeout = 0      # seconds, 0 = no timeout
//! parallel = false # resolve and run sources concurrently
//! color = true
//! ```

use crate::dirs;
use pinhook_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level settings document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Repository resolution settings
    #[serde(default)]
    pub resolver: ResolverSettings,

    /// Hook execution settings
    #[serde(default)]
    pub run: RunSettings,
}

/// `[resolver]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// Extra attempts after a network failure
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Delay before the first retry, doubled on each further attempt
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Cache location override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            backoff_ms: default_backoff_ms(),
            cache_dir: None,
        }
    }
}

/// `[run]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSettings {
    /// Per-hook timeout in seconds (0 = no timeout)
    #[serde(default)]
    pub timeout: u64,

    /// Process independent sources concurrently
    #[serde(default)]
    pub parallel: bool,

    /// Colored terminal output
    #[serde(default = "default_color")]
    pub color: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            timeout: 0,
            parallel: false,
            color: default_color(),
        }
    }
}

fn default_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_color() -> bool {
    true
}

impl Settings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Message(format!("Failed to read settings {}: {e}", path.display()))
        })?;

        toml::from_str(&content).map_err(|e| {
            Error::malformed(path.display().to_string(), e.message().to_string())
        })
    }

    /// Load the user's settings file, falling back to defaults when it is absent
    pub fn load_default() -> Result<Self> {
        match dirs::default_settings_file() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                tracing::debug!("No settings file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Hook timeout, `None` when unlimited
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.run.timeout > 0).then(|| Duration::from_secs(self.run.timeout))
    }

    /// Base retry delay
    #[must_use]
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.resolver.backoff_ms)
    }

    /// Effective cache directory: settings override, then XDG cache home
    #[must_use]
    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.resolver.cache_dir.clone().or_else(dirs::cache_dir)
    }
}
