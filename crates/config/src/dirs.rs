//! XDG directory utilities
//!
//! This module provides XDG-compliant directory paths for pinhook using the
//! `xdg` crate:
//! - `XDG_CONFIG_HOME` defaults to ~/.config
//! - `XDG_CACHE_HOME` defaults to ~/.cache

use std::path::PathBuf;
use xdg::BaseDirectories;

/// Get the pinhook config directory
///
/// Returns `$XDG_CONFIG_HOME/pinhook` or `~/.config/pinhook`
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    BaseDirectories::with_prefix("pinhook").get_config_home()
}

/// Get the pinhook cache directory, where pinned hook repositories live
///
/// Returns `$XDG_CACHE_HOME/pinhook` or `~/.cache/pinhook`
#[must_use]
pub fn cache_dir() -> Option<PathBuf> {
    BaseDirectories::with_prefix("pinhook").get_cache_home()
}

/// Get the default user settings file path
///
/// Returns `$XDG_CONFIG_HOME/pinhook/config.toml`
#[must_use]
pub fn default_settings_file() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}
