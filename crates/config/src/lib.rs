//! Configuration management for pinhook
//!
//! This crate handles:
//! - Manifest loading and validation
//! - File selection patterns and type tags
//! - User settings
//! - XDG directory management
//! - Logging initialization

pub mod de;
pub mod dirs;
pub mod filetypes;
pub mod logging;
pub mod manifest;
pub mod patterns;
pub mod settings;

// Re-export error types from core
pub use pinhook_core::{Error, Result};

// Re-export main types
pub use filetypes::{TagSet, tags_for_path};
pub use manifest::{HookDeclaration, HookSource, LOCAL_REPO, MANIFEST_FILE, Manifest};
pub use patterns::{FileFilter, TypeFilter};
pub use settings::{ResolverSettings, RunSettings, Settings};
