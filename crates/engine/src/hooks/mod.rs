//! Hook dispatch
//!
//! - [`EffectiveHook`]: a declaration overlaid on its repository's definition
//! - [`executor`]: runs one hook as an external process
//! - [`HookRunner`]: walks the manifest, selects files, records results

pub mod effective;
pub mod executor;
pub mod runner;

pub use effective::EffectiveHook;
pub use executor::{ExecContext, Execution};
pub use runner::{HookRunner, HookRunnerBuilder};

use pinhook_config::{FileFilter, TagSet, tags_for_path};
use std::path::Path;

/// A candidate file with its type tags computed once per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    /// Project-relative path with forward slashes
    pub path: String,
    /// Type tags
    pub tags: TagSet,
}

impl ChangedFile {
    /// Tag every path relative to `project_root`
    ///
    /// Paths rejected by `global` are dropped here so no hook ever sees them.
    #[must_use]
    pub fn scan(project_root: &Path, paths: &[String], global: &FileFilter) -> Vec<Self> {
        paths
            .iter()
            .map(|p| p.replace('\\', "/"))
            .filter(|p| global.matches(p))
            .map(|path| {
                let tags = tags_for_path(&project_root.join(&path));
                Self { path, tags }
            })
            .collect()
    }
}
