//! Common utilities and types shared across CLI commands

use crate::Cli;
use crate::error::{CommandError, Result};
use pinhook_config::manifest::MANIFEST_FILE_JSON;
use pinhook_config::{MANIFEST_FILE, Manifest, Settings};
use pinhook_engine::RepoCache;
use std::io::IsTerminal;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Runtime context for CLI commands
///
/// Consolidates what most commands need: where the project is, where its
/// manifest lives, the user settings and the cache location. The manifest
/// and cache are opened on demand so commands that need neither (such as
/// `install`) work in a repository without a manifest.
#[derive(Clone)]
pub struct RuntimeContext {
    /// Root of the project's working tree
    pub project_root: PathBuf,
    /// Directory relative command-line paths are taken from
    pub working_dir: PathBuf,
    /// Manifest location
    pub manifest_path: PathBuf,
    /// Manifest path given on the command line, if any
    pub explicit_manifest: Option<PathBuf>,
    /// User settings (shared via Arc)
    pub settings: Arc<Settings>,
    /// Repository cache directory
    pub cache_dir: Option<PathBuf>,
}

impl RuntimeContext {
    /// Create a context rooted at `project_root`
    ///
    /// Without an explicit manifest, `.pinhook.toml` is used, or
    /// `.pinhook.json` when only that exists.
    #[must_use]
    pub fn new(project_root: &Path, manifest: Option<PathBuf>, settings: Settings) -> Self {
        let manifest_path = manifest.clone().unwrap_or_else(|| default_manifest(project_root));
        let cache_dir = settings.cache_dir();
        Self {
            project_root: project_root.to_path_buf(),
            working_dir: project_root.to_path_buf(),
            manifest_path,
            explicit_manifest: manifest,
            settings: Arc::new(settings),
            cache_dir,
        }
    }

    /// Build the context for the current directory and command line
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let project_root =
            pinhook_engine::git::find_working_tree(&cwd).unwrap_or_else(|| cwd.clone());
        let settings = Settings::load_default()?;

        let manifest = cli.config.as_ref().map(|path| cwd.join(path));

        let mut context = Self::new(&project_root, manifest, settings).with_working_dir(cwd);
        if let Some(dir) = &cli.cache_dir {
            context.cache_dir = Some(dir.clone());
        }

        tracing::debug!(
            project_root = %context.project_root.display(),
            manifest = %context.manifest_path.display(),
            "Resolved runtime context"
        );
        Ok(context)
    }

    /// Take relative command-line paths from `dir` instead of the project root
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Project-relative, forward-slash form of a command-line path
    ///
    /// Relative paths are taken from the working directory. `.` and `..`
    /// are resolved lexically; a path that does not end up inside the
    /// project is rejected.
    pub fn project_path(&self, path: &Path) -> Result<String> {
        let absolute = normalize(&self.working_dir.join(path));
        let root = normalize(&self.project_root);

        let relative = match absolute.strip_prefix(&root) {
            Ok(rel) => rel.to_path_buf(),
            // The root may have been reached through a symlink
            Err(_) => canonical_relative(&root, &absolute).ok_or_else(|| {
                CommandError::OutsideProject {
                    path: absolute.clone(),
                    root: root.clone(),
                }
            })?,
        };

        Ok(relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/"))
    }

    /// Override the cache directory
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Load and validate the manifest
    pub fn load_manifest(&self) -> Result<Manifest> {
        if !self.manifest_path.exists() {
            return Err(CommandError::ManifestNotFound(self.manifest_path.clone()));
        }
        Ok(Manifest::load(&self.manifest_path)?)
    }

    /// Open the repository cache, creating it on first use
    pub fn open_cache(&self) -> Result<RepoCache> {
        let dir = self.cache_dir.as_ref().ok_or(CommandError::NoCacheDir)?;
        Ok(RepoCache::open(dir)?)
    }

    /// Whether terminal output should be colored
    #[must_use]
    pub fn use_color(&self) -> bool {
        self.settings.run.color
            && std::env::var_os("NO_COLOR").is_none()
            && std::io::stdout().is_terminal()
    }
}

/// Resolve `.` and `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn canonical_relative(root: &Path, absolute: &Path) -> Option<PathBuf> {
    let root = root.canonicalize().ok()?;
    let parent = absolute.parent()?.canonicalize().ok()?;
    let full = parent.join(absolute.file_name()?);
    full.strip_prefix(&root).ok().map(Path::to_path_buf)
}

fn default_manifest(project_root: &Path) -> PathBuf {
    let toml = project_root.join(MANIFEST_FILE);
    let json = project_root.join(MANIFEST_FILE_JSON);
    if !toml.exists() && json.exists() {
        json
    } else {
        toml
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_manifest_prefers_toml() {
        let temp = TempDir::new().unwrap();
        let context = RuntimeContext::new(temp.path(), None, Settings::default());
        assert_eq!(context.manifest_path, temp.path().join(MANIFEST_FILE));

        fs::write(temp.path().join(MANIFEST_FILE_JSON), "{}").unwrap();
        let context = RuntimeContext::new(temp.path(), None, Settings::default());
        assert_eq!(context.manifest_path, temp.path().join(MANIFEST_FILE_JSON));

        fs::write(temp.path().join(MANIFEST_FILE), "").unwrap();
        let context = RuntimeContext::new(temp.path(), None, Settings::default());
        assert_eq!(context.manifest_path, temp.path().join(MANIFEST_FILE));
    }

    #[test]
    fn test_project_path_forms() {
        let context = RuntimeContext::new(Path::new("/work/project"), None, Settings::default());
        assert_eq!(
            context.project_path(Path::new("/work/project/src/main.rs")).unwrap(),
            "src/main.rs"
        );
        assert_eq!(context.project_path(Path::new("src/lib.rs")).unwrap(), "src/lib.rs");
        assert_eq!(context.project_path(Path::new("./README.md")).unwrap(), "README.md");
        assert_eq!(
            context.project_path(Path::new("src/../docs/guide.md")).unwrap(),
            "docs/guide.md"
        );
    }

    #[test]
    fn test_relative_paths_follow_working_dir() {
        let context = RuntimeContext::new(Path::new("/work/project"), None, Settings::default())
            .with_working_dir("/work/project/src");
        assert_eq!(context.project_path(Path::new("main.rs")).unwrap(), "src/main.rs");
        assert_eq!(context.project_path(Path::new("../README.md")).unwrap(), "README.md");
    }

    #[test]
    fn test_paths_outside_project_rejected() {
        let context = RuntimeContext::new(Path::new("/work/project"), None, Settings::default());
        for path in ["/etc/passwd", "../secret/x.rs", "src/../../other/y.rs"] {
            match context.project_path(Path::new(path)) {
                Err(CommandError::OutsideProject { root, .. }) => {
                    assert_eq!(root, Path::new("/work/project"));
                }
                other => panic!("{path} should be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_missing_manifest_is_reported() {
        let temp = TempDir::new().unwrap();
        let context = RuntimeContext::new(temp.path(), None, Settings::default());
        match context.load_manifest() {
            Err(CommandError::ManifestNotFound(path)) => {
                assert_eq!(path, temp.path().join(MANIFEST_FILE));
            }
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_cache_dir_override() {
        let temp = TempDir::new().unwrap();
        let context = RuntimeContext::new(temp.path(), None, Settings::default())
            .with_cache_dir(temp.path().join("cache"));
        let cache = context.open_cache().unwrap();
        assert_eq!(cache.root(), temp.path().join("cache"));
    }
}
