//! Install and uninstall the git pre-commit hook
//!
//! The installed hook is a small shell script that re-enters pinhook with
//! `run`. It carries a marker line so a later install can replace it and
//! uninstall never removes a hook some other tool wrote.

use clap::Args;
use owo_colors::OwoColorize;
use pinhook_engine::git::{hooks_dir, open_project};
use std::fs;
use std::path::{Path, PathBuf};

use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::{CommandError, Result};
use crate::ui::StatusIcon;

/// Name of the git hook pinhook installs
pub const HOOK_NAME: &str = "pre-commit";

/// Marker identifying a hook script written by pinhook
pub const SHIM_MARKER: &str = "# installed by pinhook";

/// Install the git pre-commit hook
#[derive(Debug, Default, Args)]
pub struct InstallCommand {
    /// Replace an existing pre-commit hook not installed by pinhook
    #[arg(long)]
    pub overwrite: bool,
}

/// Remove the git pre-commit hook
#[derive(Debug, Default, Args)]
pub struct UninstallCommand {}

/// Script body for the hook
fn shim_script(exe: &Path, manifest: Option<&Path>) -> String {
    let exe = shell_words::quote(&exe.to_string_lossy()).into_owned();
    let config = manifest
        .map(|m| format!(" --config {}", shell_words::quote(&m.to_string_lossy())))
        .unwrap_or_default();
    format!("#!/bin/sh\n{SHIM_MARKER}\nexec {exe}{config} run \"$@\"\n")
}

/// Whether the file at `path` is a hook pinhook wrote
fn is_ours(path: &Path) -> bool {
    fs::read_to_string(path).is_ok_and(|content| content.lines().any(|l| l == SHIM_MARKER))
}

/// Write the hook into `dir`, returning its path
///
/// An existing hook written by pinhook is replaced; any other existing
/// hook is left alone unless `overwrite` is set.
pub fn install_shim(dir: &Path, exe: &Path, manifest: Option<&Path>, overwrite: bool) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(HOOK_NAME);

    if path.exists() && !is_ours(&path) {
        if !overwrite {
            return Err(CommandError::ForeignHook(path));
        }
        tracing::warn!(path = %path.display(), "Replacing existing pre-commit hook");
    }

    fs::write(&path, shim_script(exe, manifest))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    }

    Ok(path)
}

/// Remove the hook from `dir` if pinhook wrote it
///
/// Returns `Ok(false)` when there is nothing of ours to remove.
pub fn remove_shim(dir: &Path) -> Result<bool> {
    let path = dir.join(HOOK_NAME);
    if !path.exists() {
        return Ok(false);
    }
    if !is_ours(&path) {
        tracing::warn!(path = %path.display(), "Leaving pre-commit hook not installed by pinhook");
        return Ok(false);
    }
    fs::remove_file(&path)?;
    Ok(true)
}

impl Command for InstallCommand {
    type Output = PathBuf;

    fn execute(&self, context: &RuntimeContext) -> Result<PathBuf> {
        let repo = open_project(&context.project_root)?;
        let dir = hooks_dir(&repo)?;
        let exe = std::env::current_exe()?;

        let path = install_shim(
            &dir,
            &exe,
            context.explicit_manifest.as_deref(),
            self.overwrite,
        )?;

        println!(
            "{} pre-commit hook installed at {}",
            StatusIcon::Success.get().green(),
            path.display()
        );
        Ok(path)
    }
}

impl Command for UninstallCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let repo = open_project(&context.project_root)?;
        let dir = hooks_dir(&repo)?;

        if remove_shim(&dir)? {
            println!(
                "{} pre-commit hook removed",
                StatusIcon::Success.get().green()
            );
        } else {
            println!(
                "{} no pinhook pre-commit hook installed",
                StatusIcon::Info.get().yellow()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_install_writes_marked_script() {
        let temp = TempDir::new().unwrap();
        let hooks = temp.path().join("hooks");
        let path = install_shim(&hooks, Path::new("/usr/bin/pinhook"), None, false).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("#!/bin/sh\n"));
        assert!(content.contains(SHIM_MARKER));
        assert!(content.contains("exec /usr/bin/pinhook run \"$@\""));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn test_shim_quotes_paths_and_passes_manifest() {
        let script = shim_script(
            Path::new("/opt/my tools/pinhook"),
            Some(Path::new("/work/ci hooks.toml")),
        );
        assert!(script.contains("exec '/opt/my tools/pinhook' --config '/work/ci hooks.toml' run"));
    }

    #[test]
    fn test_reinstall_replaces_own_hook() {
        let temp = TempDir::new().unwrap();
        install_shim(temp.path(), Path::new("/old/pinhook"), None, false).unwrap();
        let path = install_shim(temp.path(), Path::new("/new/pinhook"), None, false).unwrap();
        assert!(fs::read_to_string(path).unwrap().contains("/new/pinhook"));
    }

    #[test]
    fn test_foreign_hook_needs_overwrite() {
        let temp = TempDir::new().unwrap();
        let existing = temp.path().join(HOOK_NAME);
        fs::write(&existing, "#!/bin/sh\nmake lint\n").unwrap();

        let err = install_shim(temp.path(), Path::new("/usr/bin/pinhook"), None, false).unwrap_err();
        assert!(matches!(err, CommandError::ForeignHook(_)));
        assert_eq!(fs::read_to_string(&existing).unwrap(), "#!/bin/sh\nmake lint\n");

        install_shim(temp.path(), Path::new("/usr/bin/pinhook"), None, true).unwrap();
        assert!(is_ours(&existing));
    }

    #[test]
    fn test_uninstall_only_removes_own_hook() {
        let temp = TempDir::new().unwrap();
        assert!(!remove_shim(temp.path()).unwrap());

        let existing = temp.path().join(HOOK_NAME);
        fs::write(&existing, "#!/bin/sh\nmake lint\n").unwrap();
        assert!(!remove_shim(temp.path()).unwrap());
        assert!(existing.exists());

        fs::remove_file(&existing).unwrap();
        install_shim(temp.path(), Path::new("/usr/bin/pinhook"), None, false).unwrap();
        assert!(remove_shim(temp.path()).unwrap());
        assert!(!existing.exists());
    }
}
