//! Error types for CLI commands
//!
//! Structured errors for the failures commands report themselves; anything
//! coming from the engine or config crates is carried through `Other`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during command execution
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CommandError {
    /// No manifest at the expected location
    #[error("No manifest found at {0} (run `pinhook sample-config` to create one)")]
    ManifestNotFound(PathBuf),

    /// The cache directory could not be determined
    #[error("Could not determine the cache directory; set --cache-dir or PINHOOK_CACHE_DIR")]
    NoCacheDir,

    /// A pre-commit hook not written by pinhook is in the way
    #[error("{} exists and was not installed by pinhook; pass --overwrite to replace it", .0.display())]
    ForeignHook(PathBuf),

    /// `--hook` names a hook the manifest does not declare
    #[error("No hook with id '{0}' in the manifest")]
    UnknownHook(String),

    /// A path given on the command line lies outside the project
    #[error("{} is outside the project at {}", .path.display(), .root.display())]
    OutsideProject {
        /// The offending path, made absolute
        path: PathBuf,
        /// Project root
        root: PathBuf,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<pinhook_core::Error> for CommandError {
    fn from(err: pinhook_core::Error) -> Self {
        Self::Other(err.into())
    }
}

/// Result type alias for command operations
pub type Result<T> = std::result::Result<T, CommandError>;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use std::io;

    #[test]
    fn test_manifest_not_found_mentions_path() {
        let error = CommandError::ManifestNotFound(PathBuf::from("/work/.pinhook.toml"));
        let error_msg = error.to_string();
        assert!(error_msg.contains("/work/.pinhook.toml"));
        assert!(error_msg.contains("sample-config"));
    }

    #[test]
    fn test_foreign_hook_suggests_overwrite() {
        let error = CommandError::ForeignHook(PathBuf::from(".git/hooks/pre-commit"));
        assert!(error.to_string().contains("--overwrite"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: CommandError = io_error.into();
        assert!(error.to_string().contains("IO error"));
    }

    #[test]
    fn test_core_error_keeps_message() {
        let core_error = pinhook_core::Error::RunFailed {
            failed: 2,
            errored: 1,
        };
        let expected = core_error.to_string();
        let error: CommandError = core_error.into();

        assert!(matches!(error, CommandError::Other(_)));
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn test_outside_project_names_both_paths() {
        let error = CommandError::OutsideProject {
            path: PathBuf::from("/etc/passwd"),
            root: PathBuf::from("/work/project"),
        };
        let error_msg = error.to_string();
        assert!(error_msg.contains("/etc/passwd"));
        assert!(error_msg.contains("/work/project"));
    }
}
