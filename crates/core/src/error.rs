//! Error taxonomy for pinhook
//!
//! Every crate in the workspace reports failures through this enum so the
//! CLI can tell fatal configuration problems apart from per-source
//! resolution failures and per-hook execution failures.

use thiserror::Error;

/// Base error type shared by all pinhook crates
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The manifest (or a hook repository's metadata) is structurally invalid
    #[error("Malformed config at '{field}': {message}")]
    MalformedConfig {
        /// Path of the offending field, e.g. `repos[0].hooks[1].id`
        field: String,
        /// Human readable description
        message: String,
    },

    /// A `files` or `exclude` pattern failed to compile
    #[error("Invalid pattern at '{field}' ({pattern}): {message}")]
    InvalidPattern {
        /// Path of the offending field
        field: String,
        /// The pattern as written
        pattern: String,
        /// Compiler diagnostic
        message: String,
    },

    /// Transient failure while talking to a remote repository
    #[error("Network error fetching {url}@{rev}: {message}")]
    NetworkError {
        /// Repository URL
        url: String,
        /// Pinned revision
        rev: String,
        /// Underlying failure
        message: String,
    },

    /// The pinned revision does not exist in the repository
    #[error("Revision '{rev}' not found in {url}")]
    RevisionNotFound {
        /// Repository URL
        url: String,
        /// Pinned revision
        rev: String,
    },

    /// A cached checkout no longer matches the checksum recorded when it was fetched
    #[error("Checksum mismatch for cached {url}@{rev}: expected {expected}, found {actual}")]
    ChecksumMismatch {
        /// Repository URL
        url: String,
        /// Pinned revision
        rev: String,
        /// Recorded checksum (hex)
        expected: String,
        /// Recomputed checksum (hex)
        actual: String,
    },

    /// A declared hook id is not provided by the resolved repository
    #[error("Hook '{hook_id}' is not provided by {url}@{rev}")]
    HookNotFound {
        /// Repository URL
        url: String,
        /// Pinned revision
        rev: String,
        /// Requested hook id
        hook_id: String,
    },

    /// A hook could not be executed
    #[error("Hook '{hook_id}' execution failed: {message}")]
    HookExecution {
        /// Hook id
        hook_id: String,
        /// Underlying failure
        message: String,
    },

    /// Aggregate failure of a run
    #[error("Run failed: {failed} hook(s) failed, {errored} hook(s) could not run")]
    RunFailed {
        /// Hooks that ran and failed
        failed: usize,
        /// Hooks whose source could not be resolved
        errored: usize,
    },

    /// Cache index persistence error
    #[error("State error: {0}")]
    State(String),

    /// Generic error message
    #[error("{0}")]
    Message(String),
}

impl Error {
    /// Whether retrying the same operation may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::NetworkError { .. })
    }

    /// Shorthand for [`Error::MalformedConfig`]
    pub fn malformed(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::MalformedConfig {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
