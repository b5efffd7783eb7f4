//! Result aggregation
//!
//! A [`RunReport`] holds one [`HookResult`] per declared hook, in manifest
//! order, whatever happened to it. The run passes iff no hook failed and no
//! hook errored; skipped hooks count as neither.

use pinhook_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a hook did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No changed file matched the hook's filters
    NoFiles,
    /// An earlier hook failed and `fail_fast` is set
    FailFast,
    /// Deselected on the command line
    NotSelected,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoFiles => "no files to check",
            Self::FailFast => "fail fast",
            Self::NotSelected => "not selected",
        })
    }
}

/// Outcome of a single hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HookStatus {
    /// Exited zero without touching its files
    Passed,
    /// Ran and failed
    Failed {
        /// Exit code, absent when the process was killed or never started
        exit_code: Option<i32>,
        /// Short description of the failure
        reason: String,
    },
    /// Not run
    Skipped {
        /// Why
        reason: SkipReason,
    },
    /// Could not be prepared, usually because its source failed to resolve
    Errored {
        /// The underlying error
        message: String,
    },
}

impl HookStatus {
    /// Short label used in terminal output
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Passed => "Passed",
            Self::Failed { .. } => "Failed",
            Self::Skipped { .. } => "Skipped",
            Self::Errored { .. } => "Error",
        }
    }

    /// Whether this status makes the run fail
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Errored { .. })
    }
}

/// Record of one declared hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookResult {
    /// Source repository URL (`local` for project hooks)
    pub repo: String,
    /// Pinned revision (empty for project hooks)
    pub rev: String,
    /// Hook id
    pub hook_id: String,
    /// Display name
    pub name: String,
    /// Outcome
    #[serde(flatten)]
    pub status: HookStatus,
    /// Combined stdout and stderr
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub output: String,
    /// Files the hook was run against
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    /// Wall time in milliseconds
    pub duration_ms: u64,
    /// Output should be shown even when the hook passed
    #[serde(default, skip_serializing)]
    pub verbose: bool,
}

impl HookResult {
    /// Result for a hook that never ran
    #[must_use]
    pub fn not_run(repo: &str, rev: &str, hook_id: &str, name: &str, status: HookStatus) -> Self {
        Self {
            repo: repo.to_string(),
            rev: rev.to_string(),
            hook_id: hook_id.to_string(),
            name: name.to_string(),
            status,
            output: String::new(),
            files: Vec::new(),
            duration_ms: 0,
            verbose: false,
        }
    }
}

/// Ordered results of a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// One entry per declared hook, in manifest order
    pub results: Vec<HookResult>,
}

/// Per-status tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Hooks that passed
    pub passed: usize,
    /// Hooks that failed
    pub failed: usize,
    /// Hooks that were skipped
    pub skipped: usize,
    /// Hooks that could not run
    pub errored: usize,
}

impl RunReport {
    /// Empty report
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result
    pub fn push(&mut self, result: HookResult) {
        self.results.push(result);
    }

    /// Append every result of another batch, keeping its order
    pub fn extend(&mut self, results: impl IntoIterator<Item = HookResult>) {
        self.results.extend(results);
    }

    /// Tally results by status
    #[must_use]
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for result in &self.results {
            match result.status {
                HookStatus::Passed => summary.passed += 1,
                HookStatus::Failed { .. } => summary.failed += 1,
                HookStatus::Skipped { .. } => summary.skipped += 1,
                HookStatus::Errored { .. } => summary.errored += 1,
            }
        }
        summary
    }

    /// Overall verdict
    #[must_use]
    pub fn passed(&self) -> bool {
        !self.results.iter().any(|r| r.status.is_failure())
    }

    /// Result of a hook by source URL and id
    #[must_use]
    pub fn find(&self, repo: &str, hook_id: &str) -> Option<&HookResult> {
        self.results
            .iter()
            .find(|r| r.repo == repo && r.hook_id == hook_id)
    }

    /// Convert into `Ok(self)` when the run passed, [`Error::RunFailed`] otherwise
    pub fn into_result(self) -> Result<Self> {
        let summary = self.summary();
        if summary.failed == 0 && summary.errored == 0 {
            Ok(self)
        } else {
            Err(Error::RunFailed {
                failed: summary.failed,
                errored: summary.errored,
            })
        }
    }

    /// Pretty JSON rendering
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Message(format!("Failed to serialize report: {e}")))
    }
}
