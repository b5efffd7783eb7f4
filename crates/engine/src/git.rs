//! Git integration
//!
//! Two unrelated uses of git2 (libgit2) live here:
//! - [`GitFetcher`] clones hook repositories into the cache and checks out
//!   the pinned revision
//! - the project helpers discover the repository hooks run against, list
//!   its staged or tracked files, and locate its hooks directory

use crate::resolver::RepoFetcher;
use git2::{ErrorClass, Repository, build::CheckoutBuilder, build::RepoBuilder};
use pinhook_core::{Error, Result};
use std::path::{Path, PathBuf};

/// Helper function to convert git2 errors to `pinhook_core` errors
#[inline]
#[allow(clippy::needless_pass_by_value)]
fn git_err(e: git2::Error) -> Error {
    Error::Message(format!("Git error: {e}"))
}

/// Classify a clone failure: transport problems are retryable
fn clone_err(url: &str, rev: &str, e: &git2::Error) -> Error {
    match e.class() {
        ErrorClass::Net | ErrorClass::Http | ErrorClass::Ssh | ErrorClass::Ssl => {
            Error::NetworkError {
                url: url.to_string(),
                rev: rev.to_string(),
                message: e.message().to_string(),
            }
        }
        _ => Error::Message(format!("Failed to clone repository from {url}: {e}")),
    }
}

/// [`RepoFetcher`] backed by a full git2 clone
///
/// The revision may be a commit id, a tag, or a branch of the remote; the
/// checkout is left with a detached HEAD at that commit.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitFetcher;

impl GitFetcher {
    /// Create a new fetcher
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RepoFetcher for GitFetcher {
    #[tracing::instrument(skip(self, dest), fields(dest = %dest.display()))]
    fn fetch(&self, url: &str, rev: &str, dest: &Path) -> Result<()> {
        let repo = RepoBuilder::new()
            .clone(url, dest)
            .map_err(|e| clone_err(url, rev, &e))?;

        let object = resolve_revision(&repo, rev).ok_or_else(|| Error::RevisionNotFound {
            url: url.to_string(),
            rev: rev.to_string(),
        })?;
        let commit = object.peel_to_commit().map_err(|_| Error::RevisionNotFound {
            url: url.to_string(),
            rev: rev.to_string(),
        })?;

        repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))
            .map_err(git_err)?;
        repo.set_head_detached(commit.id()).map_err(git_err)?;

        tracing::debug!(commit = %commit.id(), "Checked out pinned revision");
        Ok(())
    }
}

/// Look a revision up as written, then as a remote branch, then as a tag
fn resolve_revision<'r>(repo: &'r Repository, rev: &str) -> Option<git2::Object<'r>> {
    [
        rev.to_string(),
        format!("origin/{rev}"),
        format!("refs/tags/{rev}"),
    ]
    .iter()
    .find_map(|spec| repo.revparse_single(spec).ok())
}

/// Find git working tree root starting from the given path
///
/// Searches upward from the given path to find a .git directory or file.
/// Returns the working tree root path if found, None otherwise.
#[must_use]
pub fn find_working_tree(start_path: &Path) -> Option<PathBuf> {
    let repo = Repository::discover(start_path).ok()?;
    repo.workdir().map(Path::to_path_buf)
}

/// Open the repository containing `start_path`
pub fn open_project(start_path: &Path) -> Result<Repository> {
    Repository::discover(start_path).map_err(|e| {
        Error::Message(format!(
            "Not inside a git repository ({}): {}",
            start_path.display(),
            e.message()
        ))
    })
}

/// Paths staged for commit, relative to the working tree
///
/// Added, modified, renamed and copied entries are listed; deletions are
/// not, since there is nothing left to check. Before the first commit
/// every entry of the index counts as staged.
pub fn staged_files(repo: &Repository) -> Result<Vec<String>> {
    let head_tree = match repo.head() {
        Ok(head) => Some(head.peel_to_tree().map_err(git_err)?),
        Err(e) if e.code() == git2::ErrorCode::UnbornBranch || e.code() == git2::ErrorCode::NotFound => {
            None
        }
        Err(e) => return Err(git_err(e)),
    };

    let diff = repo
        .diff_tree_to_index(head_tree.as_ref(), None, None)
        .map_err(git_err)?;

    let mut files: Vec<String> = diff
        .deltas()
        .filter(|d| d.status() != git2::Delta::Deleted)
        .filter_map(|d| d.new_file().path().map(|p| p.to_string_lossy().into_owned()))
        .collect();
    files.sort();
    files.dedup();
    Ok(files)
}

/// Every path tracked in the index, relative to the working tree
pub fn all_files(repo: &Repository) -> Result<Vec<String>> {
    let index = repo.index().map_err(git_err)?;
    let mut files: Vec<String> = index
        .iter()
        .map(|entry| String::from_utf8_lossy(&entry.path).into_owned())
        .collect();
    files.sort();
    files.dedup();
    Ok(files)
}

/// Directory git runs hooks from
///
/// Refuses when `core.hooksPath` is configured: hooks installed in
/// `.git/hooks` would be silently ignored there.
pub fn hooks_dir(repo: &Repository) -> Result<PathBuf> {
    let config = repo.config().map_err(git_err)?;
    if let Ok(custom) = config.get_string("core.hooksPath") {
        return Err(Error::Message(format!(
            "core.hooksPath is set to '{custom}'; unset it to let pinhook manage hooks"
        )));
    }
    Ok(repo.path().join("hooks"))
}
