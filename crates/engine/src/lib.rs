//! # pinhook engine
//!
//! Everything that happens after the manifest is loaded:
//!
//! - **Resolver**: pinned hook repositories fetched into a content-addressed,
//!   checksum-verified cache
//! - **State**: persistent cache index (redb)
//! - **Git**: cloning hook repositories and listing the project's files
//! - **Hooks**: file selection and external process execution
//! - **Report**: per-hook results and the overall verdict

pub mod checksum;
pub mod git;
pub mod hooks;
pub mod report;
pub mod resolver;
pub mod state;

// Re-export error types from core
pub use pinhook_core::{Error, Result};

// Re-export commonly used types
pub use git::GitFetcher;
pub use hooks::{ChangedFile, EffectiveHook, HookRunner};
pub use report::{HookResult, HookStatus, RunReport, SkipReason, Summary};
pub use resolver::{RepoCache, RepoFetcher, ResolvedRepo, Resolver, RetryPolicy};
