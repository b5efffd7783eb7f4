//! Hook runner
//!
//! Walks the manifest in order, resolves each source, selects the files
//! every hook applies to and runs it. Every declared hook ends up with
//! exactly one [`HookResult`]; a failing hook or a source that cannot be
//! resolved never prevents later hooks from running unless `fail_fast` is
//! set.
//!
//! In parallel mode sources are resolved concurrently but hook processes
//! still run one at a time, so the before/after comparison of a hook's files
//! only ever sees that hook's own changes.

use super::executor::{self, ExecContext};
use super::{ChangedFile, EffectiveHook};
use crate::report::{HookResult, HookStatus, RunReport, SkipReason};
use crate::resolver::{ResolvedRepo, Resolver};
use indexmap::IndexMap;
use pinhook_config::{HookDeclaration, HookSource, Manifest};
use pinhook_core::Result;
use rayon::prelude::*;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Runs the hooks of a manifest against a set of changed files
pub struct HookRunner<'a> {
    manifest: &'a Manifest,
    resolver: &'a Resolver<'a>,
    ctx: ExecContext,
    parallel: bool,
    only_hook: Option<String>,
    exec_lock: Mutex<()>,
}

/// Builder for [`HookRunner`]
pub struct HookRunnerBuilder<'a> {
    manifest: &'a Manifest,
    resolver: &'a Resolver<'a>,
    project_root: &'a Path,
    timeout: Option<Duration>,
    parallel: bool,
    only_hook: Option<String>,
    env: IndexMap<String, String>,
}

impl<'a> HookRunnerBuilder<'a> {
    fn new(manifest: &'a Manifest, resolver: &'a Resolver<'a>, project_root: &'a Path) -> Self {
        Self {
            manifest,
            resolver,
            project_root,
            timeout: None,
            parallel: false,
            only_hook: None,
            env: IndexMap::new(),
        }
    }

    /// Kill hooks that run longer than `timeout`
    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve sources concurrently; hook processes still run one at a time
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run only hooks with this id; the rest are skipped as not selected
    #[must_use]
    pub fn only_hook(mut self, hook_id: Option<String>) -> Self {
        self.only_hook = hook_id;
        self
    }

    /// Add an environment variable for every hook
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Build the runner
    #[must_use]
    pub fn build(self) -> HookRunner<'a> {
        HookRunner {
            manifest: self.manifest,
            resolver: self.resolver,
            ctx: ExecContext {
                project_root: self.project_root.to_path_buf(),
                timeout: self.timeout,
                env: self.env,
            },
            parallel: self.parallel,
            only_hook: self.only_hook,
            exec_lock: Mutex::new(()),
        }
    }
}

impl<'a> HookRunner<'a> {
    /// Create a runner with default settings
    pub fn new(manifest: &'a Manifest, resolver: &'a Resolver<'a>, project_root: &'a Path) -> Self {
        Self::builder(manifest, resolver, project_root).build()
    }

    /// Create a builder for configuring a `HookRunner`
    ///
    /// ```ignore
    /// let runner = HookRunner::builder(&manifest, &resolver, root)
    ///     .timeout(settings.timeout())
    ///     .parallel(true)
    ///     .build();
    /// let report = runner.run(&changed)?;
    /// ```
    pub fn builder(
        manifest: &'a Manifest,
        resolver: &'a Resolver<'a>,
        project_root: &'a Path,
    ) -> HookRunnerBuilder<'a> {
        HookRunnerBuilder::new(manifest, resolver, project_root)
    }

    /// Run every declared hook against `changed` (project-relative paths)
    ///
    /// Returns the full report; use [`RunReport::into_result`] to turn a
    /// failed run into an error.
    #[tracing::instrument(skip_all, fields(changed = changed.len(), parallel = self.parallel))]
    pub fn run(&self, changed: &[String]) -> Result<RunReport> {
        let global = self.manifest.global_filter()?;
        let files = ChangedFile::scan(&self.ctx.project_root, changed, &global);
        tracing::debug!(candidates = files.len(), "Selected candidate files");

        let stop = AtomicBool::new(false);
        let sources = self.manifest.repos.iter().enumerate();

        let batches: Vec<Vec<HookResult>> = if self.parallel {
            sources
                .collect::<Vec<_>>()
                .into_par_iter()
                .map(|(idx, source)| self.run_source(idx, source, &files, &stop))
                .collect()
        } else {
            sources
                .map(|(idx, source)| self.run_source(idx, source, &files, &stop))
                .collect()
        };

        let mut report = RunReport::new();
        for batch in batches {
            report.extend(batch);
        }

        let summary = report.summary();
        tracing::info!(
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            errored = summary.errored,
            "Run finished"
        );
        Ok(report)
    }

    fn selected(&self, decl: &HookDeclaration) -> bool {
        self.only_hook.as_deref().is_none_or(|id| id == decl.id)
    }

    fn halted(&self, stop: &AtomicBool) -> bool {
        self.manifest.fail_fast && stop.load(Ordering::SeqCst)
    }

    fn record_outcome(&self, status: &HookStatus, stop: &AtomicBool) {
        if self.manifest.fail_fast && status.is_failure() {
            stop.store(true, Ordering::SeqCst);
        }
    }

    /// Run every hook of one source, in declaration order
    fn run_source(
        &self,
        source_idx: usize,
        source: &HookSource,
        files: &[ChangedFile],
        stop: &AtomicBool,
    ) -> Vec<HookResult> {
        let span = tracing::info_span!("source", repo = %source.label());
        let _guard = span.enter();

        let needs_resolution = !source.is_local()
            && !self.halted(stop)
            && source.hooks.iter().any(|h| self.selected(h));

        let resolved: Option<std::result::Result<Arc<ResolvedRepo>, String>> = needs_resolution
            .then(|| self.resolver.resolve(source).map_err(|e| e.to_string()));

        let mut results = Vec::with_capacity(source.hooks.len());
        for (hook_idx, decl) in source.hooks.iter().enumerate() {
            let field = format!("repos[{source_idx}].hooks[{hook_idx}]");
            let name = decl.name.as_deref().unwrap_or(&decl.id);
            let not_run = |status| HookResult::not_run(&source.repo, &source.rev, &decl.id, name, status);

            if !self.selected(decl) {
                results.push(not_run(HookStatus::Skipped {
                    reason: SkipReason::NotSelected,
                }));
                continue;
            }

            if self.halted(stop) {
                results.push(not_run(HookStatus::Skipped {
                    reason: SkipReason::FailFast,
                }));
                continue;
            }

            let hook = match &resolved {
                None => EffectiveHook::from_local(decl, &field).map_err(|e| e.to_string()),
                Some(Ok(repo)) => {
                    EffectiveHook::from_definition(repo, decl, &field).map_err(|e| e.to_string())
                }
                Some(Err(message)) => Err(message.clone()),
            };

            let result = match hook {
                Ok(hook) => self.run_hook(&hook, files),
                Err(message) => {
                    tracing::error!(hook_id = %decl.id, error = %message, "Hook could not be prepared");
                    not_run(HookStatus::Errored { message })
                }
            };

            self.record_outcome(&result.status, stop);
            results.push(result);
        }

        results
    }

    /// Select files for one hook and run it
    fn run_hook(&self, hook: &EffectiveHook, files: &[ChangedFile]) -> HookResult {
        let selected: Vec<String> = hook
            .select(files)
            .into_iter()
            .map(|f| f.path.clone())
            .collect();

        let mut result = HookResult::not_run(
            &hook.repo,
            &hook.rev,
            &hook.id,
            &hook.name,
            HookStatus::Skipped {
                reason: SkipReason::NoFiles,
            },
        );

        if selected.is_empty() && !hook.always_run {
            tracing::debug!(hook_id = %hook.id, "Skipping hook: no files to check");
            return result;
        }

        let span = tracing::info_span!("hook_execution", hook_id = %hook.id, files = selected.len());
        let _guard = span.enter();

        let exclusive = self
            .exec_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let start = Instant::now();
        let execution = executor::execute(hook, &selected, &self.ctx);
        let elapsed = start.elapsed();
        drop(exclusive);

        result.status = match execution.failure {
            None => {
                tracing::debug!(elapsed_ms = elapsed.as_millis(), "Hook passed");
                HookStatus::Passed
            }
            Some(reason) => {
                tracing::warn!(elapsed_ms = elapsed.as_millis(), reason = %reason, "Hook failed");
                HookStatus::Failed {
                    exit_code: execution.exit_code,
                    reason,
                }
            }
        };
        result.output = execution.output;
        result.files = selected;
        result.duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        result.verbose = hook.verbose;
        result
    }
}
