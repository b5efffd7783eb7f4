//! Run command implementation
//!
//! Collects the candidate files (staged, all tracked, or given on the
//! command line), resolves every hook source through the cache and runs
//! the hooks. The command fails when any hook failed or errored.

use clap::{Args, ValueEnum};
use owo_colors::OwoColorize;
use pinhook_engine::git::{self, open_project};
use pinhook_engine::{GitFetcher, HookRunner, RepoFetcher, Resolver, RetryPolicy, RunReport};
use std::path::PathBuf;
use std::time::Duration;

use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::{CommandError, Result};
use crate::ui::{create_spinner, render_report, render_summary};

/// How the run report is printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// One dotted status line per hook
    #[default]
    Text,
    /// The full report as JSON
    Json,
}

/// Run hooks against staged files
#[derive(Debug, Default, Args)]
pub struct RunCommand {
    /// Run against every tracked file instead of the staged ones
    #[arg(short, long, conflicts_with = "files")]
    pub all_files: bool,

    /// Run against these files instead of the staged ones
    #[arg(long, num_args = 1.., value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Run only the hook with this id
    #[arg(long, value_name = "ID")]
    pub hook: Option<String>,

    /// Process hook sources concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Kill hooks running longer than this many seconds (0 disables the limit)
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: ReportFormat,
}

impl Command for RunCommand {
    type Output = RunReport;

    fn execute(&self, context: &RuntimeContext) -> Result<RunReport> {
        let spinner = match self.format {
            ReportFormat::Text => create_spinner("Running hooks"),
            ReportFormat::Json => indicatif::ProgressBar::hidden(),
        };
        let report = self.collect(context, GitFetcher::new());
        spinner.finish_and_clear();
        let report = report?;

        match self.format {
            ReportFormat::Text => {
                let color = context.use_color();
                print!("{}", render_report(&report, color));
                let summary = render_summary(&report.summary());
                if !color {
                    println!("{summary}");
                } else if report.passed() {
                    println!("{}", summary.dimmed());
                } else {
                    println!("{}", summary.red());
                }
            }
            ReportFormat::Json => println!("{}", report.to_json()?),
        }

        Ok(report.into_result()?)
    }
}

impl RunCommand {
    /// Run the hooks and return the report without printing it
    ///
    /// A run in which hooks failed is still `Ok`; only problems that stop
    /// the run as a whole (an unreadable manifest, no repository) are errors.
    pub fn collect(
        &self,
        context: &RuntimeContext,
        fetcher: impl RepoFetcher,
    ) -> Result<RunReport> {
        let manifest = context.load_manifest()?;

        if let Some(id) = &self.hook
            && !manifest.repos.iter().flat_map(|s| &s.hooks).any(|h| &h.id == id)
        {
            return Err(CommandError::UnknownHook(id.clone()));
        }

        let changed = self.changed_files(context)?;
        tracing::debug!(files = changed.len(), "Collected candidate files");

        let cache = context.open_cache()?;
        let resolver = Resolver::new(&cache, fetcher)
            .with_retry(RetryPolicy::from_settings(&context.settings.resolver));

        let timeout = match self.timeout {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => context.settings.timeout(),
        };

        let runner = HookRunner::builder(&manifest, &resolver, &context.project_root)
            .timeout(timeout)
            .parallel(self.parallel || context.settings.run.parallel)
            .only_hook(self.hook.clone())
            .build();

        Ok(runner.run(&changed)?)
    }

    /// Project-relative paths the run considers
    fn changed_files(&self, context: &RuntimeContext) -> Result<Vec<String>> {
        if !self.files.is_empty() {
            return self
                .files
                .iter()
                .map(|path| context.project_path(path))
                .collect();
        }

        let repo = open_project(&context.project_root)?;
        let files = if self.all_files {
            git::all_files(&repo)?
        } else {
            git::staged_files(&repo)?
        };
        Ok(files)
    }
}
