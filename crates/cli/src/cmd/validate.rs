//! Validate command implementation

use clap::Args;
use owo_colors::OwoColorize;
use pinhook_config::Manifest;
use pinhook_engine::{GitFetcher, Resolver, RetryPolicy};

use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::Result;
use crate::ui::{StatusIcon, create_spinner};

/// Check that the manifest is well formed
#[derive(Debug, Default, Args)]
pub struct ValidateCommand {
    /// Also fetch every source and check that it provides the declared hooks
    #[arg(long)]
    pub resolve: bool,
}

/// Problems found by resolving every remote source of `manifest`
///
/// Each entry names the source and what is wrong with it; an empty list
/// means every declared hook exists at its pinned revision.
pub fn resolution_problems(manifest: &Manifest, resolver: &Resolver<'_>) -> Vec<String> {
    let mut problems = Vec::new();
    for source in manifest.repos.iter().filter(|s| !s.is_local()) {
        match resolver.resolve(source) {
            Ok(repo) => {
                for decl in &source.hooks {
                    if let Err(e) = repo.definition(&decl.id) {
                        problems.push(e.to_string());
                    }
                }
            }
            Err(e) => problems.push(e.to_string()),
        }
    }
    problems
}

impl Command for ValidateCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let manifest = context.load_manifest()?;

        if self.resolve {
            let cache = context.open_cache()?;
            let resolver = Resolver::new(&cache, GitFetcher::new())
                .with_retry(RetryPolicy::from_settings(&context.settings.resolver));

            let spinner = create_spinner("Resolving hook repositories");
            let problems = resolution_problems(&manifest, &resolver);
            spinner.finish_and_clear();

            if !problems.is_empty() {
                for problem in &problems {
                    println!("{} {problem}", StatusIcon::Error.get().red());
                }
                return Err(anyhow::anyhow!(
                    "{} problem(s) found while resolving hook repositories",
                    problems.len()
                )
                .into());
            }
        }

        println!(
            "{} {}: {} sources, {} hooks",
            StatusIcon::Success.get().green(),
            context.manifest_path.display(),
            manifest.repos.len(),
            manifest.hook_count()
        );
        Ok(())
    }
}
