//! List command implementation

use clap::{Args, ValueEnum};
use owo_colors::OwoColorize;
use pinhook_config::Manifest;
use pinhook_engine::RepoCache;
use pinhook_engine::checksum::cache_key;
use serde::Serialize;

use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::Result;

/// Output format for `list`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    /// Human readable
    #[default]
    Simple,
    /// JSON document
    Json,
}

/// List the hooks declared in the manifest
#[derive(Debug, Default, Args)]
pub struct ListCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    pub format: ListFormat,
}

/// One declared hook as listed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedHook {
    /// Source repository (`local` for project hooks)
    pub repo: String,
    /// Pinned revision, empty for project hooks
    pub rev: String,
    /// Hook id
    pub id: String,
    /// Display name when the manifest sets one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the source is already in the cache; `None` for project hooks
    pub cached: Option<bool>,
}

/// Flatten the manifest into listed hooks, in run order
pub fn listed_hooks(manifest: &Manifest, cache: Option<&RepoCache>) -> Vec<ListedHook> {
    let mut hooks = Vec::with_capacity(manifest.hook_count());
    for source in &manifest.repos {
        let cached = if source.is_local() {
            None
        } else {
            let key = cache_key(&source.repo, &source.rev);
            cache.map(|c| matches!(c.lookup(&key), Ok(Some(_))))
        };
        for decl in &source.hooks {
            hooks.push(ListedHook {
                repo: source.repo.clone(),
                rev: source.rev.clone(),
                id: decl.id.clone(),
                name: decl.name.clone(),
                cached,
            });
        }
    }
    hooks
}

impl Command for ListCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let manifest = context.load_manifest()?;
        let cache = context.open_cache().ok();
        let hooks = listed_hooks(&manifest, cache.as_ref());

        match self.format {
            ListFormat::Json => {
                let json = serde_json::json!({
                    "manifest": context.manifest_path,
                    "fail_fast": manifest.fail_fast,
                    "hooks": hooks,
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json).map_err(anyhow::Error::from)?
                );
            }
            ListFormat::Simple => {
                println!("Manifest: {}", context.manifest_path.display().cyan());
                println!();

                let mut rest = hooks.as_slice();
                for source in &manifest.repos {
                    let (current, tail) = rest.split_at(source.hooks.len());
                    rest = tail;
                    println!("{} ({} hooks)", source.label().bold(), current.len());
                    for hook in current {
                        let state = match hook.cached {
                            Some(true) => " [cached]",
                            Some(false) => " [not fetched]",
                            None => "",
                        };
                        match &hook.name {
                            Some(name) => println!(
                                "  • {} ({}){}",
                                hook.id.green(),
                                name,
                                state.dimmed()
                            ),
                            None => println!("  • {}{}", hook.id.green(), state.dimmed()),
                        }
                    }
                }

                if manifest.repos.is_empty() {
                    println!("{}", "No hooks declared.".yellow());
                }
            }
        }

        Ok(())
    }
}
