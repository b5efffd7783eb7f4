//! Repository cache commands

use clap::Args;
use comfy_table::{Table, presets::UTF8_FULL};
use owo_colors::OwoColorize;
use pinhook_engine::resolver::{CacheEntry, referenced_keys};

use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::Result;
use crate::ui::StatusIcon;

/// Show cached repositories
#[derive(Debug, Default, Args)]
pub struct CacheListCommand {}

/// Remove every cached repository
#[derive(Debug, Default, Args)]
pub struct CleanCommand {}

/// Remove cached repositories the manifest no longer references
#[derive(Debug, Default, Args)]
pub struct GcCommand {}

fn format_fetched_at(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0).map_or_else(
        || "unknown".to_string(),
        |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

/// Table of cache entries
pub fn entries_table(entries: &[CacheEntry]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Repository", "Revision", "Key", "Fetched"]);

    for entry in entries {
        table.add_row(vec![
            entry.url.clone(),
            entry.rev.clone(),
            entry.key.chars().take(12).collect(),
            format_fetched_at(entry.fetched_at),
        ]);
    }
    table
}

impl Command for CacheListCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let cache = context.open_cache()?;
        let entries = cache.entries()?;

        println!("Cache: {}", cache.root().display().cyan());
        if entries.is_empty() {
            println!("{}", "No cached repositories.".yellow());
        } else {
            println!("{}", entries_table(&entries));
        }
        Ok(())
    }
}

impl Command for CleanCommand {
    type Output = usize;

    fn execute(&self, context: &RuntimeContext) -> Result<usize> {
        let cache = context.open_cache()?;
        let removed = cache.clean()?;
        println!(
            "{} removed {removed} cached repositories from {}",
            StatusIcon::Success.get().green(),
            cache.root().display()
        );
        Ok(removed)
    }
}

impl Command for GcCommand {
    type Output = usize;

    fn execute(&self, context: &RuntimeContext) -> Result<usize> {
        let manifest = context.load_manifest()?;
        let cache = context.open_cache()?;
        let removed = cache.gc(&referenced_keys(&manifest))?;
        println!(
            "{} removed {removed} unreferenced cached repositories",
            StatusIcon::Success.get().green()
        );
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str, fetched_at: i64) -> CacheEntry {
        CacheEntry {
            key: "0123456789abcdef0123".to_string(),
            url: url.to_string(),
            rev: "v1".to_string(),
            path: String::new(),
            checksum: String::new(),
            files: Vec::new(),
            fetched_at,
        }
    }

    #[test]
    fn test_fetched_at_format() {
        assert_eq!(format_fetched_at(0), "1970-01-01 00:00:00 UTC");
    }

    #[test]
    fn test_table_lists_every_entry() {
        let table = entries_table(&[
            entry("https://example.com/a", 0),
            entry("https://example.com/b", 86_400),
        ]);
        let rendered = table.to_string();
        assert!(rendered.contains("https://example.com/a"));
        assert!(rendered.contains("1970-01-02"));
        assert!(rendered.contains("0123456789ab"));
        assert!(!rendered.contains("0123456789abc"));
    }
}
