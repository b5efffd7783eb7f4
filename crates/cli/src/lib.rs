//! pinhook CLI library
//!
//! This library contains all the CLI logic for pinhook, making it reusable
//! for testing and integration with other tools.

pub mod cmd;
pub mod command;
pub mod common;
pub mod error;
pub mod ui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use command::Command;
use common::RuntimeContext;

/// pinhook - run pre-commit hooks from pinned repositories
#[derive(Parser)]
#[command(name = "pinhook")]
#[command(about = "Run pre-commit hooks from pinned repositories")]
#[command(version)]
#[command(long_about = "Run pre-commit hooks from pinned repositories

pinhook reads a manifest (.pinhook.toml) listing hook repositories pinned
to exact revisions, fetches each repository once into a local cache, and
runs the declared hooks against the files staged for commit.

Features:
  • Checksum-verified, content-addressed repository cache
  • Per-hook file patterns and file type filters
  • Local hooks defined directly in the manifest
  • Text or JSON run reports")]
pub struct Cli {
    /// Path to the manifest (default: .pinhook.toml at the repository root)
    #[arg(short, long, env = "PINHOOK_CONFIG", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the repository cache
    #[arg(long, env = "PINHOOK_CACHE_DIR", value_name = "DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Enable verbose output (shows DEBUG level logs)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write logs to a file (useful for debugging)
    #[arg(long, env = "PINHOOK_LOG_FILE", value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for pinhook CLI
#[derive(Subcommand)]
pub enum Commands {
    /// Run hooks against staged files
    #[command(long_about = "Run hooks against staged files

Every hook declared in the manifest gets exactly one result: passed, failed,
skipped or errored. The command exits non-zero when any hook failed or
errored; skipped hooks never fail a run.

Examples:
  • pinhook run
      → Run every hook against the staged files

  • pinhook run --all-files
      → Run every hook against every tracked file

  • pinhook run --hook check-toml --files Cargo.toml
      → Run a single hook against an explicit file list")]
    Run(cmd::run::RunCommand),

    /// List the hooks declared in the manifest
    List(cmd::list::ListCommand),

    /// Check that the manifest is well formed
    Validate(cmd::validate::ValidateCommand),

    /// Install the git pre-commit hook
    Install(cmd::install::InstallCommand),

    /// Remove the git pre-commit hook
    Uninstall(cmd::install::UninstallCommand),

    /// Manage the repository cache
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Print a starter manifest
    SampleConfig,
}

/// Commands for managing the repository cache
#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show cached repositories
    List(cmd::cache::CacheListCommand),

    /// Remove every cached repository
    Clean(cmd::cache::CleanCommand),

    /// Remove cached repositories the manifest no longer references
    Gc(cmd::cache::GcCommand),
}

/// Execute the command based on the command type
fn execute_command(command: Commands, context: &RuntimeContext) -> Result<()> {
    match command {
        Commands::SampleConfig => {
            unreachable!("SampleConfig command already handled above")
        }
        Commands::Run(run_cmd) => {
            run_cmd.execute(context)?;
        }
        Commands::List(list_cmd) => {
            list_cmd.execute(context)?;
        }
        Commands::Validate(validate_cmd) => {
            validate_cmd.execute(context)?;
        }
        Commands::Install(install_cmd) => {
            install_cmd.execute(context)?;
        }
        Commands::Uninstall(uninstall_cmd) => {
            uninstall_cmd.execute(context)?;
        }
        Commands::Cache(cache_cmd) => match cache_cmd {
            CacheCommands::List(list_cmd) => {
                list_cmd.execute(context)?;
            }
            CacheCommands::Clean(clean_cmd) => {
                clean_cmd.execute(context)?;
            }
            CacheCommands::Gc(gc_cmd) => {
                gc_cmd.execute(context)?;
            }
        },
    }

    Ok(())
}

/// Main entry point for the CLI logic
///
/// # Errors
///
/// Returns an error if:
/// - Logging initialization fails
/// - Settings cannot be loaded
/// - Command execution fails, including a run in which a hook failed
pub fn run(cli: Cli) -> Result<()> {
    pinhook_config::logging::init(cli.verbose, cli.log_file.as_deref())?;

    // Needs neither settings nor a repository
    if matches!(cli.command, Commands::SampleConfig) {
        cmd::sample::run();
        return Ok(());
    }

    let context = RuntimeContext::from_cli(&cli)?;
    execute_command(cli.command, &context)
}
