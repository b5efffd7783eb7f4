//! Logging configuration for the pinhook CLI
//!
//! Compact terminal output plus optional file logging using tracing.

use pinhook_core::Result;
use std::path::Path;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the logging system
///
/// # Arguments
/// * `verbose` - Enable debug level logging (and timestamps)
/// * `log_file` - Optional path to append detailed logs to
///
/// `RUST_LOG` overrides the terminal filter.
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { "debug" } else { "warn" };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(format!(
                "pinhook={level},pinhook_config={level},pinhook_engine={level}"
            ))
        })
        .map_err(|e| pinhook_core::Error::Message(format!("Invalid log filter: {e}")))?;

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_ansi(true);

    // Timestamps only matter when debugging
    let stdout_layer = if verbose {
        stdout_layer.with_filter(env_filter).boxed()
    } else {
        stdout_layer.without_time().with_filter(env_filter).boxed()
    };

    let file_layer = match log_file {
        Some(log_path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)?;

            let filter = EnvFilter::try_new("debug")
                .map_err(|e| pinhook_core::Error::Message(format!("Invalid log filter: {e}")))?;

            Some(
                fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .pretty()
                    .with_filter(filter),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(())
}
