//! Run report rendering
//!
//! One line per hook, dotted out to a fixed width:
//!
//! ```text
//! check toml...........................................................Passed
//! python lint.........................................(no files to check)Skipped
//! ```
//!
//! Failed and errored hooks, and verbose hooks that passed, are followed by
//! their details and captured output.

use owo_colors::OwoColorize;
use pinhook_engine::{HookResult, HookStatus, RunReport, Summary};
use std::fmt::Write;

/// Width of a status line
const LINE_WIDTH: usize = 79;

/// Dotted status line for one hook
fn status_line(name: &str, suffix: &str, label: &str) -> String {
    let used = name.chars().count() + suffix.chars().count() + label.chars().count();
    let dots = LINE_WIDTH.saturating_sub(used).max(3);
    format!("{name}{}{suffix}", ".".repeat(dots))
}

fn paint_label(status: &HookStatus, color: bool) -> String {
    let label = status.label();
    if !color {
        return label.to_string();
    }
    match status {
        HookStatus::Passed => label.green().to_string(),
        HookStatus::Failed { .. } | HookStatus::Errored { .. } => label.red().bold().to_string(),
        HookStatus::Skipped { .. } => label.yellow().to_string(),
    }
}

fn render_result(out: &mut String, result: &HookResult, color: bool) {
    let suffix = match &result.status {
        HookStatus::Skipped { reason } => format!("({reason})"),
        _ => String::new(),
    };
    let label = result.status.label();
    let line = status_line(&result.name, &suffix, label);
    let _ = writeln!(out, "{line}{}", paint_label(&result.status, color));

    let show_details = match &result.status {
        HookStatus::Passed => result.verbose,
        HookStatus::Failed { .. } | HookStatus::Errored { .. } => true,
        HookStatus::Skipped { .. } => false,
    };
    if !show_details {
        return;
    }

    let _ = writeln!(out, "- hook id: {}", result.hook_id);
    match &result.status {
        HookStatus::Failed { exit_code, reason } => {
            if let Some(code) = exit_code {
                let _ = writeln!(out, "- exit code: {code}");
            }
            if !reason.starts_with("exit code") {
                let _ = writeln!(out, "- {reason}");
            }
        }
        HookStatus::Errored { message } => {
            let _ = writeln!(out, "- error: {message}");
        }
        HookStatus::Passed | HookStatus::Skipped { .. } => {}
    }
    #[allow(clippy::cast_precision_loss)]
    let seconds = result.duration_ms as f64 / 1000.0;
    let _ = writeln!(out, "- duration: {seconds:.2}s");

    let output = result.output.trim_end();
    if !output.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{output}");
        let _ = writeln!(out);
    }
}

/// Render every result in report order
pub fn render_report(report: &RunReport, color: bool) -> String {
    let mut out = String::new();
    for result in &report.results {
        render_result(&mut out, result, color);
    }
    out
}

/// One-line tally of a run
pub fn render_summary(summary: &Summary) -> String {
    format!(
        "{} passed, {} failed, {} skipped, {} errored",
        summary.passed, summary.failed, summary.skipped, summary.errored
    )
}
