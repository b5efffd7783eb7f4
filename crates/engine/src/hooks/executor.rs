//! Hook process execution
//!
//! A hook runs as `entry... args... files...` with the project root as its
//! working directory and stderr merged into stdout. Long file lists are
//! split across several invocations so the command line stays within
//! platform limits; the hook fails if any invocation fails.

use super::EffectiveHook;
use crate::checksum::file_digest;
use indexmap::IndexMap;
use pinhook_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Most files passed to a single invocation
const MAX_FILES_PER_INVOCATION: usize = 1000;

/// Most bytes of file names passed to a single invocation
const MAX_ARG_BYTES: usize = 96 * 1024;

/// Run-wide execution settings
#[derive(Debug, Clone)]
pub struct ExecContext {
    /// Working directory of every hook
    pub project_root: PathBuf,
    /// Per-invocation timeout, `None` for unlimited
    pub timeout: Option<Duration>,
    /// Extra environment passed to every hook
    pub env: IndexMap<String, String>,
}

/// What happened when a hook ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Exit code of the first failing invocation (or of the last one when all passed)
    pub exit_code: Option<i32>,
    /// Combined output of every invocation
    pub output: String,
    /// Failure description, `None` when the hook passed
    pub failure: Option<String>,
}

impl Execution {
    fn failed(exit_code: Option<i32>, output: String, reason: impl Into<String>) -> Self {
        Self {
            exit_code,
            output,
            failure: Some(reason.into()),
        }
    }
}

/// Split `files` into batches bounded by count and total name length
fn partition(files: &[String]) -> Vec<&[String]> {
    if files.is_empty() {
        return vec![files];
    }

    let mut batches = Vec::new();
    let mut start = 0;
    let mut bytes = 0;
    for (idx, file) in files.iter().enumerate() {
        let len = file.len() + 1;
        let count = idx - start;
        if count > 0 && (count >= MAX_FILES_PER_INVOCATION || bytes + len > MAX_ARG_BYTES) {
            batches.push(&files[start..idx]);
            start = idx;
            bytes = 0;
        }
        bytes += len;
    }
    batches.push(&files[start..]);
    batches
}

/// Locate the program an entry names
///
/// An entry that exists inside the hook's checkout is run from there; one
/// containing a path separator is taken relative to the project root;
/// anything else is looked up on `PATH`.
fn resolve_program(hook: &EffectiveHook, project_root: &Path) -> Result<PathBuf> {
    let program = &hook.entry[0];

    if let Some(dir) = &hook.repo_dir {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    if program.contains('/') || program.contains(std::path::MAIN_SEPARATOR) {
        let candidate = project_root.join(program);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    which::which(program).map_err(|e| Error::HookExecution {
        hook_id: hook.id.clone(),
        message: format!("'{program}' not found: {e}"),
    })
}

/// Digest every file that currently exists
fn snapshot(root: &Path, files: &[String]) -> Vec<Option<[u8; 32]>> {
    files
        .iter()
        .map(|f| file_digest(&root.join(f)).ok())
        .collect()
}

/// Run a hook against its selected files
#[tracing::instrument(skip_all, fields(hook_id = %hook.id, files = files.len()))]
pub fn execute(hook: &EffectiveHook, files: &[String], ctx: &ExecContext) -> Execution {
    let program = match resolve_program(hook, &ctx.project_root) {
        Ok(path) => path,
        Err(e) => return Execution::failed(None, String::new(), e.to_string()),
    };

    let before = snapshot(&ctx.project_root, files);
    let passed_files: &[String] = if hook.pass_filenames { files } else { &[] };

    let mut output = String::new();
    let mut exit_code = None;
    let mut failure = None;

    for batch in partition(passed_files) {
        let mut argv: Vec<&str> = hook.entry[1..].iter().map(String::as_str).collect();
        argv.extend(hook.args.iter().map(String::as_str));
        argv.extend(batch.iter().map(String::as_str));

        tracing::debug!(program = %program.display(), args = ?argv, "Invoking hook");

        let mut expr = duct::cmd(program.as_path(), &argv)
            .dir(&ctx.project_root)
            .env("PINHOOK", "1")
            .env("PINHOOK_REPO", &hook.repo)
            .env("PINHOOK_HOOK_ID", &hook.id);
        for (key, value) in &ctx.env {
            expr = expr.env(key, value);
        }
        let expr = expr.stderr_to_stdout().stdout_capture().unchecked();

        match invoke(&expr, ctx.timeout) {
            Ok(Invocation::Exited(out)) => {
                output.push_str(&String::from_utf8_lossy(&out.stdout));
                let code = out.status.code();
                if out.status.success() {
                    if failure.is_none() {
                        exit_code = code;
                    }
                } else if failure.is_none() {
                    exit_code = code;
                    failure = Some(match code {
                        Some(c) => format!("exit code {c}"),
                        None => "terminated by signal".to_string(),
                    });
                }
            }
            Ok(Invocation::TimedOut(limit)) => {
                failure.get_or_insert_with(|| format!("timed out after {}s", limit.as_secs()));
                exit_code = None;
                break;
            }
            Err(e) => {
                return Execution::failed(
                    None,
                    output,
                    format!("failed to start {}: {e}", program.display()),
                );
            }
        }
    }

    let after = snapshot(&ctx.project_root, files);
    let modified: Vec<&str> = files
        .iter()
        .zip(before.iter().zip(&after))
        .filter(|(_, (b, a))| b != a)
        .map(|(f, _)| f.as_str())
        .collect();

    if !modified.is_empty() {
        output.push_str(&format!("\nFiles modified by this hook:\n  {}\n", modified.join("\n  ")));
        failure.get_or_insert_with(|| "files were modified by this hook".to_string());
    }

    Execution {
        exit_code,
        output,
        failure,
    }
}

enum Invocation {
    Exited(std::process::Output),
    TimedOut(Duration),
}

fn invoke(expr: &duct::Expression, timeout: Option<Duration>) -> std::io::Result<Invocation> {
    let Some(limit) = timeout else {
        return expr.run().map(Invocation::Exited);
    };

    let handle = expr.start()?;
    match handle.wait_timeout(limit)? {
        Some(out) => Ok(Invocation::Exited(out.clone())),
        None => {
            handle.kill()?;
            Ok(Invocation::TimedOut(limit))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use pinhook_config::{FileFilter, TypeFilter};
    use std::fs;
    use tempfile::TempDir;

    fn hook(entry: &[&str]) -> EffectiveHook {
        EffectiveHook {
            repo: "local".to_string(),
            rev: String::new(),
            id: "test".to_string(),
            name: "test".to_string(),
            entry: entry.iter().map(ToString::to_string).collect(),
            args: Vec::new(),
            filter: FileFilter::accept_all(),
            types: TypeFilter::default(),
            pass_filenames: true,
            always_run: false,
            verbose: false,
            repo_dir: None,
        }
    }

    fn ctx(root: &Path) -> ExecContext {
        ExecContext {
            project_root: root.to_path_buf(),
            timeout: None,
            env: IndexMap::new(),
        }
    }

    #[test]
    fn test_partition_bounds() {
        let none: Vec<String> = Vec::new();
        assert_eq!(partition(&none).len(), 1);

        let many: Vec<String> = (0..2500).map(|i| format!("f{i}")).collect();
        let batches = partition(&many);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), MAX_FILES_PER_INVOCATION);
        assert_eq!(batches.iter().map(|b| b.len()).sum::<usize>(), 2500);

        let long: Vec<String> = (0..4).map(|i| format!("{i}{}", "x".repeat(40 * 1024))).collect();
        assert_eq!(partition(&long).len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_passing_hook_receives_files_and_env() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "a\n").unwrap();

        let mut h = hook(&["sh", "-c", "echo \"$PINHOOK:$PINHOOK_HOOK_ID:$*\"", "hook"]);
        h.args = vec!["--flag".to_string()];
        let run = execute(&h, &["a.txt".to_string()], &ctx(temp.path()));

        assert_eq!(run.failure, None);
        assert_eq!(run.exit_code, Some(0));
        assert_eq!(run.output.trim(), "1:test:--flag a.txt");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_fails_and_captures_stderr() {
        let temp = TempDir::new().unwrap();
        let run = execute(
            &hook(&["sh", "-c", "echo broken >&2; exit 3"]),
            &[],
            &ctx(temp.path()),
        );
        assert_eq!(run.exit_code, Some(3));
        assert_eq!(run.failure.as_deref(), Some("exit code 3"));
        assert!(run.output.contains("broken"));
    }

    #[cfg(unix)]
    #[test]
    fn test_modifying_files_fails() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "a  \n").unwrap();
        let run = execute(
            &hook(&["sh", "-c", "printf 'a\\n' > \"$1\"", "fixer"]),
            &["a.txt".to_string()],
            &ctx(temp.path()),
        );
        assert_eq!(run.exit_code, Some(0));
        assert_eq!(run.failure.as_deref(), Some("files were modified by this hook"));
        assert!(run.output.contains("a.txt"));
    }

    #[test]
    fn test_missing_program_fails() {
        let temp = TempDir::new().unwrap();
        let run = execute(
            &hook(&["pinhook-definitely-not-installed"]),
            &[],
            &ctx(temp.path()),
        );
        assert_eq!(run.exit_code, None);
        assert!(run.failure.unwrap().contains("not found"));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_hook() {
        let temp = TempDir::new().unwrap();
        let mut context = ctx(temp.path());
        context.timeout = Some(Duration::from_millis(200));
        let run = execute(&hook(&["sleep", "5"]), &[], &context);
        assert_eq!(run.exit_code, None);
        assert!(run.failure.unwrap().starts_with("timed out"));
    }

    #[cfg(unix)]
    #[test]
    fn test_entry_inside_checkout_runs_by_path() {
        use std::os::unix::fs::PermissionsExt;

        let checkout = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let script = checkout.path().join("check.sh");
        fs::write(&script, "#!/bin/sh\necho from-checkout\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let mut h = hook(&["check.sh"]);
        h.repo_dir = Some(checkout.path().to_path_buf());
        h.pass_filenames = false;
        let run = execute(&h, &[], &ctx(project.path()));
        assert_eq!(run.failure, None);
        assert_eq!(run.output.trim(), "from-checkout");
    }
}
