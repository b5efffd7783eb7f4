//! Hook manifest
//!
//! The manifest lists hook sources (a repository URL pinned at a revision)
//! and, for each, the hooks to run from it. Order matters everywhere: sources
//! run in listed order and hooks in declaration order.
//!
//! ```toml
//! fail_fast = false
//! exclude = '^vendor/'
//!
//! [[repos]]
//! repo = "https://github.com/example/pinhook-hooks"
//! rev = "v4.5.0"
//!
//! [[repos.hooks]]
//! id = "trailing-whitespace"
//!
//! [[repos.hooks]]
//! id = "indent"
//! args = ["--indent", "4"]
//! files = '\.json$'
//!
//! [[repos]]
//! repo = "local"
//!
//! [[repos.hooks]]
//! id = "cargo-fmt"
//! entry = "cargo fmt --check --"
//! types = ["rust"]
//! ```
//!
//! JSON documents with the same shape are accepted when the file name ends
//! in `.json`.

use crate::de::{self, Origin};
use crate::patterns::{FileFilter, TypeFilter};
use pinhook_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Repository URL marking hooks defined inside the project itself
pub const LOCAL_REPO: &str = "local";

/// Default manifest file name, looked up in the project root
pub const MANIFEST_FILE: &str = ".pinhook.toml";

/// Alternative JSON manifest file name
pub const MANIFEST_FILE_JSON: &str = ".pinhook.json";

/// Full ordered hook configuration of a project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Stop running hooks after the first failure
    #[serde(default, skip_serializing_if = "is_false")]
    pub fail_fast: bool,

    /// Global include pattern applied before every hook's own filters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<String>,

    /// Global exclude pattern applied before every hook's own filters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,

    /// Hook sources in execution order
    #[serde(default)]
    pub repos: Vec<HookSource>,
}

/// An external repository pinned at a revision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookSource {
    /// Repository URL, or `local`
    pub repo: String,

    /// Pinned revision (tag, branch or commit); not used by local sources
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rev: String,

    /// Hooks taken from this repository, in execution order
    #[serde(default)]
    pub hooks: Vec<HookDeclaration>,
}

/// One hook as declared in the manifest
///
/// Every optional field overrides the value the hook repository declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookDeclaration {
    /// Hook identifier, unique within its source
    pub id: String,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Command line to run (required for local hooks)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,

    /// Extra arguments, passed before the file list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,

    /// Include pattern (regex)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<String>,

    /// Exclude pattern (regex)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,

    /// File must carry all of these tags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,

    /// File must carry at least one of these tags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types_or: Option<Vec<String>>,

    /// File must carry none of these tags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_types: Option<Vec<String>>,

    /// Append matching file names to the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_filenames: Option<bool>,

    /// Run even when no file matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub always_run: Option<bool>,

    /// Print the hook output even when it passes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

impl HookSource {
    /// Whether this source refers to hooks defined in the project itself
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.repo == LOCAL_REPO
    }

    /// `url@rev` label used in logs and reports
    #[must_use]
    pub fn label(&self) -> String {
        if self.is_local() {
            LOCAL_REPO.to_string()
        } else {
            format!("{}@{}", self.repo, self.rev)
        }
    }
}

impl Manifest {
    /// Load and validate a manifest file
    ///
    /// The format is chosen by extension: `.json` is parsed as JSON,
    /// everything else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Message(format!("Failed to read manifest {}: {e}", path.display()))
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let manifest = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_toml_str(&content)?
        };

        tracing::debug!(
            path = %path.display(),
            sources = manifest.repos.len(),
            hooks = manifest.hook_count(),
            "Loaded manifest"
        );

        Ok(manifest)
    }

    /// Parse and validate a TOML manifest
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let manifest: Self = de::from_toml(content, Origin::Bare)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Parse and validate a JSON manifest
    pub fn from_json_str(content: &str) -> Result<Self> {
        let manifest: Self = de::from_json(content, Origin::Bare)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Serialize back to TOML, preserving source and hook order
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Message(format!("Failed to serialize manifest: {e}")))
    }

    /// Check every structural rule and compile every pattern
    pub fn validate(&self) -> Result<()> {
        self.global_filter()?;

        for (source_idx, source) in self.repos.iter().enumerate() {
            let field = format!("repos[{source_idx}]");

            if source.repo.trim().is_empty() {
                return Err(Error::malformed(
                    format!("{field}.repo"),
                    "repository URL must not be empty",
                ));
            }

            if !source.is_local() && source.rev.trim().is_empty() {
                return Err(Error::malformed(
                    format!("{field}.rev"),
                    format!("revision must not be empty for {}", source.repo),
                ));
            }

            let mut seen = HashSet::new();
            for (hook_idx, hook) in source.hooks.iter().enumerate() {
                let hook_field = format!("{field}.hooks[{hook_idx}]");
                hook.validate(&hook_field, source.is_local())?;

                if !seen.insert(hook.id.as_str()) {
                    return Err(Error::malformed(
                        format!("{hook_field}.id"),
                        format!("duplicate hook id '{}' in {}", hook.id, source.repo),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Compiled top-level `files` / `exclude` pair
    pub fn global_filter(&self) -> Result<FileFilter> {
        FileFilter::compile(self.files.as_deref(), self.exclude.as_deref(), "manifest")
    }

    /// Total number of declared hooks
    #[must_use]
    pub fn hook_count(&self) -> usize {
        self.repos.iter().map(|r| r.hooks.len()).sum()
    }

    /// Non-local `(url, rev)` pairs referenced by this manifest
    pub fn remote_sources(&self) -> impl Iterator<Item = (&str, &str)> {
        self.repos
            .iter()
            .filter(|r| !r.is_local())
            .map(|r| (r.repo.as_str(), r.rev.as_str()))
    }
}

impl HookDeclaration {
    /// Validate a single declaration
    fn validate(&self, field: &str, local: bool) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::malformed(
                format!("{field}.id"),
                "hook id must not be empty",
            ));
        }

        if local && self.entry.as_deref().is_none_or(|e| e.trim().is_empty()) {
            return Err(Error::malformed(
                format!("{field}.entry"),
                format!("local hook '{}' must declare an entry", self.id),
            ));
        }

        if let Some(entry) = &self.entry
            && shell_words::split(entry).is_err()
        {
            return Err(Error::malformed(
                format!("{field}.entry"),
                format!("cannot parse entry '{entry}'"),
            ));
        }

        FileFilter::compile(self.files.as_deref(), self.exclude.as_deref(), field)?;
        self.type_filter(field)?;

        Ok(())
    }

    /// Type filter built from the declaration's own tags
    pub fn type_filter(&self, field: &str) -> Result<TypeFilter> {
        TypeFilter::new(
            self.types.clone().unwrap_or_default(),
            self.types_or.clone().unwrap_or_default(),
            self.exclude_types.clone().unwrap_or_default(),
            field,
        )
    }
}

/// Starter manifest written by `pinhook sample-config`
#[must_use]
pub fn sample_config() -> &'static str {
    r#"# pinhook manifest
# Sources run in listed order, hooks in declaration order.

[[repos]]
repo = "https://github.com/example/pinhook-hooks"
rev = "v1.0.0"

[[repos.hooks]]
id = "trailing-whitespace"

[[repos.hooks]]
id = "end-of-file-fixer"

[[repos]]
repo = "local"

[[repos.hooks]]
id = "cargo-fmt"
name = "cargo fmt"
entry = "cargo fmt --check --"
types = ["rust"]
"#
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use tempfile::TempDir;

    const TWO_SOURCES: &str = r#"
exclude = '^vendor/'

[[repos]]
repo = "https://example.com/zeta-hooks"
rev = "v2.1.0"

[[repos.hooks]]
id = "zeta"
args = ["--indent", "4"]

[[repos.hooks]]
id = "alpha"
files = '\.json$'

[[repos]]
repo = "https://example.com/beta-hooks"
rev = "0123abcd"

[[repos.hooks]]
id = "beta"
exclude = '^docs/'
"#;

    fn expect_malformed(content: &str, expected_field: &str) {
        match Manifest::from_toml_str(content) {
            Err(Error::MalformedConfig { field, .. }) => assert_eq!(field, expected_field),
            other => panic!("expected MalformedConfig at {expected_field}, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_preserves_order() {
        let manifest = Manifest::from_toml_str(TWO_SOURCES).unwrap();
        assert_eq!(manifest.repos.len(), 2);
        assert_eq!(manifest.repos[0].repo, "https://example.com/zeta-hooks");
        let ids: Vec<_> = manifest.repos[0].hooks.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["zeta", "alpha"]);
        assert_eq!(
            manifest.repos[0].hooks[0].args.as_deref(),
            Some(&["--indent".to_string(), "4".to_string()][..])
        );
        assert_eq!(manifest.hook_count(), 3);
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let manifest = Manifest::from_toml_str(TWO_SOURCES).unwrap();
        let serialized = manifest.to_toml_string().unwrap();
        let reparsed = Manifest::from_toml_str(&serialized).unwrap();
        assert_eq!(manifest, reparsed);
    }

    #[test]
    fn test_json_manifest() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(MANIFEST_FILE_JSON);
        fs::write(
            &path,
            r#"{"repos": [{"repo": "https://example.com/hooks", "rev": "v1", "hooks": [{"id": "check"}]}]}"#,
        )
        .unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.repos[0].hooks[0].id, "check");
    }

    #[test]
    fn test_empty_rev_rejected() {
        expect_malformed(
            r#"
[[repos]]
repo = "https://example.com/hooks"
hooks = [{ id = "x" }]
"#,
            "repos[0].rev",
        );
    }

    #[test]
    fn test_empty_repo_rejected() {
        expect_malformed(
            r#"
[[repos]]
repo = ""
rev = "v1"
"#,
            "repos[0].repo",
        );
    }

    #[test]
    fn test_empty_hook_id_rejected() {
        expect_malformed(
            r#"
[[repos]]
repo = "https://example.com/hooks"
rev = "v1"
hooks = [{ id = "ok" }, { id = " " }]
"#,
            "repos[0].hooks[1].id",
        );
    }

    #[test]
    fn test_duplicate_hook_id_rejected() {
        expect_malformed(
            r#"
[[repos]]
repo = "https://example.com/hooks"
rev = "v1"
hooks = [{ id = "dup" }, { id = "dup" }]
"#,
            "repos[0].hooks[1].id",
        );
    }

    #[test]
    fn test_same_id_in_different_sources_allowed() {
        let manifest = Manifest::from_toml_str(
            r#"
[[repos]]
repo = "https://example.com/a"
rev = "v1"
hooks = [{ id = "check" }]

[[repos]]
repo = "https://example.com/b"
rev = "v1"
hooks = [{ id = "check" }]
"#,
        );
        assert!(manifest.is_ok());
    }

    #[test]
    fn test_local_hook_requires_entry() {
        expect_malformed(
            r#"
[[repos]]
repo = "local"
hooks = [{ id = "fmt" }]
"#,
            "repos[0].hooks[0].entry",
        );
    }

    #[test]
    fn test_local_source_needs_no_rev() {
        let manifest = Manifest::from_toml_str(
            r#"
[[repos]]
repo = "local"
hooks = [{ id = "fmt", entry = "cargo fmt --check" }]
"#,
        )
        .unwrap();
        assert!(manifest.repos[0].is_local());
        assert_eq!(manifest.remote_sources().count(), 0);
    }

    #[test]
    fn test_non_string_args_rejected() {
        expect_malformed(
            r#"
[[repos]]
repo = "https://example.com/hooks"
rev = "v1"
hooks = [{ id = "x", args = ["--width", 4] }]
"#,
            "repos[0].hooks[0].args[1]",
        );
    }

    #[test]
    fn test_wrong_type_names_the_field() {
        expect_malformed(
            r#"
fail_fast = true

[[repos]]
repo = "local"
hooks = [{ id = "a", entry = "true" }]

[[repos]]
repo = "https://example.com/hooks"
rev = 3
hooks = [{ id = "x" }]
"#,
            "repos[1].rev",
        );
        expect_malformed("fail_fast = \"yes\"\nrepos = []\n", "fail_fast");
        expect_malformed("repos = [", "<document>");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let content = r#"
[[repos]]
repo = "https://example.com/hooks"
rev = "v1"
hooks = [{ id = "x", exclud = "typo" }]
"#;
        match Manifest::from_toml_str(content) {
            Err(Error::MalformedConfig { field, message }) => {
                assert!(field.starts_with("repos[0].hooks[0]"), "{field}");
                assert!(message.contains("exclud"));
            }
            other => panic!("expected MalformedConfig, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_pattern_fails_at_load() {
        let err = Manifest::from_toml_str(
            r#"
[[repos]]
repo = "https://example.com/hooks"
rev = "v1"
hooks = [{ id = "x", files = "[a-" }]
"#,
        )
        .unwrap_err();
        match err {
            Error::InvalidPattern { field, .. } => assert_eq!(field, "repos[0].hooks[0].files"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_global_pattern_fails_at_load() {
        let err = Manifest::from_toml_str("exclude = '(vendor'\n").unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { ref field, .. } if field == "manifest.exclude"));
    }

    #[test]
    fn test_source_label() {
        let manifest = Manifest::from_toml_str(TWO_SOURCES).unwrap();
        assert_eq!(
            manifest.repos[1].label(),
            "https://example.com/beta-hooks@0123abcd"
        );
    }

    #[test]
    fn test_sample_config_is_valid() {
        let manifest = Manifest::from_toml_str(sample_config()).unwrap();
        assert_eq!(manifest.repos.len(), 2);
    }
}
