//! Hook metadata declared by a hook repository
//!
//! A hook repository lists what it provides in `.pinhook-hooks.toml` at its
//! root:
//!
//! ```toml
//! [[hooks]]
//! id = "trailing-whitespace"
//! name = "trim trailing whitespace"
//! entry = "bin/trailing-whitespace"
//! types = ["text"]
//! ```

use indexmap::IndexMap;
use pinhook_config::de::{self, Origin};
use pinhook_config::{FileFilter, TypeFilter};
use pinhook_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Metadata file at the root of a hook repository
pub const HOOKS_FILE: &str = ".pinhook-hooks.toml";

/// One hook as declared by its repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookDefinition {
    /// Hook identifier
    pub id: String,

    /// Display name (defaults to the id)
    #[serde(default)]
    pub name: Option<String>,

    /// Free-form description shown by `pinhook list`
    #[serde(default)]
    pub description: Option<String>,

    /// Command line to run
    pub entry: String,

    /// Default arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Default include pattern
    #[serde(default)]
    pub files: Option<String>,

    /// Default exclude pattern
    #[serde(default)]
    pub exclude: Option<String>,

    /// Default `types` filter
    #[serde(default)]
    pub types: Vec<String>,

    /// Default `types_or` filter
    #[serde(default)]
    pub types_or: Vec<String>,

    /// Default `exclude_types` filter
    #[serde(default)]
    pub exclude_types: Vec<String>,

    /// Append matching file names to the command line
    #[serde(default = "default_true")]
    pub pass_filenames: bool,

    /// Run even when no file matches
    #[serde(default)]
    pub always_run: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct HooksFile {
    #[serde(default)]
    hooks: Vec<HookDefinition>,
}

/// Parse a metadata document, keyed by hook id in declaration order
///
/// `origin` names the document in error messages.
pub fn parse_definitions(content: &str, origin: &str) -> Result<IndexMap<String, HookDefinition>> {
    let file: HooksFile = de::from_toml(content, Origin::Named(origin))?;

    let mut definitions = IndexMap::with_capacity(file.hooks.len());
    for (idx, def) in file.hooks.into_iter().enumerate() {
        let field = format!("{origin}:hooks[{idx}]");

        if def.id.trim().is_empty() {
            return Err(Error::malformed(format!("{field}.id"), "hook id must not be empty"));
        }
        if !shell_words::split(&def.entry).is_ok_and(|w| !w.is_empty()) {
            return Err(Error::malformed(
                format!("{field}.entry"),
                format!("hook '{}' has no usable entry", def.id),
            ));
        }
        FileFilter::compile(def.files.as_deref(), def.exclude.as_deref(), &field)?;
        TypeFilter::new(
            def.types.clone(),
            def.types_or.clone(),
            def.exclude_types.clone(),
            &field,
        )?;

        if definitions.contains_key(&def.id) {
            return Err(Error::malformed(
                format!("{field}.id"),
                format!("duplicate hook id '{}'", def.id),
            ));
        }
        definitions.insert(def.id.clone(), def);
    }

    Ok(definitions)
}

/// Load the metadata of a checked-out hook repository
///
/// A repository without a metadata file provides no hooks at all, which is
/// reported as a malformed repository.
pub fn load_definitions(
    checkout: &Path,
    url: &str,
    rev: &str,
) -> Result<IndexMap<String, HookDefinition>> {
    let path = checkout.join(HOOKS_FILE);
    let origin = format!("{url}@{rev}:{HOOKS_FILE}");

    if !path.is_file() {
        return Err(Error::malformed(origin, "hook repository has no metadata file"));
    }

    let content = fs::read_to_string(&path)?;
    parse_definitions(&content, &origin)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_defaults() {
        let defs = parse_definitions(
            r#"
[[hooks]]
id = "check-json"
entry = "bin/check-json"
types = ["json"]

[[hooks]]
id = "end-of-file"
name = "fix end of files"
entry = "python3 -m eof"
pass_filenames = false
always_run = true
"#,
            "test",
        )
        .unwrap();

        let ids: Vec<_> = defs.keys().map(String::as_str).collect();
        assert_eq!(ids, ["check-json", "end-of-file"]);

        let json = &defs["check-json"];
        assert!(json.pass_filenames);
        assert!(!json.always_run);
        assert_eq!(json.name, None);

        let eof = &defs["end-of-file"];
        assert!(!eof.pass_filenames);
        assert!(eof.always_run);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = parse_definitions(
            "[[hooks]]\nid = \"x\"\nentry = \"a\"\n[[hooks]]\nid = \"x\"\nentry = \"b\"\n",
            "repo",
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedConfig { ref field, .. } if field == "repo:hooks[1].id"));
    }

    #[test]
    fn test_empty_entry_rejected() {
        let err = parse_definitions("[[hooks]]\nid = \"x\"\nentry = \"  \"\n", "repo").unwrap_err();
        assert!(matches!(err, Error::MalformedConfig { ref field, .. } if field == "repo:hooks[0].entry"));
    }

    #[test]
    fn test_wrong_type_names_the_field() {
        let err = parse_definitions(
            "[[hooks]]\nid = \"x\"\nentry = \"a\"\n\n[[hooks]]\nid = \"y\"\nentry = \"b\"\nargs = [\"-v\", 2]\n",
            "repo",
        )
        .unwrap_err();
        assert!(
            matches!(err, Error::MalformedConfig { ref field, .. } if field == "repo:hooks[1].args[1]"),
            "{err:?}"
        );
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let err = parse_definitions(
            "[[hooks]]\nid = \"x\"\nentry = \"a\"\nfiles = \"(\"\n",
            "repo",
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn test_missing_metadata_file() {
        let temp = TempDir::new().unwrap();
        let err = load_definitions(temp.path(), "https://example.com/hooks", "v1").unwrap_err();
        match err {
            Error::MalformedConfig { field, .. } => {
                assert_eq!(field, "https://example.com/hooks@v1:.pinhook-hooks.toml");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_from_checkout() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(HOOKS_FILE),
            "[[hooks]]\nid = \"lint\"\nentry = \"lint.sh\"\n",
        )
        .unwrap();
        let defs = load_definitions(temp.path(), "https://example.com/hooks", "v1").unwrap();
        assert_eq!(defs["lint"].entry, "lint.sh");
    }
}
