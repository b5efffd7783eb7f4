//! Effective hook: what actually runs
//!
//! For a remote source, every field comes from the repository's
//! [`HookDefinition`] unless the manifest declaration overrides it. Local
//! hooks have no definition; the declaration is all there is.

use super::ChangedFile;
use crate::resolver::{HookDefinition, ResolvedRepo};
use pinhook_config::{FileFilter, HookDeclaration, LOCAL_REPO, TypeFilter};
use pinhook_core::{Error, Result};
use std::path::PathBuf;

/// A fully resolved, ready to run hook
#[derive(Debug, Clone)]
pub struct EffectiveHook {
    /// Source repository URL (`local` for project hooks)
    pub repo: String,
    /// Pinned revision (empty for project hooks)
    pub rev: String,
    /// Hook id
    pub id: String,
    /// Display name
    pub name: String,
    /// Entry split into program and leading arguments
    pub entry: Vec<String>,
    /// Arguments placed after the entry and before the file list
    pub args: Vec<String>,
    /// Include/exclude patterns
    pub filter: FileFilter,
    /// Type tag filter
    pub types: TypeFilter,
    /// Append matching file names to the command line
    pub pass_filenames: bool,
    /// Run even with an empty file selection
    pub always_run: bool,
    /// Show output even on success
    pub verbose: bool,
    /// Checkout the entry may live in (remote sources only)
    pub repo_dir: Option<PathBuf>,
}

fn split_entry(entry: &str, field: &str) -> Result<Vec<String>> {
    let words = shell_words::split(entry)
        .map_err(|e| Error::malformed(format!("{field}.entry"), format!("cannot parse entry: {e}")))?;
    if words.is_empty() {
        return Err(Error::malformed(format!("{field}.entry"), "entry is empty"));
    }
    Ok(words)
}

impl EffectiveHook {
    /// Build a hook declared in a `local` source
    ///
    /// `field` is the declaration's manifest path, used in error messages.
    pub fn from_local(decl: &HookDeclaration, field: &str) -> Result<Self> {
        let entry = decl
            .entry
            .as_deref()
            .ok_or_else(|| Error::malformed(format!("{field}.entry"), "local hooks need an entry"))?;

        Ok(Self {
            repo: LOCAL_REPO.to_string(),
            rev: String::new(),
            id: decl.id.clone(),
            name: decl.name.clone().unwrap_or_else(|| decl.id.clone()),
            entry: split_entry(entry, field)?,
            args: decl.args.clone().unwrap_or_default(),
            filter: FileFilter::compile(decl.files.as_deref(), decl.exclude.as_deref(), field)?,
            types: decl.type_filter(field)?,
            pass_filenames: decl.pass_filenames.unwrap_or(true),
            always_run: decl.always_run.unwrap_or(false),
            verbose: decl.verbose.unwrap_or(false),
            repo_dir: None,
        })
    }

    /// Overlay a declaration on the definition its repository provides
    pub fn from_definition(repo: &ResolvedRepo, decl: &HookDeclaration, field: &str) -> Result<Self> {
        let def: &HookDefinition = repo.definition(&decl.id)?;

        let entry = decl.entry.as_deref().unwrap_or(&def.entry);
        let files = decl.files.as_deref().or(def.files.as_deref());
        let exclude = decl.exclude.as_deref().or(def.exclude.as_deref());
        let types = TypeFilter::new(
            decl.types.clone().unwrap_or_else(|| def.types.clone()),
            decl.types_or.clone().unwrap_or_else(|| def.types_or.clone()),
            decl.exclude_types
                .clone()
                .unwrap_or_else(|| def.exclude_types.clone()),
            field,
        )?;

        Ok(Self {
            repo: repo.url.clone(),
            rev: repo.rev.clone(),
            id: decl.id.clone(),
            name: decl
                .name
                .clone()
                .or_else(|| def.name.clone())
                .unwrap_or_else(|| decl.id.clone()),
            entry: split_entry(entry, field)?,
            args: decl.args.clone().unwrap_or_else(|| def.args.clone()),
            filter: FileFilter::compile(files, exclude, field)?,
            types,
            pass_filenames: decl.pass_filenames.unwrap_or(def.pass_filenames),
            always_run: decl.always_run.unwrap_or(def.always_run),
            verbose: decl.verbose.unwrap_or(false),
            repo_dir: Some(repo.path.clone()),
        })
    }

    /// Files this hook applies to, in input order
    #[must_use]
    pub fn select<'f>(&self, files: &'f [ChangedFile]) -> Vec<&'f ChangedFile> {
        files
            .iter()
            .filter(|f| self.filter.matches(&f.path) && self.types.matches(&f.tags))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::resolver::definition::parse_definitions;
    use pinhook_config::TagSet;

    fn changed(path: &str, tags: &[&'static str]) -> ChangedFile {
        ChangedFile {
            path: path.to_string(),
            tags: tags.iter().copied().collect::<TagSet>(),
        }
    }

    fn sample_files() -> Vec<ChangedFile> {
        vec![
            changed("src/app.py", &["file", "text", "python"]),
            changed("docs/index.md", &["file", "text", "markdown"]),
            changed("assets/logo.png", &["file", "binary"]),
        ]
    }

    fn repo() -> ResolvedRepo {
        ResolvedRepo {
            url: "https://example.com/hooks".to_string(),
            rev: "v1".to_string(),
            path: PathBuf::from("/cache/repos/abc"),
            checksum: String::new(),
            hooks: parse_definitions(
                r#"
[[hooks]]
id = "check"
name = "Check things"
entry = "bin/check --strict"
args = ["--default"]
types = ["text"]
"#,
                "test",
            )
            .unwrap(),
            from_cache: false,
        }
    }

    fn decl(id: &str) -> HookDeclaration {
        HookDeclaration {
            id: id.to_string(),
            ..HookDeclaration::default()
        }
    }

    #[test]
    fn test_definition_defaults_apply() {
        let hook = EffectiveHook::from_definition(&repo(), &decl("check"), "repos[0].hooks[0]").unwrap();
        assert_eq!(hook.name, "Check things");
        assert_eq!(hook.entry, ["bin/check", "--strict"]);
        assert_eq!(hook.args, ["--default"]);
        assert!(hook.pass_filenames);
        assert_eq!(hook.repo_dir, Some(PathBuf::from("/cache/repos/abc")));

        let files = sample_files();
        let selected: Vec<_> = hook.select(&files).iter().map(|f| f.path.as_str()).collect();
        assert_eq!(selected, ["src/app.py", "docs/index.md"]);
    }

    #[test]
    fn test_declaration_overrides_definition() {
        let declaration = HookDeclaration {
            args: Some(vec!["--indent".to_string(), "4".to_string()]),
            exclude: Some("^docs/".to_string()),
            types: Some(vec![]),
            pass_filenames: Some(false),
            name: Some("custom".to_string()),
            ..decl("check")
        };
        let hook = EffectiveHook::from_definition(&repo(), &declaration, "repos[0].hooks[0]").unwrap();
        assert_eq!(hook.name, "custom");
        assert_eq!(hook.args, ["--indent", "4"]);
        assert!(!hook.pass_filenames);

        let files = sample_files();
        let selected: Vec<_> = hook.select(&files).iter().map(|f| f.path.as_str()).collect();
        assert_eq!(selected, ["src/app.py", "assets/logo.png"]);
    }

    #[test]
    fn test_unfiltered_hook_gets_every_file() {
        let declaration = HookDeclaration {
            entry: Some("true".to_string()),
            ..decl("all")
        };
        let hook = EffectiveHook::from_local(&declaration, "repos[0].hooks[0]").unwrap();
        let files = sample_files();
        assert_eq!(hook.select(&files).len(), files.len());
        assert_eq!(hook.repo, LOCAL_REPO);
        assert!(hook.repo_dir.is_none());
    }

    #[test]
    fn test_exclude_everything_selects_nothing() {
        let declaration = HookDeclaration {
            entry: Some("true".to_string()),
            exclude: Some(".*".to_string()),
            ..decl("none")
        };
        let hook = EffectiveHook::from_local(&declaration, "repos[0].hooks[0]").unwrap();
        assert!(hook.select(&sample_files()).is_empty());
    }

    #[test]
    fn test_missing_hook_is_hook_not_found() {
        let err = EffectiveHook::from_definition(&repo(), &decl("absent"), "repos[0].hooks[0]").unwrap_err();
        assert!(matches!(err, Error::HookNotFound { .. }));
    }
}
