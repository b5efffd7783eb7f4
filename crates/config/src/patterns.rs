//! File selection patterns
//!
//! `files` and `exclude` are regular expressions searched (not anchored)
//! against project-relative paths written with forward slashes, so
//! `\.py$` selects every Python file and `^docs/` a whole directory.
//! Patterns are compiled when the manifest is loaded, never at match time.

use crate::filetypes::{TagSet, is_known_tag};
use pinhook_core::{Error, Result};
use regex::Regex;

/// Compiled include/exclude pair
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl FileFilter {
    /// Filter that accepts every path
    #[must_use]
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// Compile an include/exclude pair
    ///
    /// `field` is the manifest path of the owner (e.g. `repos[0].hooks[2]`);
    /// it is used to point at the offending pattern on failure.
    pub fn compile(include: Option<&str>, exclude: Option<&str>, field: &str) -> Result<Self> {
        Ok(Self {
            include: compile_pattern(include, &format!("{field}.files"))?,
            exclude: compile_pattern(exclude, &format!("{field}.exclude"))?,
        })
    }

    /// Whether `path` passes the filter
    ///
    /// A missing include pattern accepts everything, a missing exclude
    /// pattern rejects nothing.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let included = self.include.as_ref().is_none_or(|re| re.is_match(path));
        let excluded = self.exclude.as_ref().is_some_and(|re| re.is_match(path));
        included && !excluded
    }

    /// Whether this filter narrows anything at all
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.include.is_none() && self.exclude.is_none()
    }
}

/// Compile a single optional pattern, treating an empty string as absent
fn compile_pattern(pattern: Option<&str>, field: &str) -> Result<Option<Regex>> {
    match pattern {
        None => Ok(None),
        Some(p) if p.is_empty() => Ok(None),
        Some(p) => Regex::new(p)
            .map(Some)
            .map_err(|e| Error::InvalidPattern {
                field: field.to_string(),
                pattern: p.to_string(),
                message: e.to_string(),
            }),
    }
}

/// Type-tag filter
///
/// - `types`: every tag must be present
/// - `types_or`: at least one tag must be present (ignored when empty)
/// - `exclude_types`: none of the tags may be present
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeFilter {
    types: Vec<String>,
    types_or: Vec<String>,
    exclude_types: Vec<String>,
}

impl TypeFilter {
    /// Build a filter after checking every tag against the known tag set
    pub fn new(
        types: Vec<String>,
        types_or: Vec<String>,
        exclude_types: Vec<String>,
        field: &str,
    ) -> Result<Self> {
        for (name, tags) in [
            ("types", &types),
            ("types_or", &types_or),
            ("exclude_types", &exclude_types),
        ] {
            if let Some(unknown) = tags.iter().find(|t| !is_known_tag(t)) {
                return Err(Error::malformed(
                    format!("{field}.{name}"),
                    format!("unknown file type tag '{unknown}'"),
                ));
            }
        }

        Ok(Self {
            types,
            types_or,
            exclude_types,
        })
    }

    /// Whether a file carrying `tags` passes the filter
    #[must_use]
    pub fn matches(&self, tags: &TagSet) -> bool {
        self.types.iter().all(|t| tags.contains(t.as_str()))
            && (self.types_or.is_empty() || self.types_or.iter().any(|t| tags.contains(t.as_str())))
            && !self.exclude_types.iter().any(|t| tags.contains(t.as_str()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use std::collections::BTreeSet;

    fn tags(list: &[&'static str]) -> TagSet {
        list.iter().copied().collect::<BTreeSet<_>>()
    }

    #[test]
    fn test_accept_all() {
        let filter = FileFilter::accept_all();
        assert!(filter.is_unrestricted());
        assert!(filter.matches("src/main.rs"));
        assert!(filter.matches("README.md"));
    }

    #[test]
    fn test_include_is_searched_not_anchored() {
        let filter = FileFilter::compile(Some(r"\.py$"), None, "hook").unwrap();
        assert!(filter.matches("pkg/module.py"));
        assert!(!filter.matches("pkg/module.pyc"));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let filter =
            FileFilter::compile(Some(r"\.py$"), Some(r"^migrations/"), "hook").unwrap();
        assert!(filter.matches("app/models.py"));
        assert!(!filter.matches("migrations/0001_initial.py"));
    }

    #[test]
    fn test_empty_pattern_is_absent() {
        let filter = FileFilter::compile(Some(""), Some(""), "hook").unwrap();
        assert!(filter.is_unrestricted());
    }

    #[test]
    fn test_invalid_pattern_reports_field() {
        let err = FileFilter::compile(None, Some("(unclosed"), "repos[0].hooks[1]").unwrap_err();
        match err {
            Error::InvalidPattern { field, pattern, .. } => {
                assert_eq!(field, "repos[0].hooks[1].exclude");
                assert_eq!(pattern, "(unclosed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_type_filter_semantics() {
        let filter = TypeFilter::new(
            vec!["text".to_string()],
            vec!["python".to_string(), "pyi".to_string()],
            vec!["executable".to_string()],
            "hook",
        )
        .unwrap();

        assert!(filter.matches(&tags(&["file", "text", "python"])));
        assert!(!filter.matches(&tags(&["file", "text", "rust"])));
        assert!(!filter.matches(&tags(&["file", "binary", "python"])));
        assert!(!filter.matches(&tags(&["file", "text", "python", "executable"])));
    }

    #[test]
    fn test_default_type_filter_accepts_everything() {
        assert!(TypeFilter::default().matches(&tags(&[])));
        assert!(TypeFilter::default().matches(&tags(&["file", "binary"])));
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let err = TypeFilter::new(vec!["pyhton".to_string()], vec![], vec![], "repos[0].hooks[0]")
            .unwrap_err();
        assert!(err.to_string().contains("repos[0].hooks[0].types"));
        assert!(err.to_string().contains("pyhton"));
    }
}
