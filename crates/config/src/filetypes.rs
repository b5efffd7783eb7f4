//! File type tags
//!
//! Hooks narrow their file set with `types`, `types_or` and `exclude_types`.
//! A file's tags come from its kind (`file`, `symlink`), permissions
//! (`executable` / `non-executable`), content (`text` / `binary`) and
//! name (language tags keyed by extension or well-known file name).

use std::collections::BTreeSet;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Set of tags attached to a file
pub type TagSet = BTreeSet<&'static str>;

/// Tags derived from file metadata and content
const MODE_TAGS: &[&str] = &[
    "file",
    "symlink",
    "executable",
    "non-executable",
    "text",
    "binary",
];

/// Extension -> tags
const EXTENSIONS: &[(&str, &[&str])] = &[
    ("bash", &["shell", "bash"]),
    ("c", &["c"]),
    ("cfg", &["ini"]),
    ("cpp", &["c++"]),
    ("css", &["css"]),
    ("go", &["go"]),
    ("h", &["header", "c"]),
    ("hpp", &["header", "c++"]),
    ("html", &["html"]),
    ("ini", &["ini"]),
    ("java", &["java"]),
    ("js", &["javascript"]),
    ("json", &["json"]),
    ("jsx", &["javascript", "jsx"]),
    ("lua", &["lua"]),
    ("md", &["markdown"]),
    ("nix", &["nix"]),
    ("php", &["php"]),
    ("py", &["python"]),
    ("pyi", &["python", "pyi"]),
    ("rb", &["ruby"]),
    ("rs", &["rust"]),
    ("rst", &["rst"]),
    ("sh", &["shell", "sh"]),
    ("sql", &["sql"]),
    ("toml", &["toml"]),
    ("ts", &["ts"]),
    ("tsx", &["ts", "tsx"]),
    ("txt", &["plain-text"]),
    ("xml", &["xml"]),
    ("yaml", &["yaml"]),
    ("yml", &["yaml"]),
    ("zsh", &["shell", "zsh"]),
];

/// Exact file name -> tags
const NAMES: &[(&str, &[&str])] = &[
    ("Cargo.lock", &["toml"]),
    ("Dockerfile", &["dockerfile"]),
    ("Makefile", &["makefile"]),
    ("go.mod", &["go-mod"]),
    ("pyproject.toml", &["toml", "pyproject"]),
];

/// Whether `tag` can ever be produced by [`tags_for_path`]
#[must_use]
pub fn is_known_tag(tag: &str) -> bool {
    MODE_TAGS.contains(&tag)
        || EXTENSIONS.iter().any(|(_, tags)| tags.contains(&tag))
        || NAMES.iter().any(|(_, tags)| tags.contains(&tag))
}

/// Tags derived from the file name alone
#[must_use]
pub fn tags_from_name(path: &Path) -> TagSet {
    let mut tags = TagSet::new();

    if let Some(name) = path.file_name().and_then(|n| n.to_str())
        && let Some((_, name_tags)) = NAMES.iter().find(|(n, _)| *n == name)
    {
        tags.extend(name_tags.iter().copied());
    }

    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        let ext = ext.to_ascii_lowercase();
        if let Some((_, ext_tags)) = EXTENSIONS.iter().find(|(e, _)| *e == ext) {
            tags.extend(ext_tags.iter().copied());
        }
    }

    tags
}

/// Compute every tag for a file on disk
///
/// Missing files (e.g. staged deletions) get name tags only.
#[must_use]
pub fn tags_for_path(path: &Path) -> TagSet {
    let mut tags = tags_from_name(path);

    let Ok(metadata) = fs::symlink_metadata(path) else {
        return tags;
    };

    if metadata.file_type().is_symlink() {
        tags.insert("symlink");
        return tags;
    }

    if !metadata.is_file() {
        return tags;
    }

    tags.insert("file");
    tags.insert(if is_executable(&metadata) {
        "executable"
    } else {
        "non-executable"
    });
    tags.insert(if looks_like_text(path) { "text" } else { "binary" });

    tags
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool {
    false
}

/// Sniff the first KiB for NUL bytes
fn looks_like_text(path: &Path) -> bool {
    let mut buf = [0u8; 1024];
    let Ok(mut file) = fs::File::open(path) else {
        return false;
    };
    match file.read(&mut buf) {
        Ok(n) => !buf[..n].contains(&0),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_known_tags() {
        assert!(is_known_tag("python"));
        assert!(is_known_tag("text"));
        assert!(is_known_tag("dockerfile"));
        assert!(!is_known_tag("pyhton"));
    }

    #[test]
    fn test_name_tags() {
        let tags = tags_from_name(Path::new("src/lib.rs"));
        assert!(tags.contains("rust"));

        let tags = tags_from_name(Path::new("types/stub.PYI"));
        assert!(tags.contains("python"));
        assert!(tags.contains("pyi"));

        let tags = tags_from_name(Path::new("pyproject.toml"));
        assert!(tags.contains("pyproject"));
        assert!(tags.contains("toml"));
    }

    #[test]
    fn test_text_and_binary() {
        let temp = TempDir::new().unwrap();
        let text = temp.path().join("notes.md");
        let binary = temp.path().join("blob.bin");
        fs::write(&text, "# hello\n").unwrap();
        fs::write(&binary, [0u8, 159, 146, 150]).unwrap();

        let tags = tags_for_path(&text);
        assert!(tags.contains("file"));
        assert!(tags.contains("text"));
        assert!(tags.contains("markdown"));
        assert!(tags.contains("non-executable"));

        let tags = tags_for_path(&binary);
        assert!(tags.contains("binary"));
        assert!(!tags.contains("text"));
    }

    #[cfg(unix)]
    #[test]
    fn test_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let script = temp.path().join("run.sh");
        fs::write(&script, "#!/bin/sh\necho hi\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let tags = tags_for_path(&script);
        assert!(tags.contains("executable"));
        assert!(tags.contains("shell"));
    }

    #[test]
    fn test_missing_file_gets_name_tags_only() {
        let tags = tags_for_path(Path::new("/nonexistent/dir/app.py"));
        assert!(tags.contains("python"));
        assert!(!tags.contains("file"));
    }
}
