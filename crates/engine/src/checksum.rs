//! Content hashing using SHA-256
//!
//! Three digests are used by the engine:
//! - [`cache_key`]: identity of a `(url, rev)` pair, names the checkout directory
//! - [`tree_checksum`]: content fingerprint of the fetched files of a checkout,
//!   recorded at fetch time and compared on every cache hit
//! - [`file_digest`]: per-file fingerprint used to notice hooks that rewrite
//!   the files they were given

use pinhook_core::{Error, Result};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use walkdir::WalkDir;

/// Cache key for a pinned repository
///
/// Hex SHA-256 of `url`, a NUL separator and `rev`. The separator keeps
/// `("ab", "c")` and `("a", "bc")` apart.
#[must_use]
pub fn cache_key(url: &str, rev: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update([0u8]);
    hasher.update(rev.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash a file with buffered reading
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn file_digest(path: &Path) -> std::io::Result<[u8; 32]> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    std::io::copy(&mut reader, &mut hasher)?;
    Ok(hasher.finalize().into())
}

/// Files of a freshly fetched checkout
///
/// Relative, forward-slash paths of every regular file and symlink below
/// `root`, the `.git` directory excepted, sorted. The list is recorded with
/// the checkout so later verification covers exactly what was fetched;
/// files a hook creates in its own checkout afterwards are not part of it.
///
/// # Errors
///
/// Returns an error if the tree cannot be walked.
pub fn fetched_files(root: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git");

    for entry in walker {
        let entry = entry.map_err(|e| Error::Message(format!("Failed to walk checkout: {e}")))?;
        if entry.file_type().is_dir() {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| Error::Message(format!("Failed to relativize path: {e}")))?
            .to_string_lossy()
            .replace('\\', "/");
        files.push(rel);
    }

    files.sort();
    Ok(files)
}

/// Kind tag folded into the tree checksum
#[derive(Clone, Copy)]
enum EntryKind {
    File,
    Link,
    Missing,
}

impl EntryKind {
    fn tag(self) -> &'static [u8] {
        match self {
            Self::File => b"f",
            Self::Link => b"l",
            Self::Missing => b"m",
        }
    }
}

fn entry_digest(path: &Path) -> std::io::Result<(EntryKind, [u8; 32])> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok((EntryKind::Missing, [0u8; 32]));
        }
        Err(e) => return Err(e),
    };

    if metadata.file_type().is_symlink() {
        let target = std::fs::read_link(path)?;
        Ok((EntryKind::Link, Sha256::digest(target.to_string_lossy().as_bytes()).into()))
    } else {
        Ok((EntryKind::File, file_digest(path)?))
    }
}

/// Fingerprint of the listed files of a checkout
///
/// Each path in `files` contributes itself, its kind and its content (the
/// link target for symlinks). A listed file that no longer exists is folded
/// in as missing, so deleting it changes the result instead of failing.
/// Paths outside the list do not contribute. File contents are hashed in
/// parallel.
///
/// # Errors
///
/// Returns an error if a listed file exists but cannot be read.
pub fn tree_checksum(root: &Path, files: &[String]) -> Result<String> {
    let digests: Vec<(EntryKind, [u8; 32])> = files
        .par_iter()
        .map(|rel| entry_digest(&root.join(rel)))
        .collect::<std::io::Result<_>>()?;

    let mut hasher = Sha256::new();
    for (rel, (kind, digest)) in files.iter().zip(&digests) {
        hasher.update(rel.as_bytes());
        hasher.update([0u8]);
        hasher.update(kind.tag());
        hasher.update(digest);
    }

    Ok(hex::encode(hasher.finalize()))
}
