//! Directory content hashing
//!
//! Feeds the relative path and byte content of every file under a directory
//! into a SHA256 digest. Entries are visited in case-insensitive name order at
//! each level so the result does not depend on the filesystem's listing order.

use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Output directory written by `cdk synth`
pub const CDK_OUT_DIR: &str = "cdk.out";

/// Which entries a directory hash skips
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirHashOptions {
    /// Skip files and directories whose name starts with `.`
    pub ignore_hidden: bool,
    /// Directory names skipped at any depth
    pub exclude_dirs: BTreeSet<String>,
    /// File extensions skipped at any depth (stored without the leading dot)
    pub exclude_extensions: BTreeSet<String>,
    /// Paths relative to the hashed directory that are skipped entirely
    pub exclude_paths: BTreeSet<PathBuf>,
}

impl DirHashOptions {
    /// Build options, normalizing extensions so `.pyc` and `pyc` are equivalent
    pub fn new<D, E>(ignore_hidden: bool, exclude_dirs: D, exclude_extensions: E) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self {
            ignore_hidden,
            exclude_dirs: exclude_dirs.into_iter().map(Into::into).collect(),
            exclude_extensions: exclude_extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_string())
                .filter(|ext| !ext.is_empty())
                .collect(),
            exclude_paths: BTreeSet::new(),
        }
    }

    /// Also skip `path`, given relative to the hashed directory
    pub fn exclude_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.exclude_paths.insert(path.into());
        self
    }

    fn is_excluded(&self, entry: &DirEntry, root: &Path) -> bool {
        // The root is always walked, whatever its name
        if entry.depth() == 0 {
            return false;
        }

        if !self.exclude_paths.is_empty() {
            if let Ok(rel) = entry.path().strip_prefix(root) {
                if self.exclude_paths.contains(rel) {
                    return true;
                }
            }
        }

        let name = entry.file_name().to_string_lossy();
        if self.ignore_hidden && name.starts_with('.') {
            return true;
        }

        if entry.file_type().is_dir() {
            return self.exclude_dirs.contains(&*name);
        }

        entry
            .path()
            .extension()
            .is_some_and(|ext| self.exclude_extensions.contains(&*ext.to_string_lossy()))
    }
}

impl Default for DirHashOptions {
    fn default() -> Self {
        Self::new(true, [CDK_OUT_DIR], Vec::<String>::new())
    }
}

fn by_lowercase_name(a: &DirEntry, b: &DirEntry) -> Ordering {
    let a_name = a.file_name().to_string_lossy();
    let b_name = b.file_name().to_string_lossy();
    a_name
        .to_lowercase()
        .cmp(&b_name.to_lowercase())
        .then_with(|| a_name.cmp(&b_name))
}

/// Feed the contents of `dir` into `hasher`
///
/// A directory that does not exist, or entries that vanish while walking,
/// leave the hasher untouched rather than failing. Empty directories
/// contribute nothing.
pub fn hash_dir_into(dir: &Path, hasher: &mut Sha256, options: &DirHashOptions) {
    let walker = WalkDir::new(dir)
        .follow_links(true)
        .sort_by(by_lowercase_name)
        .into_iter()
        .filter_entry(|entry| !options.is_excluded(entry, dir));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!("Skipping entry while hashing {}: {}", dir.display(), err);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let rel_path = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        if let Err(err) = hash_file_into(entry.path(), &rel_path.to_string_lossy(), hasher) {
            debug!("Skipping unreadable file {}: {}", entry.path().display(), err);
        }
    }
}

/// Hash the contents of `dir`, returning a hex digest
pub fn hash_dir(dir: &Path, options: &DirHashOptions) -> String {
    let mut hasher = Sha256::new();
    hash_dir_into(dir, &mut hasher, options);
    hex::encode(hasher.finalize())
}

fn hash_file_into(path: &Path, rel_path: &str, hasher: &mut Sha256) -> io::Result<()> {
    let mut file = File::open(path)?;

    hasher.update(rel_path.replace('\\', "/").as_bytes());
    hasher.update([0u8]);
    // Streams through a fixed-size buffer, never holding the whole file
    let len = io::copy(&mut file, hasher)?;
    hasher.update(len.to_le_bytes());
    Ok(())
}
