//! On-disk result store
//!
//! Entries live at `<root>/<app namespace>/<operation>/<fingerprint>.json`.
//! Reads treat anything short of a well-formed entry as a miss; writes go
//! through a temporary file and a rename so a crash never leaves a torn entry
//! behind under its final name.

use crate::error::{CdkTestError, CdkTestResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Bumped when the entry envelope changes shape
pub const ENTRY_VERSION: u32 = 1;

/// A stored operation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// Envelope format version
    pub version: u32,
    /// Operation that produced the value (synthesize, deploy, ...)
    pub operation: String,
    /// When the entry was written
    pub created_at: DateTime<Utc>,
    /// The cached result
    pub value: T,
}

/// Summary of an entry on disk, without decoding its value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub operation: String,
    pub key: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Keyed store rooted at a cache directory
#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    /// Create a store rooted at `root`. Nothing is created until the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every entry for one app
    pub fn namespace_dir(&self, namespace: &str) -> PathBuf {
        self.root.join(namespace)
    }

    /// Path an entry is stored at
    pub fn entry_path(&self, namespace: &str, operation: &str, key: &str) -> PathBuf {
        self.namespace_dir(namespace).join(operation).join(key)
    }

    /// Read a previously stored result
    ///
    /// Missing or unreadable entries and entries that do not decode as `T` for
    /// this operation all come back as `None`.
    pub async fn lookup<T: DeserializeOwned>(
        &self,
        namespace: &str,
        operation: &str,
        key: &str,
    ) -> Option<T> {
        let path = self.entry_path(namespace, operation, key);

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Could not read from cache path {}: {}", path.display(), e);
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        if entry.version != ENTRY_VERSION || entry.operation != operation {
            warn!(
                "Ignoring cache entry {} (version {}, operation {})",
                path.display(),
                entry.version,
                entry.operation
            );
            return None;
        }

        Some(entry.value)
    }

    /// Write a result, creating the namespace and operation directories
    pub async fn store<T: Serialize>(
        &self,
        namespace: &str,
        operation: &str,
        key: &str,
        value: &T,
    ) -> CdkTestResult<PathBuf> {
        let path = self.entry_path(namespace, operation, key);
        let dir = self.namespace_dir(namespace).join(operation);

        fs::create_dir_all(&dir)
            .await
            .map_err(|e| CdkTestError::CacheWrite {
                path: dir.clone(),
                source: e,
            })?;

        let entry = CacheEntry {
            version: ENTRY_VERSION,
            operation: operation.to_string(),
            created_at: Utc::now(),
            value,
        };
        let content = serde_json::to_vec(&entry)?;

        let tmp_path = dir.join(format!(".{}.{}.tmp", key, std::process::id()));
        if let Err(e) = fs::write(&tmp_path, &content).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(CdkTestError::CacheWrite {
                path: tmp_path,
                source: e,
            });
        }

        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| CdkTestError::CacheWrite {
                path: path.clone(),
                source: e,
            })?;

        debug!("Stored cache entry {}", path.display());
        Ok(path)
    }

    /// List the entries stored for one app, sorted by operation then key
    pub async fn list(&self, namespace: &str) -> CdkTestResult<Vec<EntryInfo>> {
        let ns_dir = self.namespace_dir(namespace);
        let mut entries = Vec::new();

        for operation in read_dir_names(&ns_dir).await? {
            let op_dir = ns_dir.join(&operation);
            if !op_dir.is_dir() {
                continue;
            }

            for key in read_dir_names(&op_dir).await? {
                // In-flight temporary files are hidden
                if key.starts_with('.') {
                    continue;
                }
                let path = op_dir.join(&key);
                let size_bytes = match fs::metadata(&path).await {
                    Ok(meta) if meta.is_file() => meta.len(),
                    _ => continue,
                };
                entries.push(EntryInfo {
                    operation: operation.clone(),
                    key,
                    path,
                    size_bytes,
                });
            }
        }

        Ok(entries)
    }
}

/// Sorted file names in `dir`; a missing directory is empty
async fn read_dir_names(dir: &Path) -> CdkTestResult<Vec<String>> {
    let mut names = Vec::new();

    let mut read_dir = match fs::read_dir(dir).await {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
        Err(e) => {
            return Err(CdkTestError::io(
                format!("reading cache directory {}", dir.display()),
                e,
            ))
        }
    };

    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| CdkTestError::io("reading cache entry", e))?
    {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }

    names.sort();
    Ok(names)
}
