//! Invocation fingerprinting
//!
//! Combines the fixture's invocation parameters with the application
//! directory's content hash into one stable key. The key is recomputed on
//! every lookup and every store: the environment may have been edited between
//! calls, and a CDK run may have written new files into the app directory.

use crate::cache::dirhash::{hash_dir, DirHashOptions};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Extension appended to every fingerprint to form the entry file name
pub const ENTRY_EXTENSION: &str = "json";

/// Everything about a fixture that can change what a CDK command produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    binary: String,
    basedir: PathBuf,
    appdir: PathBuf,
    env: BTreeMap<String, String>,
    env_exclude: BTreeSet<String>,
}

impl InvocationContext {
    /// Create a context from explicit parts
    pub fn new(
        binary: impl Into<String>,
        basedir: impl Into<PathBuf>,
        appdir: impl Into<PathBuf>,
        env: BTreeMap<String, String>,
    ) -> Self {
        Self {
            binary: binary.into(),
            basedir: basedir.into(),
            appdir: appdir.into(),
            env,
            env_exclude: BTreeSet::new(),
        }
    }

    /// Leave these variables out of the fingerprint
    pub fn with_env_exclude<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.env_exclude = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn basedir(&self) -> &Path {
        &self.basedir
    }

    pub fn appdir(&self) -> &Path {
        &self.appdir
    }

    /// Full environment passed to the CLI
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Mutable environment; edits show up in the next fingerprint
    pub fn env_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.env
    }

    /// The part of the environment that feeds the fingerprint
    pub fn fingerprint_env(&self) -> BTreeMap<&str, &str> {
        self.env
            .iter()
            .filter(|(k, _)| !self.env_exclude.contains(k.as_str()))
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Serialized form that gets hashed. Fields are declared in alphabetical order
/// and maps are `BTreeMap`s, so the JSON text is canonical.
#[derive(Serialize)]
struct FingerprintParams<'a> {
    appdir: String,
    basedir: String,
    binary: &'a str,
    env: BTreeMap<&'a str, &'a str>,
}

/// Compute the storage key for the current state of `context`
///
/// Returns `<sha256 hex>.json`.
pub fn invocation_fingerprint(context: &InvocationContext, dir_options: &DirHashOptions) -> String {
    let params = FingerprintParams {
        appdir: hash_dir(context.appdir(), dir_options),
        basedir: context.basedir().to_string_lossy().into_owned(),
        binary: context.binary(),
        env: context.fingerprint_env(),
    };

    // Serializing strings and string maps cannot fail
    let canonical = serde_json::to_vec(&params).unwrap_or_default();

    let digest = Sha256::digest(&canonical);
    format!("{}.{}", hex::encode(digest), ENTRY_EXTENSION)
}

/// Digest of an app directory path, used to namespace its cache entries
pub fn app_namespace(appdir: &Path) -> String {
    hex::encode(Sha256::digest(appdir.to_string_lossy().as_bytes()))
}
