//! Configuration schema for cdktest
//!
//! Global configuration lives at `~/.config/cdktest/config.toml`; a project
//! may override any key in a `.cdktest.toml` next to (or above) its tests.

use crate::cache::CDK_OUT_DIR;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// CDK CLI settings
    pub cli: CliConfig,

    /// Result cache settings
    pub cache: CacheConfig,
}

/// General application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// CDK CLI settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// CDK binary, optionally with leading arguments (e.g. "npx cdk")
    pub binary: String,

    /// App command passed with `-a` when the app has no cdk.json
    pub app_command: String,

    /// Extra arguments for `cdk deploy`
    pub deploy_args: Vec<String>,

    /// Extra arguments for `cdk destroy`
    pub destroy_args: Vec<String>,

    /// Environment variables layered over the process environment
    pub env: BTreeMap<String, String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            binary: "cdk".to_string(),
            app_command: "python3 app.py".to_string(),
            deploy_args: vec![],
            destroy_args: vec![],
            env: BTreeMap::new(),
        }
    }
}

/// Result cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable result caching (default: false)
    pub enabled: bool,

    /// Cache root; relative paths resolve against the fixture's base directory
    pub dir: Option<PathBuf>,

    /// Skip dotfiles and dot-directories when hashing the app
    pub ignore_hidden: bool,

    /// Directory names never hashed
    pub exclude_dirs: Vec<String>,

    /// File extensions never hashed
    pub exclude_extensions: Vec<String>,

    /// Environment variables left out of the cache key
    pub env_exclude: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: None,
            ignore_hidden: true,
            exclude_dirs: vec![CDK_OUT_DIR.to_string()],
            exclude_extensions: vec![],
            env_exclude: vec![],
        }
    }
}
