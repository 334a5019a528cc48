//! Fixture construction options

use crate::cache::DirHashOptions;
use crate::config::Config;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Cache directory name used when none is configured
pub const DEFAULT_CACHE_DIR: &str = ".cdktest-cache";

/// Everything needed to build a [`CdkTest`](crate::fixture::CdkTest)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureOptions {
    /// CDK app directory; relative paths resolve against `basedir`
    pub appdir: PathBuf,
    /// Base directory (defaults to the current directory)
    pub basedir: Option<PathBuf>,
    /// CDK binary, optionally with leading arguments (e.g. `npx cdk`)
    pub binary: String,
    /// Variables layered over the process environment
    pub env: BTreeMap<String, String>,
    /// Allow cache-aware operations to use the result cache
    pub enable_cache: bool,
    /// Cache root; relative paths resolve against `basedir`
    pub cache_dir: Option<PathBuf>,
    /// App command passed with `-a` when the app has no cdk.json
    pub app_command: String,
    /// Extra arguments for `cdk deploy`
    pub deploy_args: Vec<String>,
    /// Extra arguments for `cdk destroy`
    pub destroy_args: Vec<String>,
    /// What the app directory hash skips
    pub hash_options: DirHashOptions,
    /// Environment variables left out of the cache key
    pub env_exclude: Vec<String>,
}

impl FixtureOptions {
    /// Options with defaults for everything but the app directory
    pub fn new(appdir: impl Into<PathBuf>) -> Self {
        Self::from_config(appdir, &Config::default())
    }

    /// Options taken from loaded configuration
    pub fn from_config(appdir: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            appdir: appdir.into(),
            basedir: None,
            binary: config.cli.binary.clone(),
            env: config.cli.env.clone(),
            enable_cache: config.cache.enabled,
            cache_dir: config.cache.dir.clone(),
            app_command: config.cli.app_command.clone(),
            deploy_args: config.cli.deploy_args.clone(),
            destroy_args: config.cli.destroy_args.clone(),
            hash_options: DirHashOptions::new(
                config.cache.ignore_hidden,
                config.cache.exclude_dirs.iter().cloned(),
                &config.cache.exclude_extensions,
            ),
            env_exclude: config.cache.env_exclude.clone(),
        }
    }

    pub fn basedir(mut self, basedir: impl Into<PathBuf>) -> Self {
        self.basedir = Some(basedir.into());
        self
    }

    pub fn binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn enable_cache(mut self, enabled: bool) -> Self {
        self.enable_cache = enabled;
        self
    }

    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }
}
