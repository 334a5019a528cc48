//! CDK test fixture
//!
//! [`CdkTest`] drives the CDK CLI against one app directory. `synthesize`
//! and `deploy` can be served from the result cache; `bootstrap` and
//! `destroy` always run. Generated output and cache state are removed with
//! [`CdkTest::teardown`], or automatically when a [`FixtureGuard`] goes out
//! of scope.

mod options;

pub use options::{FixtureOptions, DEFAULT_CACHE_DIR};

use crate::cache::{
    app_namespace, invocation_fingerprint, CachedInvoker, CallOptions, DirHashOptions, EntryInfo,
    InvocationContext, ResultStore, CDK_OUT_DIR,
};
use crate::error::{CdkTestError, CdkTestResult};
use crate::process::{CdkCommand, CommandOutput, CommandRunner, ProcessRunner};
use crate::template::CloudAssembly;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// CDK project file; when absent the app command is passed with `-a`
const CDK_JSON: &str = "cdk.json";

/// Operation names, also used as cache directory names
pub mod operations {
    pub const BOOTSTRAP: &str = "bootstrap";
    pub const SYNTHESIZE: &str = "synthesize";
    pub const DEPLOY: &str = "deploy";
    pub const DESTROY: &str = "destroy";

    /// Operations whose results may be cached
    pub const CACHEABLE: [&str; 2] = [SYNTHESIZE, DEPLOY];
}

/// Helper for driving a CDK app from tests
pub struct CdkTest<R: CommandRunner = ProcessRunner> {
    context: InvocationContext,
    store: ResultStore,
    dir_options: DirHashOptions,
    enable_cache: bool,
    app_command: String,
    deploy_args: Vec<String>,
    destroy_args: Vec<String>,
    runner: R,
}

impl CdkTest<ProcessRunner> {
    /// Create a fixture that runs the real CDK CLI
    pub fn new(options: FixtureOptions) -> CdkTestResult<Self> {
        Self::with_runner(options, ProcessRunner::new())
    }
}

impl<R: CommandRunner> CdkTest<R> {
    /// Create a fixture that runs commands through `runner`
    pub fn with_runner(options: FixtureOptions, runner: R) -> CdkTestResult<Self> {
        let basedir = match options.basedir {
            Some(dir) => dir,
            None => std::env::current_dir()
                .map_err(|e| CdkTestError::io("getting current directory", e))?,
        };

        let appdir = if options.appdir.is_absolute() {
            options.appdir
        } else {
            basedir.join(options.appdir)
        };

        let cache_dir = match options.cache_dir {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => basedir.join(dir),
            None => basedir.join(DEFAULT_CACHE_DIR),
        };

        // A cache root inside the app must not feed the app's own fingerprint
        let mut dir_options = options.hash_options;
        if let Ok(rel) = cache_dir.strip_prefix(&appdir) {
            if !rel.as_os_str().is_empty() {
                debug!("Excluding cache root {} from app hash", rel.display());
                dir_options = dir_options.exclude_path(rel);
            }
        }

        let mut env: BTreeMap<String, String> = std::env::vars().collect();
        env.extend(options.env);

        debug!(
            "Fixture for {} (cache {}: {})",
            appdir.display(),
            if options.enable_cache { "on" } else { "off" },
            cache_dir.display()
        );

        Ok(Self {
            context: InvocationContext::new(options.binary, basedir, appdir, env)
                .with_env_exclude(options.env_exclude),
            store: ResultStore::new(cache_dir),
            dir_options,
            enable_cache: options.enable_cache,
            app_command: options.app_command,
            deploy_args: options.deploy_args,
            destroy_args: options.destroy_args,
            runner,
        })
    }

    pub fn appdir(&self) -> &Path {
        self.context.appdir()
    }

    pub fn basedir(&self) -> &Path {
        self.context.basedir()
    }

    pub fn binary(&self) -> &str {
        self.context.binary()
    }

    pub fn cache_dir(&self) -> &Path {
        self.store.root()
    }

    pub fn cache_enabled(&self) -> bool {
        self.enable_cache
    }

    pub fn set_cache_enabled(&mut self, enabled: bool) {
        self.enable_cache = enabled;
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Environment passed to the CLI
    pub fn env(&self) -> &BTreeMap<String, String> {
        self.context.env()
    }

    /// Mutable environment; changes invalidate cached results
    pub fn env_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.context.env_mut()
    }

    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.context.env_mut().insert(key.into(), value.into());
    }

    pub fn remove_env(&mut self, key: &str) -> Option<String> {
        self.context.env_mut().remove(key)
    }

    /// Run `cdk bootstrap`
    pub async fn setup(&self) -> CdkTestResult<CommandOutput> {
        self.execute_command(operations::BOOTSTRAP, &[]).await
    }

    /// Run `cdk synthesize`, optionally through the cache
    pub async fn synthesize(&self, options: CallOptions) -> CdkTestResult<CommandOutput> {
        let args = if self.appdir().join(CDK_JSON).is_file() {
            vec![]
        } else {
            vec!["-a".to_string(), self.app_command.clone()]
        };

        self.invoker()
            .call(operations::SYNTHESIZE, options, || {
                self.execute_command(operations::SYNTHESIZE, &args)
            })
            .await
    }

    /// Run `cdk deploy`, optionally through the cache
    pub async fn deploy(&self, options: CallOptions) -> CdkTestResult<CommandOutput> {
        self.invoker()
            .call(operations::DEPLOY, options, || {
                self.execute_command(operations::DEPLOY, &self.deploy_args)
            })
            .await
    }

    /// Run `cdk destroy`
    pub async fn destroy(&self) -> CdkTestResult<CommandOutput> {
        self.execute_command(operations::DESTROY, &self.destroy_args)
            .await
    }

    /// Run an arbitrary CDK subcommand in the app directory
    pub async fn execute_command(&self, cmd: &str, args: &[String]) -> CdkTestResult<CommandOutput> {
        let command = CdkCommand {
            binary: self.context.binary().to_string(),
            subcommand: cmd.to_string(),
            args: args.to_vec(),
            cwd: self.appdir().to_path_buf(),
            env: self.context.env().clone(),
        };
        debug!("Executing via {}: {}", self.runner.runner_name(), command);

        self.runner.run(&command).await
    }

    /// Templates written by the last synthesize
    pub fn assembly(&self) -> CdkTestResult<CloudAssembly> {
        CloudAssembly::load(&self.appdir().join(CDK_OUT_DIR))
    }

    /// Cache key for the fixture's current state
    pub fn cache_key(&self) -> String {
        invocation_fingerprint(&self.context, &self.dir_options)
    }

    /// Directory fingerprint of the app alone
    pub fn app_fingerprint(&self) -> String {
        crate::cache::hash_dir(self.appdir(), &self.dir_options)
    }

    /// Cache namespace of this app
    pub fn namespace(&self) -> String {
        app_namespace(self.appdir())
    }

    /// Where a result of `operation` would be stored right now
    pub fn entry_path(&self, operation: &str) -> PathBuf {
        self.store
            .entry_path(&self.namespace(), operation, &self.cache_key())
    }

    /// Cache entries stored for this app
    pub async fn cached_entries(&self) -> CdkTestResult<Vec<EntryInfo>> {
        self.store.list(&self.namespace()).await
    }

    /// Remove `cdk.out` and this app's cache namespace
    ///
    /// Paths that are already gone are not an error.
    pub fn teardown(&self) -> CdkTestResult<()> {
        let cdk_out = self.appdir().join(CDK_OUT_DIR);
        let namespace_dir = self.store.namespace_dir(&self.namespace());

        for dir in [cdk_out, namespace_dir] {
            debug!("Removing {}", dir.display());
            match fs::remove_dir_all(&dir) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("{} does not exist", dir.display());
                }
                Err(e) => {
                    return Err(CdkTestError::io(format!("removing {}", dir.display()), e));
                }
            }
        }

        Ok(())
    }

    /// Wrap the fixture so it is torn down when the guard is dropped
    pub fn guard(self) -> FixtureGuard<R> {
        FixtureGuard {
            fixture: self,
            armed: true,
        }
    }

    fn invoker(&self) -> CachedInvoker<'_> {
        CachedInvoker::new(
            &self.store,
            &self.context,
            &self.dir_options,
            self.enable_cache,
        )
    }
}

/// Scope guard that runs [`CdkTest::teardown`] on drop
pub struct FixtureGuard<R: CommandRunner = ProcessRunner> {
    fixture: CdkTest<R>,
    armed: bool,
}

impl<R: CommandRunner> FixtureGuard<R> {
    /// Keep generated output and cache state when the guard is dropped
    pub fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<R: CommandRunner> Deref for FixtureGuard<R> {
    type Target = CdkTest<R>;

    fn deref(&self) -> &Self::Target {
        &self.fixture
    }
}

impl<R: CommandRunner> DerefMut for FixtureGuard<R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.fixture
    }
}

impl<R: CommandRunner> Drop for FixtureGuard<R> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = self.fixture.teardown() {
            warn!("Fixture teardown failed: {}", e);
        }
    }
}
