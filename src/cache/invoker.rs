//! Get-or-compute wrapper around expensive CDK operations

use crate::cache::dirhash::DirHashOptions;
use crate::cache::fingerprint::{app_namespace, invocation_fingerprint, InvocationContext};
use crate::cache::store::ResultStore;
use crate::error::CdkTestResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use tracing::{debug, error, info};

/// Per-call cache opt-in
///
/// The default does not use the cache; a call is only served from or written
/// to the cache when the fixture has caching enabled *and* the call asks for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    pub use_cache: bool,
}

impl CallOptions {
    /// Options that opt in to the cache
    pub fn cached() -> Self {
        Self { use_cache: true }
    }

    /// Options that bypass the cache
    pub fn uncached() -> Self {
        Self { use_cache: false }
    }
}

/// A result the invoker knows how to store
///
/// Empty results (no output captured) are returned but never written.
pub trait Cacheable: Serialize + DeserializeOwned {
    fn is_cacheable(&self) -> bool;
}

impl Cacheable for String {
    fn is_cacheable(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: Cacheable> Cacheable for Option<T> {
    fn is_cacheable(&self) -> bool {
        self.as_ref().is_some_and(Cacheable::is_cacheable)
    }
}

impl<T: Serialize + DeserializeOwned> Cacheable for Vec<T> {
    fn is_cacheable(&self) -> bool {
        !self.is_empty()
    }
}

/// Wraps operations with lookup-before and store-after
///
/// Holds everything needed to fingerprint the current invocation. The only
/// code path that runs the wrapped operation is [`CachedInvoker::call`].
pub struct CachedInvoker<'a> {
    store: &'a ResultStore,
    context: &'a InvocationContext,
    dir_options: &'a DirHashOptions,
    enabled: bool,
}

impl<'a> CachedInvoker<'a> {
    pub fn new(
        store: &'a ResultStore,
        context: &'a InvocationContext,
        dir_options: &'a DirHashOptions,
        enabled: bool,
    ) -> Self {
        Self {
            store,
            context,
            dir_options,
            enabled,
        }
    }

    /// Run `op` or return the result it produced last time for the same inputs
    ///
    /// On a hit `op` is not called at all. On a miss it is called exactly
    /// once; errors propagate unchanged and are never stored. A failed cache
    /// write is logged and otherwise ignored.
    pub async fn call<T, F, Fut>(
        &self,
        operation: &str,
        options: CallOptions,
        op: F,
    ) -> CdkTestResult<T>
    where
        T: Cacheable,
        F: FnOnce() -> Fut,
        Fut: Future<Output = CdkTestResult<T>>,
    {
        debug!("Cache decorated operation: {}", operation);

        if !self.enabled || !options.use_cache {
            return op().await;
        }

        let namespace = app_namespace(self.context.appdir());
        let key = invocation_fingerprint(self.context, self.dir_options);
        debug!(
            "Cache key: {}",
            self.store.entry_path(&namespace, operation, &key).display()
        );

        if let Some(cached) = self.store.lookup::<T>(&namespace, operation, &key).await {
            info!("Getting {} output from cache", operation);
            return Ok(cached);
        }

        info!("Running {}", operation);
        let out = op().await?;

        if out.is_cacheable() {
            // The run may have written into the app directory
            let key = invocation_fingerprint(self.context, self.dir_options);
            match self.store.store(&namespace, operation, &key, &out).await {
                Ok(path) => info!("Wrote {} output to cache: {}", operation, path.display()),
                Err(e) => error!("Cache could not be written: {}", e),
            }
        }

        Ok(out)
    }
}
