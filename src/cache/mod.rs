//! Content-addressed cache for CDK command results
//!
//! Deploying a stack is slow and touches real cloud resources, so repeated
//! test runs can reuse what an earlier run captured. Results are keyed by a
//! fingerprint of the app directory contents plus the invocation parameters.
//! Same inputs = same key = same stored result.
//!
//! # Layout
//!
//! ```text
//! <cache root>/<sha256(app dir path)>/<operation>/<sha256(params)>.json
//! ```
//!
//! # Failure Policy
//!
//! | Situation | Outcome |
//! |-----------|---------|
//! | Entry missing or unreadable | Miss, command runs |
//! | Entry corrupt | Miss, command runs |
//! | Write fails | Logged, result still returned |
//! | Command fails | Error returned, nothing stored |

pub mod dirhash;
pub mod fingerprint;
pub mod invoker;
pub mod store;

pub use dirhash::{hash_dir, hash_dir_into, DirHashOptions, CDK_OUT_DIR};
pub use fingerprint::{app_namespace, invocation_fingerprint, InvocationContext, ENTRY_EXTENSION};
pub use invoker::{CachedInvoker, Cacheable, CallOptions};
pub use store::{CacheEntry, EntryInfo, ResultStore, ENTRY_VERSION};
