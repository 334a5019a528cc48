//! cdktest - test fixtures for AWS CDK apps
//!
//! Drives the CDK CLI against an app directory from tests and caches the
//! results of slow operations (synthesize, deploy) keyed by the app's
//! content and the invocation's environment.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fixture;
pub mod process;
pub mod template;

pub use cache::CallOptions;
pub use error::{CdkTestError, CdkTestResult};
pub use fixture::{CdkTest, FixtureGuard, FixtureOptions};
pub use process::{CommandOutput, CommandRunner, ProcessRunner};
pub use template::{CloudAssembly, Resource, Template};
