//! Command runner abstraction
//!
//! Fixtures never spawn processes themselves; they go through this trait so
//! the real CLI can be swapped for a recording fake in tests.

use crate::error::CdkTestResult;
use crate::process::command::{CdkCommand, CommandOutput};
use async_trait::async_trait;

/// Runs CDK commands to completion
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command and capture its output
    ///
    /// A non-zero exit is an error carrying the command and captured output.
    async fn run(&self, command: &CdkCommand) -> CdkTestResult<CommandOutput>;

    /// Get the human-readable runner name for display
    fn runner_name(&self) -> &'static str;
}
