//! CDK command types
//!
//! Plain data passed between fixtures and runners.

use crate::cache::Cacheable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// A single CDK CLI invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdkCommand {
    /// CDK binary, optionally with leading arguments (e.g. `npx cdk`)
    pub binary: String,
    /// CDK subcommand (synthesize, deploy, ...)
    pub subcommand: String,
    /// Arguments after the subcommand
    pub args: Vec<String>,
    /// Working directory (the app directory)
    pub cwd: PathBuf,
    /// Complete environment for the child process
    pub env: BTreeMap<String, String>,
}

impl CdkCommand {
    /// Program and its arguments, in order
    pub fn argv(&self) -> Vec<String> {
        self.binary
            .split_whitespace()
            .map(str::to_string)
            .chain(std::iter::once(self.subcommand.clone()))
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for CdkCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv().join(" "))
    }
}

/// What a successful CDK command produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Process exit code
    pub retcode: i32,
    /// Captured stdout
    pub out: String,
    /// Captured stderr
    pub err: String,
}

impl Cacheable for CommandOutput {
    fn is_cacheable(&self) -> bool {
        !self.out.is_empty()
    }
}
