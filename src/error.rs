//! Error types for cdktest
//!
//! All modules use `CdkTestResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cdktest operations
pub type CdkTestResult<T> = Result<T, CdkTestError>;

/// All errors that can occur in cdktest
#[derive(Error, Debug)]
pub enum CdkTestError {
    // CLI process errors
    #[error("CDK executable not found: {binary}: {source}")]
    CliNotFound {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error running command {command}: exit code {code}\n{stdout}{stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("Command terminated by signal: {command}")]
    ProcessSignaled { command: String },

    #[error("Empty CDK binary")]
    EmptyBinary,

    // Fixture errors
    #[error("App directory not found: {0}")]
    AppDirNotFound(PathBuf),

    #[error("Cloud assembly not found: {0}. Run synthesize first")]
    AssemblyNotFound(PathBuf),

    #[error("Invalid template {path}: {reason}")]
    TemplateParse { path: PathBuf, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // Cache errors
    #[error("Failed to write cache entry {path}: {source}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl CdkTestError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a failed command error from captured output
    pub fn command_failed(
        command: impl Into<String>,
        code: i32,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            command: command.into(),
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Exit code of the failing CLI process, if there was one
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::CliNotFound { .. } => {
                Some("Install the CDK CLI (npm install -g aws-cdk) or pass --binary \"npx cdk\"")
            }
            Self::AssemblyNotFound(_) => Some("Run: cdktest synth <APPDIR>"),
            Self::AppDirNotFound(_) => Some("Check the app directory and --basedir"),
            Self::ConfigInvalid { .. } => Some("Fix or remove the file; missing keys fall back to defaults"),
            Self::EmptyBinary => Some("Set cli.binary in the config or pass --binary"),
            _ => None,
        }
    }
}
