//! Native CDK runner
//!
//! Spawns the CDK CLI with `tokio::process`, streams its output line by line
//! into the log (and an optional observer) while it runs, and turns any
//! non-zero exit into an error.

use crate::error::{CdkTestError, CdkTestResult};
use crate::process::command::{CdkCommand, CommandOutput};
use crate::process::runner::CommandRunner;
use crate::process::{join_lines, stream_output, OutputStream};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, error, info};

/// Callback receiving each output line while the command runs
pub type OutputObserver = Arc<dyn Fn(OutputStream, &str) + Send + Sync>;

/// Runs the real CDK CLI
#[derive(Clone, Default)]
pub struct ProcessRunner {
    observer: Option<OutputObserver>,
}

impl ProcessRunner {
    /// Create a runner that only logs output
    pub fn new() -> Self {
        Self { observer: None }
    }

    /// Also forward every output line to `observer`
    pub fn with_observer(observer: OutputObserver) -> Self {
        Self {
            observer: Some(observer),
        }
    }

    fn on_line(&self, stream: OutputStream, line: &str) {
        match stream {
            OutputStream::Stdout => info!("{}", line.trim_end()),
            OutputStream::Stderr => debug!("{}", line.trim_end()),
        }
        if let Some(observer) = &self.observer {
            observer(stream, line);
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &CdkCommand) -> CdkTestResult<CommandOutput> {
        let argv = command.argv();
        let (program, args) = match argv.split_first() {
            Some((program, args)) if !command.binary.trim().is_empty() => (program, args),
            _ => return Err(CdkTestError::EmptyBinary),
        };

        if !command.cwd.is_dir() {
            return Err(CdkTestError::AppDirNotFound(command.cwd.clone()));
        }

        info!("{}", command);
        debug!("Working directory: {}", command.cwd.display());

        let mut child = Command::new(program)
            .args(args)
            .current_dir(&command.cwd)
            .env_clear()
            .envs(&command.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    CdkTestError::CliNotFound {
                        binary: command.binary.clone(),
                        source: e,
                    }
                }
                _ => CdkTestError::io(format!("spawning {}", command), e),
            })?;

        let (out_lines, err_lines) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => {
                stream_output(stdout, stderr, &|stream, line| self.on_line(stream, line))
                    .await
                    .map_err(|e| CdkTestError::io(format!("reading output of {}", command), e))?
            }
            _ => (Vec::new(), Vec::new()),
        };

        let status = child
            .wait()
            .await
            .map_err(|e| CdkTestError::io(format!("waiting for {}", command), e))?;

        let out = join_lines(&out_lines);
        let err = join_lines(&err_lines);

        let Some(retcode) = status.code() else {
            error!("{} terminated by signal", command);
            return Err(CdkTestError::ProcessSignaled {
                command: command.to_string(),
            });
        };

        if retcode != 0 {
            error!("Error running command {}: {}", command, retcode);
            return Err(CdkTestError::command_failed(
                command.to_string(),
                retcode,
                out,
                err,
            ));
        }

        Ok(CommandOutput { retcode, out, err })
    }

    fn runner_name(&self) -> &'static str {
        "Native process"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn command(dir: &TempDir, binary: &str, subcommand: &str, args: &[&str]) -> CdkCommand {
        CdkCommand {
            binary: binary.to_string(),
            subcommand: subcommand.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd: dir.path().to_path_buf(),
            env: std::env::vars().collect::<BTreeMap<_, _>>(),
        }
    }

    #[tokio::test]
    async fn captures_stdout() {
        let dir = TempDir::new().unwrap();
        let output = ProcessRunner::new()
            .run(&command(&dir, "echo", "synthesize", &["-a", "python3 app.py"]))
            .await
            .unwrap();

        assert_eq!(output.retcode, 0);
        assert_eq!(output.out, "synthesize -a python3 app.py\n");
        assert!(output.err.is_empty());
    }

    #[tokio::test]
    async fn captures_stderr_separately() {
        let dir = TempDir::new().unwrap();
        let output = ProcessRunner::new()
            .run(&command(&dir, "sh", "-c", &["echo out; echo err >&2"]))
            .await
            .unwrap();

        assert_eq!(output.out, "out\n");
        assert_eq!(output.err, "err\n");
    }

    #[tokio::test]
    async fn runs_in_app_dir_with_env() {
        let dir = TempDir::new().unwrap();
        let mut cmd = command(&dir, "sh", "-c", &["pwd; echo $CDK_TEST_VALUE"]);
        cmd.env.insert("CDK_TEST_VALUE".to_string(), "bar".to_string());

        let output = ProcessRunner::new().run(&cmd).await.unwrap();
        let lines: Vec<&str> = output.out.lines().collect();

        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(std::path::Path::new(lines[0]).canonicalize().unwrap(), expected);
        assert_eq!(lines[1], "bar");
    }

    #[tokio::test]
    async fn any_nonzero_exit_fails() {
        let dir = TempDir::new().unwrap();

        for code in [1, 2, 11, 42] {
            let script = format!("echo partial; echo broken >&2; exit {code}");
            let err = ProcessRunner::new()
                .run(&command(&dir, "sh", "-c", &[script.as_str()]))
                .await
                .unwrap_err();

            match err {
                CdkTestError::CommandFailed {
                    command,
                    code: got,
                    stdout,
                    stderr,
                } => {
                    assert!(command.starts_with("sh -c"));
                    assert_eq!(got, code);
                    assert_eq!(stdout, "partial\n");
                    assert_eq!(stderr, "broken\n");
                }
                other => panic!("expected CommandFailed, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn invalid_utf8_output_does_not_truncate() {
        let dir = TempDir::new().unwrap();
        let output = ProcessRunner::new()
            .run(&command(
                &dir,
                "sh",
                "-c",
                &["printf 'before\\n\\377bad\\n'; echo after"],
            ))
            .await
            .unwrap();

        assert_eq!(output.out, "before\n\u{fffd}bad\nafter\n");
    }

    #[tokio::test]
    async fn output_after_invalid_utf8_is_drained() {
        let dir = TempDir::new().unwrap();
        // Far more than a pipe buffer holds
        let output = ProcessRunner::new()
            .run(&command(
                &dir,
                "sh",
                "-c",
                &["printf '\\377\\n'; head -c 1000000 /dev/zero | tr '\\0' x; echo"],
            ))
            .await
            .unwrap();

        let lines: Vec<&str> = output.out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].len(), 1_000_000);
    }

    #[tokio::test]
    async fn missing_binary() {
        let dir = TempDir::new().unwrap();
        let err = ProcessRunner::new()
            .run(&command(&dir, "cdktest-no-such-binary", "synth", &[]))
            .await
            .unwrap_err();

        assert!(matches!(err, CdkTestError::CliNotFound { .. }));
        assert!(err.hint().is_some());
    }

    #[tokio::test]
    async fn empty_binary() {
        let dir = TempDir::new().unwrap();
        let err = ProcessRunner::new()
            .run(&command(&dir, "  ", "synth", &[]))
            .await
            .unwrap_err();

        assert!(matches!(err, CdkTestError::EmptyBinary));
    }

    #[tokio::test]
    async fn missing_app_dir() {
        let dir = TempDir::new().unwrap();
        let mut cmd = command(&dir, "echo", "synth", &[]);
        cmd.cwd = dir.path().join("gone");

        let err = ProcessRunner::new().run(&cmd).await.unwrap_err();
        assert!(matches!(err, CdkTestError::AppDirNotFound(_)));
    }

    #[tokio::test]
    async fn observer_sees_each_line() {
        let dir = TempDir::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let runner = ProcessRunner::with_observer(Arc::new(move |_: OutputStream, line: &str| {
            sink.lock().unwrap().push(line.to_string());
        }));

        runner
            .run(&command(&dir, "sh", "-c", &["echo one; echo two"]))
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn runner_name() {
        assert_eq!(ProcessRunner::new().runner_name(), "Native process");
    }
}
