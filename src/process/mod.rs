//! Running the CDK CLI
//!
//! - `command`: what to run and what came back
//! - `runner`: the seam fixtures call through
//! - `native`: the real implementation on top of `tokio::process`

mod command;
mod native;
mod runner;

pub use command::{CdkCommand, CommandOutput};
pub use native::{OutputObserver, ProcessRunner};
pub use runner::CommandRunner;

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};

/// Which pipe a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Read stdout and stderr concurrently, line by line, calling `on_line` for
/// each line as soon as it arrives.
///
/// Bytes that are not valid UTF-8 are replaced, never dropped, and both pipes
/// are read until EOF. Returns the collected stdout and stderr lines once both
/// pipes close, or the first read error.
pub(crate) async fn stream_output<O, E>(
    stdout: O,
    stderr: E,
    on_line: &(dyn Fn(OutputStream, &str) + Send + Sync),
) -> io::Result<(Vec<String>, Vec<String>)>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut stdout_reader = BufReader::new(stdout);
    let mut stderr_reader = BufReader::new(stderr);
    // Partial lines survive a cancelled read_until in these buffers
    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();

    let mut out_lines = Vec::new();
    let mut err_lines = Vec::new();
    let mut stdout_done = false;
    let mut stderr_done = false;

    while !stdout_done || !stderr_done {
        tokio::select! {
            line = next_line(&mut stdout_reader, &mut stdout_buf), if !stdout_done => {
                match line? {
                    Some(line) => {
                        on_line(OutputStream::Stdout, &line);
                        out_lines.push(line);
                    }
                    None => stdout_done = true,
                }
            }
            line = next_line(&mut stderr_reader, &mut stderr_buf), if !stderr_done => {
                match line? {
                    Some(line) => {
                        on_line(OutputStream::Stderr, &line);
                        err_lines.push(line);
                    }
                    None => stderr_done = true,
                }
            }
        }
    }

    Ok((out_lines, err_lines))
}

/// Next line without its terminator, or `None` at EOF
async fn next_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let read = reader.read_until(b'\n', buf).await?;
    if read == 0 && buf.is_empty() {
        return Ok(None);
    }

    let mut end = buf.len();
    if buf[..end].ends_with(b"\n") {
        end -= 1;
    }
    if buf[..end].ends_with(b"\r") {
        end -= 1;
    }
    let line = String::from_utf8_lossy(&buf[..end]).into_owned();
    buf.clear();

    Ok(Some(line))
}

/// Join captured lines back into text, one trailing newline per line
pub(crate) fn join_lines(lines: &[String]) -> String {
    lines.iter().fold(String::new(), |mut acc, line| {
        acc.push_str(line);
        acc.push('\n');
        acc
    })
}
