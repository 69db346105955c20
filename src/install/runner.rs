//! Installer process execution
//!
//! The installer is an external program. Cachet only needs to start it in
//! a working directory with some extra environment, watch its output, and
//! collect the combined stdout+stderr text and exit code.

use crate::error::{CachetError, CachetResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::debug;

/// Exit code reported when the process was terminated by a signal
pub const SIGNALED_EXIT_CODE: i32 = -1;

/// What to run and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Program to execute
    pub program: String,
    /// Program arguments
    pub args: Vec<String>,
    /// Working directory for the process
    pub working_dir: PathBuf,
    /// Variables added to the inherited environment
    pub env: BTreeMap<String, String>,
}

impl InstallRequest {
    /// Human-readable command line
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of one installer run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutput {
    /// Combined stdout and stderr, in arrival order
    pub output: String,
    /// Process exit code
    pub exit_code: i32,
    /// Wall-clock run time
    pub elapsed: Duration,
}

impl InstallOutput {
    /// Whether the installer exited cleanly
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Something that can run the installer
///
/// `on_line` is called for every output line as it arrives so callers can
/// show progress; the full text is still returned at the end.
#[async_trait]
pub trait InstallRunner: Send + Sync {
    /// Run the installer to completion
    async fn run(
        &self,
        request: &InstallRequest,
        on_line: &(dyn for<'s> Fn(&'s str) + Send + Sync),
    ) -> CachetResult<InstallOutput>;
}

/// Runs the installer as a child process
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Create a new process runner
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl InstallRunner for ProcessRunner {
    async fn run(
        &self,
        request: &InstallRequest,
        on_line: &(dyn for<'s> Fn(&'s str) + Send + Sync),
    ) -> CachetResult<InstallOutput> {
        let command_line = request.command_line();
        debug!("Running {} in {}", command_line, request.working_dir.display());

        let start = Instant::now();
        let mut child = Command::new(&request.program)
            .args(&request.args)
            .current_dir(&request.working_dir)
            .envs(&request.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CachetError::command_failed(&command_line, e))?;

        let lines = stream_child_output(&mut child, on_line).await?;

        let status = child
            .wait()
            .await
            .map_err(|e| CachetError::command_failed(&command_line, e))?;
        let elapsed = start.elapsed();

        let mut output = lines.join("\n");
        if !output.is_empty() {
            output.push('\n');
        }

        debug!(
            "{} exited with {:?} after {:.1}s",
            command_line,
            status.code(),
            elapsed.as_secs_f64()
        );

        Ok(InstallOutput {
            output,
            exit_code: status.code().unwrap_or(SIGNALED_EXIT_CODE),
            elapsed,
        })
    }
}

/// Read stdout and stderr of a child concurrently, line by line
///
/// Bytes are decoded lossily since installer output is not guaranteed to
/// be UTF-8.
async fn stream_child_output(
    child: &mut tokio::process::Child,
    on_line: &(dyn Fn(&str) + Send + Sync),
) -> CachetResult<Vec<String>> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| CachetError::Internal("installer stdout not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| CachetError::Internal("installer stderr not captured".to_string()))?;

    read_output(stdout, stderr, on_line).await
}

/// Interleave lines from two readers until both reach end of file
///
/// A read error fails the whole run rather than truncating the output.
async fn read_output<O, E>(
    stdout: O,
    stderr: E,
    on_line: &(dyn Fn(&str) + Send + Sync),
) -> CachetResult<Vec<String>>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut stdout_reader = BufReader::new(stdout).split(b'\n');
    let mut stderr_reader = BufReader::new(stderr).split(b'\n');

    let mut all_output = Vec::new();
    let mut stdout_done = false;
    let mut stderr_done = false;

    while !stdout_done || !stderr_done {
        tokio::select! {
            segment = stdout_reader.next_segment(), if !stdout_done => {
                match segment.map_err(|e| CachetError::io("reading installer stdout", e))? {
                    Some(bytes) => push_line(&mut all_output, &bytes, on_line),
                    None => stdout_done = true,
                }
            }
            segment = stderr_reader.next_segment(), if !stderr_done => {
                match segment.map_err(|e| CachetError::io("reading installer stderr", e))? {
                    Some(bytes) => push_line(&mut all_output, &bytes, on_line),
                    None => stderr_done = true,
                }
            }
        }
    }

    Ok(all_output)
}

fn push_line(all_output: &mut Vec<String>, bytes: &[u8], on_line: &(dyn Fn(&str) + Send + Sync)) {
    let line = String::from_utf8_lossy(bytes);
    let line = line.trim_end_matches('\r').to_string();
    on_line(&line);
    all_output.push(line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::task::{Context, Poll};

    /// Yields one line, then fails
    struct BrokenPipe {
        sent: bool,
    }

    impl AsyncRead for BrokenPipe {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.sent {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")));
            }
            self.sent = true;
            buf.put_slice(b"first\n");
            Poll::Ready(Ok(()))
        }
    }

    async fn read_lines<R: AsyncRead + Unpin>(reader: R) -> Vec<String> {
        let mut lines = Vec::new();
        let mut split = BufReader::new(reader).split(b'\n');
        while let Ok(Some(bytes)) = split.next_segment().await {
            push_line(&mut lines, &bytes, &|_| {});
        }
        lines
    }

    #[test]
    fn command_line_joins_args() {
        let request = InstallRequest {
            program: "vcpkg".to_string(),
            args: vec!["install".to_string(), "--clean-after-build".to_string()],
            working_dir: PathBuf::from("."),
            env: BTreeMap::new(),
        };
        assert_eq!(request.command_line(), "vcpkg install --clean-after-build");
    }

    #[tokio::test]
    async fn lines_are_decoded_lossily() {
        let input: &[u8] = b"ok line\r\nbad \xff byte\n";
        let lines = read_lines(input).await;
        assert_eq!(lines, vec!["ok line".to_string(), "bad \u{fffd} byte".to_string()]);
    }

    #[tokio::test]
    async fn read_error_fails_instead_of_truncating() {
        let seen = Mutex::new(Vec::new());
        let on_line = |line: &str| seen.lock().unwrap().push(line.to_string());
        let stderr: &[u8] = b"warning\n";

        let err = read_output(BrokenPipe { sent: false }, stderr, &on_line)
            .await
            .unwrap_err();

        assert!(matches!(err, CachetError::Io { ref context, .. } if context.contains("stdout")));
        assert!(seen.lock().unwrap().contains(&"first".to_string()));
    }

    #[tokio::test]
    async fn both_streams_are_read_to_the_end() {
        let stdout: &[u8] = b"one\ntwo\n";
        let stderr: &[u8] = b"three";
        let mut lines = read_output(stdout, stderr, &|_| {}).await.unwrap();
        lines.sort();
        assert_eq!(lines, vec!["one", "three", "two"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_runner_captures_combined_output() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker"), "").unwrap();
        let mut env = BTreeMap::new();
        env.insert("CACHET_TEST_VALUE".to_string(), "from-env".to_string());

        let request = InstallRequest {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                "echo out $CACHET_TEST_VALUE; echo err >&2; test -f marker && echo found; exit 3".to_string(),
            ],
            working_dir: dir.path().to_path_buf(),
            env,
        };

        let seen = Mutex::new(Vec::new());
        let on_line = |line: &str| seen.lock().unwrap().push(line.to_string());
        let result = ProcessRunner::new().run(&request, &on_line).await.unwrap();

        assert_eq!(result.exit_code, 3);
        assert!(!result.success());
        assert!(result.output.contains("out from-env"));
        assert!(result.output.contains("err"));
        assert!(result.output.contains("found"));
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn process_runner_reports_spawn_failure() {
        let request = InstallRequest {
            program: "cachet-no-such-installer".to_string(),
            args: vec![],
            working_dir: PathBuf::from("."),
            env: BTreeMap::new(),
        };
        let err = ProcessRunner::new().run(&request, &|_| {}).await.unwrap_err();
        assert!(matches!(err, CachetError::CommandFailed { .. }));
    }
}
