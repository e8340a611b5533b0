//! External tool invocation
//!
//! Every `pactl` / `pw-link` / `pw-metadata` call in the crate goes through
//! [`ToolRunner`]. Each invocation is a subprocess with a hard per-call
//! timeout: a hung tool produces a [`RouteError::Query`] instead of stalling
//! the supervisor thread forever.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::RouteError;

/// Default per-invocation timeout when no config is loaded (one-shot CLI).
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_millis(5000);

/// A completed invocation, exit status included.
///
/// Most callers want [`ToolRunner::output`], which turns a non-zero exit into
/// an error. `Capture` is for the ones that assign meaning to specific exit
/// codes: `pgrep` exits 1 to report "no processes matched".
#[derive(Debug, Clone)]
pub struct Capture {
    /// Exit code, or `None` if the tool was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Capture {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Invocation seam implemented by [`ToolRunner`].
///
/// Query-then-act callers like `EndpointRegistry` take any `Runner`, so their
/// decision logic can run against a scripted stand-in instead of a live
/// audio server.
#[allow(async_fn_in_trait)]
pub trait Runner {
    /// Run a tool and capture stdout, requiring a zero exit status.
    ///
    /// # Errors
    /// Returns `Spawn` if the tool cannot be launched, `Query` if it exits
    /// non-zero or does not finish in time.
    async fn output(&self, program: &str, args: &[&str]) -> Result<String, RouteError>;

    /// Run a tool and return its stdout split into lines, tool order preserved.
    ///
    /// # Errors
    /// Same failure modes as [`Runner::output`].
    async fn lines(&self, program: &str, args: &[&str]) -> Result<Vec<String>, RouteError> {
        let stdout = self.output(program, args).await?;
        Ok(stdout.lines().map(str::to_string).collect())
    }
}

impl Runner for ToolRunner {
    async fn output(&self, program: &str, args: &[&str]) -> Result<String, RouteError> {
        ToolRunner::output(self, program, args).await
    }
}

/// Runs external audio tools with a bounded wait.
#[derive(Debug, Clone, Copy)]
pub struct ToolRunner {
    timeout: Duration,
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL_TIMEOUT)
    }
}

impl ToolRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run a tool to completion and capture its exit status and both streams.
    ///
    /// A non-zero exit is not an error here; the caller inspects
    /// [`Capture::code`].
    ///
    /// # Errors
    /// Returns `Spawn` if the tool cannot be launched, `Query` if it does not
    /// finish within the timeout.
    pub async fn capture(&self, program: &str, args: &[&str]) -> Result<Capture, RouteError> {
        debug!("running {} {}", program, args.join(" "));

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RouteError::spawn(program, e))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                RouteError::query(program, format!("timed out after {:?}", self.timeout))
            })?
            .map_err(|e| RouteError::query(program, e.to_string()))?;

        Ok(Capture {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run a tool and capture stdout, requiring a zero exit status.
    ///
    /// # Errors
    /// Returns `Spawn` if the tool cannot be launched, `Query` if it exits
    /// non-zero or does not finish within the timeout.
    pub async fn output(&self, program: &str, args: &[&str]) -> Result<String, RouteError> {
        let capture = self.capture(program, args).await?;

        if !capture.success() {
            let code = capture
                .code
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            return Err(RouteError::query(
                program,
                format!("exit {}: {}", code, capture.stderr.trim()),
            ));
        }

        Ok(capture.stdout)
    }

    /// Run a tool and return its stdout split into lines, tool order preserved.
    ///
    /// # Errors
    /// Same failure modes as [`ToolRunner::output`].
    pub async fn lines(&self, program: &str, args: &[&str]) -> Result<Vec<String>, RouteError> {
        let stdout = self.output(program, args).await?;
        Ok(stdout.lines().map(str::to_string).collect())
    }

    /// Best-effort dispatch: a non-zero exit is logged and swallowed.
    ///
    /// Used for link/unlink commands where the server may legitimately refuse
    /// (link already exists, link already gone). Success means the command
    /// was dispatched, not that the server applied it.
    ///
    /// # Errors
    /// Returns `Spawn` if the tool cannot be launched, `Query` only on timeout.
    pub async fn dispatch(&self, program: &str, args: &[&str]) -> Result<(), RouteError> {
        debug!("dispatching {} {}", program, args.join(" "));

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RouteError::spawn(program, e))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                RouteError::query(program, format!("timed out after {:?}", self.timeout))
            })?
            .map_err(|e| RouteError::query(program, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                "{} {} exited {}: {}",
                program,
                args.join(" "),
                output.status,
                stderr.trim()
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn output_captures_stdout() {
        let runner = ToolRunner::default();
        let out = runner.output("echo", &["hello"]).await.unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn lines_preserves_order() {
        let runner = ToolRunner::default();
        let lines = runner.lines("printf", &["a\nb\nc\n"]).await.unwrap();
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn missing_tool_is_spawn_error() {
        let runner = ToolRunner::default();
        let err = runner
            .output("pwpatch-no-such-tool", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, RouteError::Spawn { .. }));
    }

    #[tokio::test]
    async fn nonzero_exit_is_query_error() {
        let runner = ToolRunner::default();
        let err = runner.output("false", &[]).await.unwrap_err();
        assert!(matches!(err, RouteError::Query { .. }));
    }

    #[tokio::test]
    async fn hung_tool_times_out() {
        let runner = ToolRunner::new(Duration::from_millis(50));
        let err = runner.output("sleep", &["5"]).await.unwrap_err();
        match err {
            RouteError::Query { reason, .. } => assert!(reason.contains("timed out")),
            other => panic!("expected Query, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatch_swallows_nonzero_exit() {
        let runner = ToolRunner::default();
        runner.dispatch("false", &[]).await.unwrap();
    }

    #[tokio::test]
    async fn capture_reports_nonzero_exit_code() {
        let runner = ToolRunner::default();
        let capture = runner.capture("sh", &["-c", "exit 3"]).await.unwrap();
        assert_eq!(capture.code, Some(3));
        assert!(!capture.success());
    }

    #[tokio::test]
    async fn capture_collects_both_streams() {
        let runner = ToolRunner::default();
        let capture = runner
            .capture("sh", &["-c", "echo out; echo err >&2"])
            .await
            .unwrap();
        assert!(capture.success());
        assert_eq!(capture.stdout.trim(), "out");
        assert_eq!(capture.stderr.trim(), "err");
    }
}
