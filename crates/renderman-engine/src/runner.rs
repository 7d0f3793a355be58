//! External tool execution
//!
//! Renderers never spawn processes directly; they describe an [`Invocation`]
//! and hand it to a [`ToolRunner`]. The default [`ProcessRunner`] runs the
//! tool with a per-invocation timeout and captures both output streams.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::RenderError;

/// Default timeout for a single tool invocation
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(300);

/// A fully described external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: PathBuf,
}

impl Invocation {
    pub fn new(program: impl Into<String>, current_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: current_dir.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append `flag value` when the value is present
    pub fn opt(self, flag: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.arg(flag).arg(value),
            None => self,
        }
    }

    /// Append a bare flag when `enabled`
    pub fn flag(self, flag: &str, enabled: bool) -> Self {
        if enabled { self.arg(flag) } else { self }
    }

    /// Tool name for messages: the file name of the program
    pub fn tool(&self) -> &str {
        Path::new(&self.program)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.program)
    }

    /// Shell-like rendering for logs
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured output of a successful invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    /// Trimmed stderr; tools print warnings here even on success
    pub stderr: String,
}

/// Runs external tools
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run an invocation to completion.
    ///
    /// A non-zero exit status is an error carrying the tool's stderr.
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput, RenderError>;
}

/// Runs tools as child processes
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL_TIMEOUT)
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput, RenderError> {
        let tool = invocation.tool().to_string();
        tracing::debug!(
            command = %invocation.command_line(),
            dir = %invocation.current_dir.display(),
            "Running external tool"
        );

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .current_dir(&invocation.current_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the future on timeout kills the child
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                tracing::debug!(tool = %tool, timeout_secs = self.timeout.as_secs(), "Tool timed out");
                return Err(RenderError::Timeout {
                    tool,
                    timeout: self.timeout,
                });
            }
            Ok(Err(source)) => return Err(RenderError::spawn(&tool, source)),
            Ok(Ok(output)) => output,
        };

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            tracing::debug!(tool = %tool, code = ?output.status.code(), "Tool failed");
            return Err(RenderError::ToolFailed {
                tool,
                exit_code: output.status.code(),
                stderr,
            });
        }

        let stdout =
            String::from_utf8(output.stdout).map_err(|_| RenderError::InvalidOutput { tool })?;

        Ok(ToolOutput { stdout, stderr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_builder() {
        let inv = Invocation::new("/usr/local/bin/helm", "/stack")
            .args(["template", "web"])
            .opt("--version", Some("1.2.3"))
            .opt("--repo", None::<String>)
            .flag("--debug", true)
            .flag("--skip-deps", false);

        assert_eq!(inv.tool(), "helm");
        assert_eq!(
            inv.command_line(),
            "/usr/local/bin/helm template web --version 1.2.3 --debug"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_captures_output() {
        let runner = ProcessRunner::default();
        let inv = Invocation::new("sh", ".").args(["-c", "echo 'kind: A'; echo careful >&2"]);

        let output = runner.run(&inv).await.unwrap();
        assert_eq!(output.stdout, "kind: A\n");
        assert_eq!(output.stderr, "careful");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_non_zero_exit() {
        let runner = ProcessRunner::default();
        let inv = Invocation::new("sh", ".").args(["-c", "echo boom >&2; exit 3"]);

        match runner.run(&inv).await.unwrap_err() {
            RenderError::ToolFailed {
                tool,
                exit_code,
                stderr,
            } => {
                assert_eq!(tool, "sh");
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_timeout() {
        let runner = ProcessRunner::new(Duration::from_millis(100));
        let inv = Invocation::new("sleep", ".").arg("5");

        let started = std::time::Instant::now();
        let err = runner.run(&inv).await.unwrap_err();
        assert!(matches!(err, RenderError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_process_runner_missing_binary() {
        let runner = ProcessRunner::default();
        let inv = Invocation::new("renderman-no-such-tool", ".");

        let err = runner.run(&inv).await.unwrap_err();
        assert!(matches!(err, RenderError::Spawn { ref tool, .. } if tool == "renderman-no-such-tool"));
    }
}
