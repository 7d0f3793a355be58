//! Engine error types

use miette::Diagnostic;
use renderman_core::{NotFoundError, TemplateError};
use renderman_source::{FetchError, SourceError};
use std::time::Duration;
use thiserror::Error;

/// A single unit failed to render.
///
/// Render errors are scoped to their unit: the engine records them and keeps
/// rendering everything else.
#[derive(Debug, Error, Diagnostic)]
pub enum RenderError {
    #[error("{tool} exited with {}: {}", exit_status(*exit_code), stderr_summary(stderr))]
    #[diagnostic(code(renderman::render::tool))]
    ToolFailed {
        tool: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("{tool} timed out after {}s", timeout.as_secs())]
    #[diagnostic(code(renderman::render::timeout))]
    Timeout { tool: String, timeout: Duration },

    #[error("Failed to run {tool}: {source}")]
    #[diagnostic(code(renderman::render::spawn))]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
        #[help]
        help: Option<String>,
    },

    #[error("{tool} produced output that is not valid UTF-8")]
    #[diagnostic(code(renderman::render::output))]
    InvalidOutput { tool: String },

    #[error("Source {locator} is not valid UTF-8")]
    #[diagnostic(code(renderman::render::source_encoding))]
    SourceEncoding { locator: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),

    #[error("Not rendered: overall timeout of {}s reached", timeout.as_secs())]
    #[diagnostic(code(renderman::render::aborted))]
    Aborted { timeout: Duration },
}

impl RenderError {
    /// Short category name used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ToolFailed { .. } => "tool",
            Self::Timeout { .. } => "timeout",
            Self::Spawn { .. } => "spawn",
            Self::InvalidOutput { .. } | Self::SourceEncoding { .. } => "encoding",
            Self::Template(_) => "template",
            Self::Fetch(_) => "fetch",
            Self::Aborted { .. } => "aborted",
        }
    }

    pub(crate) fn spawn(tool: &str, source: std::io::Error) -> Self {
        let help = (source.kind() == std::io::ErrorKind::NotFound)
            .then(|| format!("make sure `{}` is installed and on PATH", tool));
        Self::Spawn {
            tool: tool.to_string(),
            source,
            help,
        }
    }
}

impl From<SourceError> for RenderError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::Template(e) => RenderError::Template(e),
            SourceError::Fetch(e) => RenderError::Fetch(e),
        }
    }
}

fn exit_status(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}

/// Last non-empty stderr line; tools print the actual error last
fn stderr_summary(stderr: &str) -> &str {
    stderr
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(str::trim)
        .unwrap_or("(no stderr output)")
}

/// Errors that abort a whole render pass
#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
