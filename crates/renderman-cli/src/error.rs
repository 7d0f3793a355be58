//! CLI error types with exit code handling

use miette::Diagnostic;
use renderman_core::{ConfigError, NotFoundError};
use renderman_engine::EngineError;
use renderman_sync::SyncError;
use thiserror::Error;

use crate::exit_codes;

/// Errors that end a command early
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(EngineError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Sync(#[from] SyncError),

    /// IO error writing command output
    #[error("IO error: {message}")]
    #[diagnostic(code(renderman::cli::io))]
    Io { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => exit_codes::CONFIG_ERROR,
            CliError::NotFound(_) => exit_codes::NOT_FOUND,
            CliError::Engine(_) => exit_codes::RENDER_ERROR,
            CliError::Sync(_) | CliError::Io { .. } => exit_codes::IO_ERROR,
        }
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound(e) => CliError::NotFound(e),
            other => CliError::Engine(other),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let config = CliError::from(ConfigError::NotFound {
            path: "renderman.yaml".into(),
        });
        assert_eq!(config.exit_code(), exit_codes::CONFIG_ERROR);

        let missing = CliError::from(EngineError::NotFound(NotFoundError::Disabled {
            name: "legacy".to_string(),
        }));
        assert!(matches!(missing, CliError::NotFound(_)));
        assert_eq!(missing.exit_code(), exit_codes::NOT_FOUND);

        let io = CliError::from(std::io::Error::other("broken pipe"));
        assert_eq!(io.exit_code(), exit_codes::IO_ERROR);
    }
}
