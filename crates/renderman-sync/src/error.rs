//! Error types for diffing and writing

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SyncError {
    #[error("Failed to read {}: {source}", path.display())]
    #[diagnostic(code(renderman::sync::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    #[diagnostic(code(renderman::sync::write))]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to scan output directory {}: {message}", path.display())]
    #[diagnostic(
        code(renderman::sync::scan),
        help("check that the output directory is readable")
    )]
    Scan { path: PathBuf, message: String },
}

/// Result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
