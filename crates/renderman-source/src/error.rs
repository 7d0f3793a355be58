//! Error types for source resolution

use miette::Diagnostic;
use renderman_core::TemplateError;
use std::path::PathBuf;
use thiserror::Error;

/// A source could not be fetched or read
#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    // ============ Network Errors ============
    #[error("HTTP error {status} fetching {locator}")]
    #[diagnostic(code(renderman::fetch::http))]
    Http { locator: String, status: u16 },

    #[error("Network error fetching {locator}: {message}")]
    #[diagnostic(code(renderman::fetch::network))]
    Network { locator: String, message: String },

    #[error("Request timed out fetching {locator}")]
    #[diagnostic(code(renderman::fetch::timeout))]
    Timeout { locator: String },

    #[error("Unsupported URL scheme {scheme:?} in {locator}")]
    #[diagnostic(
        code(renderman::fetch::scheme),
        help("sources must be local paths or http(s):// / file:// URLs")
    )]
    UnsupportedScheme { locator: String, scheme: String },

    #[error("Failed to create HTTP client: {message}")]
    #[diagnostic(code(renderman::fetch::client))]
    Client { message: String },

    // ============ IO Errors ============
    #[error("Failed to read {}: {source}", path.display())]
    #[diagnostic(code(renderman::fetch::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Classify a reqwest failure for the given locator
    pub(crate) fn from_reqwest(locator: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout {
                locator: locator.to_string(),
            }
        } else if let Some(status) = e.status() {
            FetchError::Http {
                locator: locator.to_string(),
                status: status.as_u16(),
            }
        } else if e.is_connect() {
            FetchError::Network {
                locator: locator.to_string(),
                message: format!("Connection failed: {}", e),
            }
        } else {
            FetchError::Network {
                locator: locator.to_string(),
                message: e.to_string(),
            }
        }
    }
}

/// Resolving a source template: either substitution or the fetch failed
#[derive(Debug, Error, Diagnostic)]
pub enum SourceError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),
}

/// Result type for fetch operations
pub type Result<T> = std::result::Result<T, FetchError>;
