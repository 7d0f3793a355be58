//! Core error types

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// The stack configuration could not be loaded or is invalid.
///
/// Config errors are fatal: nothing is rendered without a valid config.
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("Config file not found: {}", path.display())]
    #[diagnostic(
        code(renderman::config::not_found),
        help("pass --config-file or run renderman from the directory containing renderman.yaml")
    )]
    NotFound { path: PathBuf },

    #[error("Failed to read config file {}: {source}", path.display())]
    #[diagnostic(code(renderman::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    #[diagnostic(code(renderman::config::parse))]
    Parse(#[from] serde_yaml::Error),

    #[error("Unsupported schema version: {found}")]
    #[diagnostic(code(renderman::config::schema_version))]
    UnsupportedSchemaVersion {
        found: String,
        #[help]
        help: Option<String>,
    },

    #[error("Invalid name {name:?} for {what}: {reason}")]
    #[diagnostic(code(renderman::config::invalid_name))]
    InvalidName {
        what: String,
        name: String,
        reason: String,
    },

    #[error("Duplicate {kind} name {name:?} in app {app}")]
    #[diagnostic(
        code(renderman::config::duplicate_unit),
        help("unit names must be unique per kind within an app")
    )]
    DuplicateUnit {
        app: String,
        kind: String,
        name: String,
    },

    #[error("Missing required field {field} in {context}")]
    #[diagnostic(code(renderman::config::missing_field))]
    MissingField { field: String, context: String },
}

/// A `{placeholder}` in a locator or data value could not be resolved.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unresolved placeholder {{{key}}} in {template:?}")]
    #[diagnostic(code(renderman::template::missing_key))]
    MissingKey {
        key: String,
        template: String,
        #[help]
        help: Option<String>,
    },

    #[error("Cyclic placeholder reference: {}", chain.join(" -> "))]
    #[diagnostic(code(renderman::template::cycle))]
    Cycle { chain: Vec<String> },

    #[error("Malformed template {template:?}: {message}")]
    #[diagnostic(code(renderman::template::malformed))]
    Malformed { template: String, message: String },

    #[error("Data value {key:?} is not a scalar and cannot be substituted")]
    #[diagnostic(code(renderman::template::not_scalar))]
    NotScalar { key: String },
}

/// An app filter named an app that does not exist or is disabled.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("App not found: {name}")]
    #[diagnostic(code(renderman::app::not_found))]
    App {
        name: String,
        #[help]
        help: Option<String>,
    },

    #[error("App {name} is disabled")]
    #[diagnostic(
        code(renderman::app::disabled),
        help("set `enabled: true` for this app to render it")
    )]
    Disabled { name: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
