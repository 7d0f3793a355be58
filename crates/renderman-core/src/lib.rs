//! Renderman Core - Core types for rendering Kubernetes manifests
//!
//! This crate provides the foundational types used throughout renderman:
//! - `StackConfig`: The stack configuration (apps, releases, kustomizations, bundles)
//! - `UnitId` / `UnitKind`: Identity of a renderable unit
//! - `OutputLayout`: Mapping from units to files in the output tree
//! - `Document`: Verbatim YAML documents and their canonical form
//! - `template`: `{placeholder}` substitution for bundle sources

pub mod config;
pub mod document;
pub mod error;
pub mod output;
pub mod template;
pub mod unit;

pub use config::{
    App, Bundle, ChartRef, Kustomization, Release, StackConfig, CONFIG_FILE_NAME, DEFAULT_HELMFILE,
    SUPPORTED_SCHEMA_VERSIONS,
};
pub use document::{Document, join_documents, split_documents};
pub use error::{ConfigError, NotFoundError, TemplateError};
pub use output::{Filter, OutputLayout, Scope, SelectedUnit, Selection, MANIFEST_SUFFIX};
pub use unit::{UnitId, UnitKind, UnitRef};
