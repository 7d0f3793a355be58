//! Per-kind renderers
//!
//! Each unit kind has its own renderer behind the [`Renderer`] capability.
//! Renderers are independent of each other and of the output tree: they only
//! turn a unit definition into documents (or an error).

mod bundle;
mod kustomization;
mod release;

pub use bundle::BundleRenderer;
pub use kustomization::KustomizationRenderer;
pub use release::ReleaseRenderer;

use async_trait::async_trait;
use renderman_core::{Document, split_documents};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::RenderError;
use crate::runner::{ToolOutput, ToolRunner};

/// Renders one kind of unit into documents
#[async_trait]
pub trait Renderer<U: Sync + ?Sized>: Send + Sync {
    async fn render(&self, unit: &U) -> Result<Rendered, RenderError>;
}

/// Documents produced for a unit, plus non-fatal warnings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub documents: Vec<Document>,
    pub warnings: Vec<String>,
}

impl Rendered {
    /// Split tool output into documents and surface its stderr as warnings
    pub(crate) fn from_tool_output(tool: &str, output: ToolOutput) -> Self {
        let documents = split_documents(&output.stdout);
        let mut warnings: Vec<String> = output
            .stderr
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| format!("{}: {}", tool, line))
            .collect();
        if documents.is_empty() {
            warnings.push(format!("{} produced no documents", tool));
        }
        Self {
            documents,
            warnings,
        }
    }
}

/// Executables used for the external tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub helm: String,
    pub helmfile: String,
    pub kustomize: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            helm: "helm".to_string(),
            helmfile: "helmfile".to_string(),
            kustomize: "kustomize".to_string(),
        }
    }
}

/// Shared state for renderers that shell out
pub struct ToolContext {
    pub runner: Arc<dyn ToolRunner>,
    pub tools: ToolPaths,
    /// Working directory for every tool; relative config paths resolve here
    pub base_dir: PathBuf,
    pub debug: bool,
    pub skip_deps: bool,
}
