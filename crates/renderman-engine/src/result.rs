//! Results of a render pass

use indexmap::IndexMap;
use renderman_core::{Document, Scope, UnitId, join_documents};
use std::path::{Path, PathBuf};

use crate::error::RenderError;

/// A unit that rendered successfully
#[derive(Debug, Clone)]
pub struct RenderedUnit {
    pub id: UnitId,
    pub documents: Vec<Document>,
    pub warnings: Vec<String>,
}

impl RenderedUnit {
    /// The manifest file content for this unit
    pub fn to_yaml(&self) -> String {
        join_documents(&self.documents)
    }
}

/// A unit that failed to render
#[derive(Debug)]
pub struct UnitFailure {
    pub id: UnitId,
    /// Relative output path the unit would have been written to
    pub path: PathBuf,
    pub error: RenderError,
}

/// Everything one render pass produced.
///
/// Keyed by relative output path, in declared order. Failed units are absent
/// from `units` and listed in `failures`; they never cause another unit to be
/// dropped.
#[derive(Debug, Default)]
pub struct RenderResult {
    pub units: IndexMap<PathBuf, RenderedUnit>,
    pub failures: Vec<UnitFailure>,
    /// Part of the output tree this pass is responsible for
    pub scope: Scope,
}

impl RenderResult {
    /// True if every selected unit rendered
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<&RenderedUnit> {
        self.units.get(path)
    }

    /// Whether the unit at `path` was selected but failed
    pub fn is_failed(&self, path: &Path) -> bool {
        self.failures.iter().any(|f| f.path == path)
    }

    pub fn warning_count(&self) -> usize {
        self.units.values().map(|u| u.warnings.len()).sum()
    }

    /// Get a summary message
    pub fn summary(&self) -> String {
        let rendered = self.units.len();
        let failed = self.failures.len();
        let plural = |n: usize| if n == 1 { "" } else { "s" };

        if failed == 0 {
            format!("Rendered {} unit{}", rendered, plural(rendered))
        } else {
            format!(
                "Rendered {} unit{}, {} failed",
                rendered,
                plural(rendered),
                failed
            )
        }
    }
}
