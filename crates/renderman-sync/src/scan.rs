//! Looking at what is already on disk

use renderman_core::{OutputLayout, UnitId};
use renderman_engine::RenderResult;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Result, SyncError};

/// A selected unit whose render failed, left out of diff and write
#[derive(Debug, Clone, Serialize)]
pub struct SkippedUnit {
    pub id: UnitId,
    pub path: PathBuf,
    /// Error category (`tool`, `fetch`, `timeout`, ...)
    pub kind: &'static str,
    pub reason: String,
}

/// Failed units of a render pass, in declared order
pub fn skipped_units(result: &RenderResult) -> Vec<SkippedUnit> {
    result
        .failures
        .iter()
        .map(|failure| SkippedUnit {
            id: failure.id.clone(),
            path: failure.path.clone(),
            kind: failure.error.kind(),
            reason: failure.error.to_string(),
        })
        .collect()
}

/// Manifest files under `output_dir` that the render pass no longer produces.
///
/// Only files named like unit outputs and inside the pass's scope count.
/// Files of units that failed this run are never stale. Paths are relative
/// and sorted.
pub fn stale_paths(result: &RenderResult, output_dir: &Path) -> Result<Vec<PathBuf>> {
    if !output_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut stale = Vec::new();
    let walker = WalkDir::new(output_dir)
        .max_depth(2)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

    for entry in walker {
        let entry = entry.map_err(|e| SyncError::Scan {
            path: output_dir.to_path_buf(),
            message: e.to_string(),
        })?;
        if entry.depth() != 2 || !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(output_dir) else {
            continue;
        };
        let Some(id) = OutputLayout::unit_for_path(relative) else {
            continue;
        };

        if result.scope.covers(&id.app, id.kind)
            && !result.units.contains_key(relative)
            && !result.is_failed(relative)
        {
            tracing::debug!(path = %relative.display(), "Found stale output");
            stale.push(relative.to_path_buf());
        }
    }

    stale.sort();
    Ok(stale)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|name| name.starts_with('.'))
}
