//! Writing rendered units to the output tree

use renderman_core::{OutputLayout, UnitId};
use renderman_engine::RenderResult;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};
use crate::scan::{SkippedUnit, skipped_units, stale_paths};

/// What happened to one output file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteAction {
    Created,
    Updated,
    /// Content already matched; the file was not touched
    Unchanged,
}

#[derive(Debug, Clone, Serialize)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub unit: UnitId,
    pub action: WriteAction,
}

/// A unit that rendered but could not be written
#[derive(Debug)]
pub struct WriteFailure {
    pub path: PathBuf,
    pub unit: UnitId,
    pub error: SyncError,
}

/// Outcome of applying a render result
#[derive(Debug, Default)]
pub struct WriteReport {
    /// Rendered units in declared order
    pub files: Vec<WrittenFile>,
    pub failed: Vec<WriteFailure>,
    /// Units that failed to render; their files were left as they were
    pub skipped: Vec<SkippedUnit>,
    /// Files no longer produced by the config; never deleted
    pub stale: Vec<PathBuf>,
}

impl WriteReport {
    pub fn count(&self, action: WriteAction) -> usize {
        self.files.iter().filter(|f| f.action == action).count()
    }

    /// True if anything on disk changed
    pub fn has_writes(&self) -> bool {
        self.files.iter().any(|f| f.action != WriteAction::Unchanged)
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    /// Get a summary message
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("{} created", self.count(WriteAction::Created)),
            format!("{} updated", self.count(WriteAction::Updated)),
            format!("{} unchanged", self.count(WriteAction::Unchanged)),
        ];
        if !self.stale.is_empty() {
            parts.push(format!("{} stale", self.stale.len()));
        }
        if !self.skipped.is_empty() {
            parts.push(format!("{} skipped (render failed)", self.skipped.len()));
        }
        if !self.failed.is_empty() {
            parts.push(format!("{} failed to write", self.failed.len()));
        }
        parts.join(", ")
    }
}

/// Write every rendered unit of `result` below `output_dir`.
///
/// Files whose content is already identical are not written at all, so a
/// repeated run changes nothing on disk. A write error only affects its own
/// path. Stale files are reported, never deleted.
pub fn apply(result: &RenderResult, output_dir: &Path) -> Result<WriteReport> {
    let layout = OutputLayout::new(output_dir);
    let mut report = WriteReport {
        skipped: skipped_units(result),
        ..WriteReport::default()
    };

    for (path, unit) in &result.units {
        let target = layout.path_for_unit(&unit.id);
        match write_if_changed(&target, &unit.to_yaml()) {
            Ok(action) => {
                tracing::debug!(path = %path.display(), ?action, "Wrote output");
                report.files.push(WrittenFile {
                    path: path.clone(),
                    unit: unit.id.clone(),
                    action,
                });
            }
            Err(error) => {
                tracing::debug!(path = %path.display(), %error, "Failed to write output");
                report.failed.push(WriteFailure {
                    path: path.clone(),
                    unit: unit.id.clone(),
                    error,
                });
            }
        }
    }

    report.stale = stale_paths(result, output_dir)?;
    for path in &report.stale {
        tracing::debug!(path = %path.display(), "Stale output left in place");
    }

    Ok(report)
}

fn write_if_changed(target: &Path, content: &str) -> Result<WriteAction> {
    let action = match std::fs::read(target) {
        Ok(existing) if existing == content.as_bytes() => return Ok(WriteAction::Unchanged),
        Ok(_) => WriteAction::Updated,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => WriteAction::Created,
        Err(source) => {
            return Err(SyncError::Read {
                path: target.to_path_buf(),
                source,
            });
        }
    };

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|source| SyncError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(target, content).map_err(|source| SyncError::Write {
        path: target.to_path_buf(),
        source,
    })?;

    Ok(action)
}
