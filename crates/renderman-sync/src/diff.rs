//! Diff engine for comparing rendered output with the output tree
//!
//! Key features:
//! - Classify every output path (unchanged, added, changed, removed)
//! - Compare document by document on canonical (key-sorted) YAML, so key
//!   order and formatting noise never count as changes
//! - Name the changed fields and show a line diff with context

use renderman_core::{Document, OutputLayout, UnitId, split_documents};
use renderman_engine::RenderResult;
use serde::Serialize;
use serde_yaml::Value;
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};
use crate::scan::{SkippedUnit, skipped_units, stale_paths};

/// Diff engine for render results
pub struct DiffEngine {
    /// Show context lines around changes
    pub context_lines: usize,
}

impl DiffEngine {
    /// Create a new diff engine
    pub fn new() -> Self {
        Self { context_lines: 3 }
    }

    /// Set the number of context lines
    pub fn with_context(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }

    /// Compare a render result against the files under `output_dir`.
    ///
    /// Rendered paths come first in declared order, followed by stale files
    /// (sorted) as `removed`. Failed units are reported as skipped and never
    /// compared. A file that cannot be read is reported as unreadable and the
    /// comparison moves on.
    pub fn compare(&self, result: &RenderResult, output_dir: &Path) -> Result<DiffReport> {
        let mut files = Vec::with_capacity(result.units.len());
        let mut unreadable = Vec::new();

        for (path, unit) in &result.units {
            let on_disk = match read_existing(&output_dir.join(path)) {
                Ok(on_disk) => on_disk,
                Err(error) => {
                    tracing::debug!(path = %path.display(), %error, "Unreadable output");
                    unreadable.push(UnreadableFile {
                        path: path.clone(),
                        unit: unit.id.clone(),
                        error: error.to_string(),
                    });
                    continue;
                }
            };
            let file = match on_disk {
                None => FileDiff {
                    path: path.clone(),
                    unit: unit.id.clone(),
                    status: DiffStatus::Added,
                    changes: unit
                        .documents
                        .iter()
                        .enumerate()
                        .map(|(index, doc)| DocumentChange::added(index, doc))
                        .collect(),
                },
                Some(text) => {
                    let existing = split_documents(&text);
                    let changes = self.compare_documents(&existing, &unit.documents);
                    FileDiff {
                        path: path.clone(),
                        unit: unit.id.clone(),
                        status: if changes.is_empty() {
                            DiffStatus::Unchanged
                        } else {
                            DiffStatus::Changed
                        },
                        changes,
                    }
                }
            };
            files.push(file);
        }

        for path in stale_paths(result, output_dir)? {
            let Some(unit) = OutputLayout::unit_for_path(&path) else {
                continue;
            };
            let text = match read_existing(&output_dir.join(&path)) {
                Ok(text) => text.unwrap_or_default(),
                Err(error) => {
                    unreadable.push(UnreadableFile {
                        path,
                        unit,
                        error: error.to_string(),
                    });
                    continue;
                }
            };
            tracing::debug!(path = %path.display(), "Output no longer produced by the config");
            files.push(FileDiff {
                changes: split_documents(&text)
                    .iter()
                    .enumerate()
                    .map(|(index, doc)| DocumentChange::removed(index, doc))
                    .collect(),
                path,
                unit,
                status: DiffStatus::Removed,
            });
        }

        Ok(DiffReport {
            files,
            skipped: skipped_units(result),
            unreadable,
        })
    }

    /// Pair documents by position and describe every difference
    fn compare_documents(&self, old: &[Document], new: &[Document]) -> Vec<DocumentChange> {
        let mut changes = Vec::new();

        for index in 0..old.len().max(new.len()) {
            match (old.get(index), new.get(index)) {
                (Some(old_doc), Some(new_doc)) => {
                    let old_canonical = old_doc.canonical();
                    let new_canonical = new_doc.canonical();
                    if old_canonical == new_canonical {
                        continue;
                    }
                    let fields = match (old_doc.parse(), new_doc.parse()) {
                        (Some(old_value), Some(new_value)) => {
                            let mut fields = Vec::new();
                            changed_fields(&old_value, &new_value, "", &mut fields);
                            fields
                        }
                        _ => Vec::new(),
                    };
                    changes.push(DocumentChange {
                        index,
                        identity: new_doc.identity().or_else(|| old_doc.identity()),
                        change_type: ChangeType::Modified,
                        fields,
                        diff: self.compute_text_diff(&old_canonical, &new_canonical),
                    });
                }
                (None, Some(new_doc)) => changes.push(DocumentChange::added(index, new_doc)),
                (Some(old_doc), None) => changes.push(DocumentChange::removed(index, old_doc)),
                (None, None) => {}
            }
        }

        changes
    }

    /// Compute a line diff between two strings, grouped into hunks
    fn compute_text_diff(&self, old: &str, new: &str) -> DiffContent {
        let diff = TextDiff::from_lines(old, new);
        let mut lines = Vec::new();

        for group in diff.grouped_ops(self.context_lines) {
            let (Some(first), Some(last)) = (group.first(), group.last()) else {
                continue;
            };
            let old_range = first.old_range().start..last.old_range().end;
            let new_range = first.new_range().start..last.new_range().end;
            lines.push(DiffLine {
                line_type: LineType::Hunk,
                content: format!(
                    "@@ -{},{} +{},{} @@",
                    old_range.start + 1,
                    old_range.len(),
                    new_range.start + 1,
                    new_range.len()
                ),
                old_line_no: None,
                new_line_no: None,
            });

            for op in &group {
                for change in diff.iter_changes(op) {
                    let line_type = match change.tag() {
                        ChangeTag::Delete => LineType::Removed,
                        ChangeTag::Insert => LineType::Added,
                        ChangeTag::Equal => LineType::Context,
                    };

                    lines.push(DiffLine {
                        line_type,
                        content: change.value().trim_end().to_string(),
                        old_line_no: change.old_index(),
                        new_line_no: change.new_index(),
                    });
                }
            }
        }

        DiffContent { lines }
    }
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a file if it exists
fn read_existing(path: &Path) -> Result<Option<String>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SyncError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Collect dotted paths of fields that differ between two values
fn changed_fields(old: &Value, new: &Value, prefix: &str, out: &mut Vec<String>) {
    if old == new {
        return;
    }

    match (old, new) {
        (Value::Mapping(old_map), Value::Mapping(new_map)) => {
            let mut keys: Vec<(String, &Value)> = old_map
                .keys()
                .chain(new_map.keys().filter(|k| !old_map.contains_key(*k)))
                .map(|k| (key_label(k), k))
                .collect();
            keys.sort_by(|a, b| a.0.cmp(&b.0));

            for (label, key) in keys {
                let path = join_path(prefix, &label);
                match (old_map.get(key), new_map.get(key)) {
                    (Some(o), Some(n)) => changed_fields(o, n, &path, out),
                    _ => out.push(path),
                }
            }
        }
        (Value::Sequence(old_seq), Value::Sequence(new_seq)) if old_seq.len() == new_seq.len() => {
            for (i, (o, n)) in old_seq.iter().zip(new_seq).enumerate() {
                changed_fields(o, n, &format!("{}[{}]", prefix, i), out);
            }
        }
        (Value::Tagged(o), Value::Tagged(n)) if o.tag == n.tag => {
            changed_fields(&o.value, &n.value, prefix, out)
        }
        _ => out.push(if prefix.is_empty() {
            "(document)".to_string()
        } else {
            prefix.to_string()
        }),
    }
}

fn key_label(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// Outcome of comparing a render result with the output tree
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    /// Every compared path: rendered paths in declared order, then removed paths
    pub files: Vec<FileDiff>,

    /// Units that failed to render and were not compared
    pub skipped: Vec<SkippedUnit>,

    /// Output paths that exist but could not be read
    pub unreadable: Vec<UnreadableFile>,
}

impl DiffReport {
    /// True if no rendered or stale path differs from disk.
    ///
    /// Skipped units do not count; callers decide how to treat them.
    pub fn in_sync(&self) -> bool {
        self.files.iter().all(|f| f.status == DiffStatus::Unchanged)
    }

    /// True if every selected unit rendered and every output could be read
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.unreadable.is_empty()
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        !self.in_sync()
    }

    pub fn count(&self, status: DiffStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }

    /// Paths that differ from disk, in report order
    pub fn differing(&self) -> impl Iterator<Item = &FileDiff> {
        self.files
            .iter()
            .filter(|f| f.status != DiffStatus::Unchanged)
    }

    /// Generate a human-readable summary
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        for (status, label) in [
            (DiffStatus::Added, "added"),
            (DiffStatus::Changed, "changed"),
            (DiffStatus::Removed, "removed"),
        ] {
            let n = self.count(status);
            if n > 0 {
                parts.push(format!("{} {}", n, label));
            }
        }
        if !self.skipped.is_empty() {
            parts.push(format!("{} skipped (render failed)", self.skipped.len()));
        }
        if !self.unreadable.is_empty() {
            parts.push(format!("{} unreadable", self.unreadable.len()));
        }

        if parts.is_empty() {
            "No changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// An output path that could not be compared because reading it failed
#[derive(Debug, Clone, Serialize)]
pub struct UnreadableFile {
    pub path: PathBuf,
    pub unit: UnitId,
    pub error: String,
}

/// Comparison of one output path
#[derive(Debug, Clone, Serialize)]
pub struct FileDiff {
    /// Path relative to the output directory
    pub path: PathBuf,

    pub unit: UnitId,

    pub status: DiffStatus,

    /// Document-level changes (empty when unchanged)
    pub changes: Vec<DocumentChange>,
}

/// Classification of an output path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    Unchanged,
    /// Rendered, but not on disk yet
    Added,
    /// Differs from disk
    Changed,
    /// On disk, but no longer rendered
    Removed,
}

impl std::fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiffStatus::Unchanged => write!(f, "unchanged"),
            DiffStatus::Added => write!(f, "added"),
            DiffStatus::Changed => write!(f, "changed"),
            DiffStatus::Removed => write!(f, "removed"),
        }
    }
}

/// A change to a single document within a file
#[derive(Debug, Clone, Serialize)]
pub struct DocumentChange {
    /// Position of the document in the stream
    pub index: usize,

    /// `Kind/namespace/name`, when the document is a Kubernetes object
    pub identity: Option<String>,

    pub change_type: ChangeType,

    /// Dotted paths of changed fields (modified documents only)
    pub fields: Vec<String>,

    pub diff: DiffContent,
}

impl DocumentChange {
    fn added(index: usize, doc: &Document) -> Self {
        Self {
            index,
            identity: doc.identity(),
            change_type: ChangeType::Added,
            fields: Vec::new(),
            diff: DiffContent::new_addition(doc.raw()),
        }
    }

    fn removed(index: usize, doc: &Document) -> Self {
        Self {
            index,
            identity: doc.identity(),
            change_type: ChangeType::Removed,
            fields: Vec::new(),
            diff: DiffContent::new_removal(doc.raw()),
        }
    }

    /// Get a display name for the document
    pub fn display_name(&self) -> String {
        match &self.identity {
            Some(identity) => identity.clone(),
            None => format!("document {}", self.index + 1),
        }
    }
}

/// Type of document change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeType::Added => write!(f, "added"),
            ChangeType::Modified => write!(f, "modified"),
            ChangeType::Removed => write!(f, "removed"),
        }
    }
}

/// Detailed diff content
#[derive(Debug, Clone, Serialize)]
pub struct DiffContent {
    pub lines: Vec<DiffLine>,
}

impl DiffContent {
    fn new_addition(content: &str) -> Self {
        Self::whole(content, LineType::Added)
    }

    fn new_removal(content: &str) -> Self {
        Self::whole(content, LineType::Removed)
    }

    fn whole(content: &str, line_type: LineType) -> Self {
        let lines = content
            .lines()
            .enumerate()
            .map(|(i, line)| DiffLine {
                line_type,
                content: line.to_string(),
                old_line_no: (line_type == LineType::Removed).then_some(i),
                new_line_no: (line_type == LineType::Added).then_some(i),
            })
            .collect();

        Self { lines }
    }

    /// Generate a unified diff string
    pub fn to_unified_diff(&self) -> String {
        let mut output = String::new();

        for line in &self.lines {
            let prefix = match line.line_type {
                LineType::Added => "+",
                LineType::Removed => "-",
                LineType::Context => " ",
                LineType::Hunk => "",
            };
            output.push_str(prefix);
            output.push_str(&line.content);
            output.push('\n');
        }

        output
    }
}

/// A single line in a diff
#[derive(Debug, Clone, Serialize)]
pub struct DiffLine {
    pub line_type: LineType,
    pub content: String,
    pub old_line_no: Option<usize>,
    pub new_line_no: Option<usize>,
}

/// Type of diff line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    Added,
    Removed,
    Context,
    /// `@@ -a,b +c,d @@` hunk header
    Hunk,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::tests::{failure, rendered, touch};
    use renderman_core::{Scope, UnitKind};
    use tempfile::TempDir;

    const DEPLOYMENT: &str = "apiVersion: apps/v1
kind: Deployment
metadata:
  name: api
  namespace: web
spec:
  replicas: 2
  template:
    spec:
      containers:
        - name: api
          image: api:1.0.0";

    fn result_with(units: Vec<(PathBuf, renderman_engine::RenderedUnit)>) -> RenderResult {
        RenderResult {
            units: units.into_iter().collect(),
            ..RenderResult::default()
        }
    }

    #[test]
    fn test_missing_file_is_added() {
        let dir = TempDir::new().unwrap();
        let result = result_with(vec![rendered("web", UnitKind::Release, "api", &[DEPLOYMENT])]);

        let report = DiffEngine::new().compare(&result, dir.path()).unwrap();
        assert_eq!(report.files[0].status, DiffStatus::Added);
        assert_eq!(
            report.files[0].changes[0].identity.as_deref(),
            Some("Deployment/web/api")
        );
        assert!(!report.in_sync());
        assert_eq!(report.summary(), "1 added");
    }

    #[test]
    fn test_key_order_is_unchanged() {
        let dir = TempDir::new().unwrap();
        touch(
            dir.path(),
            "web/cm.bundle.manifest.yaml",
            "---\nmetadata: {name: settings}\nkind: ConfigMap\ndata:\n  b: \"2\"\n  a: \"1\"\n",
        );
        let result = result_with(vec![rendered(
            "web",
            UnitKind::Bundle,
            "cm",
            &["kind: ConfigMap\nmetadata:\n  name: settings\ndata:\n  a: \"1\"\n  b: \"2\""],
        )]);

        let report = DiffEngine::new().compare(&result, dir.path()).unwrap();
        assert_eq!(report.files[0].status, DiffStatus::Unchanged);
        assert!(report.in_sync());
        assert_eq!(report.summary(), "No changes");
    }

    #[test]
    fn test_changed_field_is_identified() {
        let dir = TempDir::new().unwrap();
        touch(
            dir.path(),
            "web/api.release.manifest.yaml",
            &format!("{}\n", DEPLOYMENT),
        );
        let bumped = DEPLOYMENT
            .replace("replicas: 2", "replicas: 3")
            .replace("api:1.0.0", "api:1.1.0");
        let result = result_with(vec![rendered("web", UnitKind::Release, "api", &[&bumped])]);

        let report = DiffEngine::new().compare(&result, dir.path()).unwrap();
        let file = &report.files[0];
        assert_eq!(file.status, DiffStatus::Changed);
        assert_eq!(file.changes.len(), 1);
        assert_eq!(file.changes[0].change_type, ChangeType::Modified);
        assert_eq!(
            file.changes[0].fields,
            vec![
                "spec.replicas".to_string(),
                "spec.template.spec.containers[0].image".to_string(),
            ]
        );
        assert_eq!(file.changes[0].display_name(), "Deployment/web/api");
    }

    #[test]
    fn test_line_diff_has_context() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "web/api.release.manifest.yaml", DEPLOYMENT);
        let bumped = DEPLOYMENT.replace("replicas: 2", "replicas: 3");
        let result = result_with(vec![rendered("web", UnitKind::Release, "api", &[&bumped])]);

        let report = DiffEngine::new()
            .with_context(1)
            .compare(&result, dir.path())
            .unwrap();
        insta::assert_snapshot!(report.files[0].changes[0].diff.to_unified_diff(), @r"
        @@ -6,3 +6,3 @@
         spec:
        -  replicas: 2
        +  replicas: 3
           template:
        ");
    }

    #[test]
    fn test_surplus_documents() {
        let dir = TempDir::new().unwrap();
        touch(
            dir.path(),
            "web/crds.bundle.manifest.yaml",
            "kind: A\n---\nkind: B\n---\nkind: C\n",
        );
        let result = result_with(vec![rendered(
            "web",
            UnitKind::Bundle,
            "crds",
            &["kind: A", "kind: B"],
        )]);

        let report = DiffEngine::new().compare(&result, dir.path()).unwrap();
        let changes = &report.files[0].changes;
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_type, ChangeType::Removed);
        assert_eq!(changes[0].index, 2);
        assert_eq!(changes[0].diff.to_unified_diff(), "-kind: C\n");
    }

    #[test]
    fn test_stale_file_is_removed_and_failures_skipped() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "web/api.release.manifest.yaml", "kind: A\n");
        touch(dir.path(), "web/db.release.manifest.yaml", "kind: Old\n");
        touch(dir.path(), "web/zz.bundle.manifest.yaml", "kind: Gone\n");
        touch(dir.path(), "web/aa.bundle.manifest.yaml", "kind: Gone\n");

        let mut result = result_with(vec![rendered("web", UnitKind::Release, "api", &["kind: A"])]);
        result.failures.push(failure("web", UnitKind::Release, "db"));
        result.scope = Scope::default();

        let report = DiffEngine::new().compare(&result, dir.path()).unwrap();
        let statuses: Vec<(String, DiffStatus)> = report
            .files
            .iter()
            .map(|f| (f.path.to_string_lossy().into_owned(), f.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("web/api.release.manifest.yaml".to_string(), DiffStatus::Unchanged),
                ("web/aa.bundle.manifest.yaml".to_string(), DiffStatus::Removed),
                ("web/zz.bundle.manifest.yaml".to_string(), DiffStatus::Removed),
            ]
        );
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].id.name, "db");
        assert_eq!(report.summary(), "2 removed, 1 skipped (render failed)");
        assert!(!report.in_sync());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_output_does_not_stop_comparison() {
        let dir = TempDir::new().unwrap();
        // A directory where the manifest file should be
        std::fs::create_dir_all(dir.path().join("web/api.release.manifest.yaml")).unwrap();
        let result = result_with(vec![
            rendered("web", UnitKind::Release, "api", &["kind: A"]),
            rendered("web", UnitKind::Bundle, "crds", &["kind: B"]),
        ]);

        let report = DiffEngine::new().compare(&result, dir.path()).unwrap();
        assert_eq!(report.unreadable.len(), 1);
        assert_eq!(
            report.unreadable[0].path,
            PathBuf::from("web/api.release.manifest.yaml")
        );
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].unit.name, "crds");
        assert_eq!(report.files[0].status, DiffStatus::Added);
        assert!(!report.is_complete());
        assert_eq!(report.summary(), "1 added, 1 unreadable");
    }

    #[test]
    fn test_report_serializes_to_json() {
        let dir = TempDir::new().unwrap();
        let result = result_with(vec![rendered("web", UnitKind::Bundle, "crds", &["kind: A"])]);

        let report = DiffEngine::new().compare(&result, dir.path()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["files"][0]["status"], "added");
        assert_eq!(json["files"][0]["unit"]["kind"], "bundle");
        assert_eq!(json["files"][0]["changes"][0]["change_type"], "added");
    }
}
