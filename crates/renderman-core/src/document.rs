//! Multi-document YAML streams
//!
//! Documents are kept as verbatim text blocks. Parsing only happens to build
//! a canonical form for comparison and an identity label for display; the
//! original bytes are what gets written and shown.

use serde::Serialize;
use serde_yaml::{Mapping, Value};

/// Document separator used when joining a stream
pub const SEPARATOR: &str = "---";

/// One YAML document, verbatim
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Document {
    raw: String,
}

impl Document {
    /// Wrap a block of text, trimming surrounding blank lines
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self {
            raw: trim_block(raw.as_ref()).to_string(),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Parsed YAML value, if the block is valid YAML
    pub fn parse(&self) -> Option<Value> {
        serde_yaml::from_str(&self.raw).ok()
    }

    /// Key-sorted re-serialisation used for comparison.
    ///
    /// Falls back to the trimmed raw text when the block does not parse.
    pub fn canonical(&self) -> String {
        self.parse()
            .and_then(|value| serde_yaml::to_string(&canonicalize(value)).ok())
            .unwrap_or_else(|| self.raw.trim().to_string())
    }

    /// `Kind/namespace/name` (or `Kind/name`) of a Kubernetes object
    pub fn identity(&self) -> Option<String> {
        identity_of(&self.parse()?)
    }
}

/// Identity label of a parsed Kubernetes object
pub fn identity_of(value: &Value) -> Option<String> {
    let kind = value.get("kind")?.as_str()?;
    let metadata = value.get("metadata");
    let name = metadata
        .and_then(|m| m.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("unnamed");
    let namespace = metadata
        .and_then(|m| m.get("namespace"))
        .and_then(Value::as_str);

    Some(match namespace {
        Some(ns) => format!("{}/{}/{}", kind, ns, name),
        None => format!("{}/{}", kind, name),
    })
}

/// Split a multi-document stream into documents, preserving order.
///
/// Whitespace-only blocks (including those produced by leading or trailing
/// separators) are dropped.
pub fn split_documents(stream: &str) -> Vec<Document> {
    let stream = stream.strip_prefix('\u{feff}').unwrap_or(stream);
    let mut documents = Vec::new();
    let mut current = String::new();

    for line in stream.split_inclusive('\n') {
        if let Some(rest) = separator_rest(line) {
            push_block(&mut documents, &current);
            current.clear();
            // `--- {kind: A}` and `--- |` start the next document inline
            if !rest.is_empty() {
                current.push_str(rest);
                current.push('\n');
            }
        } else {
            current.push_str(line);
        }
    }
    push_block(&mut documents, &current);

    documents
}

/// Join documents into the stream written to disk
pub fn join_documents(documents: &[Document]) -> String {
    let mut out = String::new();
    for (i, document) in documents.iter().enumerate() {
        if i > 0 {
            out.push_str(SEPARATOR);
            out.push('\n');
        }
        out.push_str(document.raw());
        out.push('\n');
    }
    out
}

/// Recursively sort mapping keys
pub fn canonicalize(value: Value) -> Value {
    match value {
        Value::Mapping(mapping) => {
            let mut entries: Vec<(String, Value, Value)> = mapping
                .into_iter()
                .map(|(k, v)| (sort_key(&k), k, canonicalize(v)))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Mapping::with_capacity(entries.len());
            for (_, k, v) in entries {
                sorted.insert(k, v);
            }
            Value::Mapping(sorted)
        }
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(canonicalize).collect()),
        Value::Tagged(mut tagged) => {
            tagged.value = canonicalize(tagged.value);
            Value::Tagged(tagged)
        }
        other => other,
    }
}

fn sort_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other).unwrap_or_default(),
    }
}

/// For a separator line, the content that follows `---` on the same line.
///
/// A trailing `# comment` is not content.
fn separator_rest(line: &str) -> Option<&str> {
    let line = line.trim_end();
    let rest = line.strip_prefix(SEPARATOR)?;
    if rest.is_empty() {
        return Some("");
    }
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let rest = rest.trim_start();
    Some(if rest.starts_with('#') { "" } else { rest })
}

fn push_block(documents: &mut Vec<Document>, block: &str) {
    if !block.trim().is_empty() {
        documents.push(Document::new(block));
    }
}

/// Drop leading blank lines and all trailing whitespace, keeping the first
/// content line's indentation
fn trim_block(block: &str) -> &str {
    let mut start = 0;
    for line in block.split_inclusive('\n') {
        if !line.trim().is_empty() {
            break;
        }
        start += line.len();
    }
    block[start..].trim_end()
}
