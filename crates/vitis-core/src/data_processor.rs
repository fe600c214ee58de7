use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::types::{DocumentChunk, Meta, MetaValue};

/// Turns knowledge-base JSON files into the corpus.
///
/// Each `*.json` file holds one record or an array of records shaped like
/// `{id, title, category, content, ...}`. `content` becomes the chunk text;
/// every other field becomes flattened metadata.
#[derive(Default)]
pub struct DataProcessor {
    limit: Option<usize>,
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    /// Only read the first `limit` files (sorted by path).
    pub fn with_file_limit(limit: usize) -> Self { Self { limit: Some(limit) } }

    pub fn process_directory(&self, kb_dir: &Path) -> Result<Vec<DocumentChunk>> {
        let mut files = list_json_files(kb_dir);
        if files.is_empty() {
            warn!(dir = %kb_dir.display(), "no .json knowledge-base files found");
            return Ok(vec![]);
        }
        if let Some(limit) = self.limit {
            if files.len() > limit { files.truncate(limit); info!(limit, "limited knowledge-base files"); }
        }
        let mut seen = HashSet::new();
        let mut all_chunks = Vec::new();
        for (file_index, file_path) in files.iter().enumerate() {
            info!(file = %file_path.display(), "processing file {}/{}", file_index + 1, files.len());
            let raw = std::fs::read_to_string(file_path).with_context(|| format!("reading {}", file_path.display()))?;
            let value: Value = serde_json::from_str(&raw).with_context(|| format!("parsing {}", file_path.display()))?;
            let stem = file_path.file_stem().map_or_else(|| "kb".to_string(), |s| s.to_string_lossy().to_string());
            let records = match value {
                Value::Array(items) => items,
                other => vec![other],
            };
            for (record_index, record) in records.into_iter().enumerate() {
                let Value::Object(map) = record else {
                    warn!(file = %file_path.display(), record_index, "skipping non-object record");
                    continue;
                };
                let Some(mut chunk) = record_to_chunk(map) else {
                    warn!(file = %file_path.display(), record_index, "skipping record without content");
                    continue;
                };
                if seen.contains(&chunk.id) {
                    // metadata["id"] keeps the source id; only the chunk id is renamed.
                    let original = std::mem::take(&mut chunk.id);
                    chunk.id = unique_id(&mut seen, &stem, record_index);
                    warn!(file = %file_path.display(), id = %original, renamed = %chunk.id, "duplicate chunk id renamed");
                } else {
                    seen.insert(chunk.id.clone());
                }
                all_chunks.push(chunk);
            }
        }
        info!(files = files.len(), chunks = all_chunks.len(), "knowledge base processed");
        Ok(all_chunks)
    }
}

/// `{stem}:{index}`, then `{stem}:{index}:2`, `:3`, ... until unused. Registers the result.
fn unique_id(seen: &mut HashSet<String>, stem: &str, record_index: usize) -> String {
    let base = format!("{stem}:{record_index}");
    let mut candidate = base.clone();
    let mut n = 2;
    while !seen.insert(candidate.clone()) {
        candidate = format!("{base}:{n}");
        n += 1;
    }
    candidate
}

/// Build a chunk from one KB record. `None` when `content` is missing or blank.
///
/// Defaults follow the knowledge-base convention: a missing `id` becomes
/// `"unknown"`, `category` becomes `"general"`, `title` becomes `""`.
pub fn record_to_chunk(mut record: Map<String, Value>) -> Option<DocumentChunk> {
    let content = match record.remove("content") {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => return None,
        Some(other) => flatten_value(other)?.to_string(),
    };
    if content.trim().is_empty() { return None; }
    record.entry("id").or_insert_with(|| Value::String("unknown".into()));
    record.entry("category").or_insert_with(|| Value::String("general".into()));
    record.entry("title").or_insert_with(|| Value::String(String::new()));
    let metadata = flatten_metadata(record);
    let id = metadata.get("id").map_or_else(|| "unknown".to_string(), ToString::to_string);
    Some(DocumentChunk { id, text: content, metadata })
}

/// Reduce arbitrary JSON metadata to primitives.
///
/// Lists become `", "`-joined strings, objects become JSON text and nulls are
/// dropped.
pub fn flatten_metadata(map: Map<String, Value>) -> Meta {
    map.into_iter().filter_map(|(k, v)| flatten_value(v).map(|v| (k, v))).collect()
}

fn flatten_value(value: Value) -> Option<MetaValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(MetaValue::Bool(b)),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => MetaValue::Int(i),
            None => MetaValue::Float(n.as_f64().unwrap_or_default()),
        }),
        Value::String(s) => Some(MetaValue::Str(s)),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect();
            Some(MetaValue::Str(parts.join(", ")))
        }
        Value::Object(obj) => Some(MetaValue::Str(Value::Object(obj).to_string())),
    }
}

fn list_json_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    files.sort();
    files
}
