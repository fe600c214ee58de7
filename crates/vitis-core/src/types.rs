//! Domain types used by the lexical, vector and hybrid retrievers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type ChunkId = String;
pub type Meta = BTreeMap<String, MetaValue>;

/// A primitive metadata value. Nested structures never survive ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Bool(b) => write!(f, "{b}"),
            MetaValue::Int(i) => write!(f, "{i}"),
            MetaValue::Float(x) => write!(f, "{x}"),
            MetaValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self { MetaValue::Str(s.to_string()) }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self { MetaValue::Str(s) }
}

/// A unit of knowledge-base text that is independently indexed.
///
/// - `id`: corpus-unique chunk identifier, shared by both indexes
/// - `text`: the payload that is embedded and keyword-indexed
/// - `metadata`: flat primitive fields (`id`, `title`, `category`, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: ChunkId,
    pub text: String,
    #[serde(default)]
    pub metadata: Meta,
}

impl DocumentChunk {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: Meta::new() }
    }

    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn title(&self) -> Option<&str> { self.metadata.get("title").and_then(MetaValue::as_str) }

    pub fn category(&self) -> Option<&str> { self.metadata.get("category").and_then(MetaValue::as_str) }
}

/// Indicates which engine produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Lexical,
}

/// A chunk plus a retriever-local relevance signal.
///
/// `score` is engine-specific (BM25 or cosine similarity) and only comparable
/// within one result list; higher is always better.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalHit {
    pub chunk: DocumentChunk,
    pub score: f32,
    pub source: SourceKind,
}

/// Speaker of a conversation turn, stored as `user` / `ai`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Ai,
}

impl Role {
    /// Label used when rendering history into a prompt.
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "Human",
            Role::Ai => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn now(role: Role, text: impl Into<String>) -> Self {
        Self { role, text: text.into(), timestamp: Utc::now() }
    }
}
