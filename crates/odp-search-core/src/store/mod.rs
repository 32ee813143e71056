//! Term index abstraction for ODP Search.
//!
//! The [`TermIndex`] trait defines the full-text index operations needed
//! by the index builder and the query pipeline, enabling pluggable
//! backends (SQLite FTS5, in-memory).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Field, IndexedDocument};

/// A pattern returned from a ranked term query or nearest-neighbour search.
#[derive(Debug, Clone, PartialEq)]
pub struct TermHit {
    pub pattern_id: String,
    /// Backend-specific score; larger is more relevant. Not comparable
    /// across backends or strategies.
    pub raw_score: f64,
}

impl TermHit {
    pub fn new(pattern_id: impl Into<String>, raw_score: f64) -> Self {
        Self {
            pattern_id: pattern_id.into(),
            raw_score,
        }
    }
}

/// Abstract full-text index over pattern documents.
///
/// An index instance is one generation: it starts empty and is filled by
/// a single rebuild. Callers never mix documents from two generations;
/// a rebuild creates a fresh instance.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`put`](TermIndex::put) | Add or replace a document by id |
/// | [`search`](TermIndex::search) | Ranked term query over one field |
/// | [`get_by_id`](TermIndex::get_by_id) | Fetch a stored document |
/// | [`documents`](TermIndex::documents) | All stored documents, ordered by id |
/// | [`len`](TermIndex::len) | Number of stored documents |
#[async_trait]
pub trait TermIndex: Send + Sync {
    /// Add a document, replacing any stored document with the same id.
    async fn put(&self, doc: &IndexedDocument) -> Result<()>;

    /// Rank documents by relevance of `field` to `terms`, most relevant
    /// first, at most `limit` hits. Documents matching no term are
    /// omitted. Scores grow with term frequency and query-term coverage.
    async fn search(&self, field: Field, terms: &[String], limit: usize) -> Result<Vec<TermHit>>;

    async fn get_by_id(&self, id: &str) -> Result<Option<IndexedDocument>>;

    async fn documents(&self) -> Result<Vec<IndexedDocument>>;

    async fn len(&self) -> Result<usize>;
}
