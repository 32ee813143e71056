//! In-memory [`TermIndex`] implementation for testing and staging.
//!
//! Uses `BTreeMap`/`HashMap` postings behind `std::sync::RwLock` for
//! thread safety. Scoring is classic TF-IDF with a coordination factor:
//!
//! ```text
//! score(d) = coord(q, d) × Σ_t √tf(t, d) × idf(t)²
//! idf(t)   = 1 + ln(N / (df(t) + 1))
//! coord    = matched query terms / query terms
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::document::field_tokens;
use crate::models::{Field, IndexedDocument};

use super::{TermHit, TermIndex};

/// term → (document id → term frequency)
type Postings = HashMap<String, HashMap<String, u32>>;

#[derive(Default)]
struct Inner {
    docs: BTreeMap<String, IndexedDocument>,
    fields: HashMap<Field, Postings>,
}

/// In-memory term index.
#[derive(Default)]
pub struct InMemoryTermIndex {
    inner: RwLock<Inner>,
}

impl InMemoryTermIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| anyhow!("term index lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| anyhow!("term index lock poisoned"))
    }
}

fn idf(total_docs: usize, doc_freq: usize) -> f64 {
    1.0 + (total_docs as f64 / (doc_freq as f64 + 1.0)).ln()
}

impl Inner {
    fn remove_postings(&mut self, id: &str) {
        for postings in self.fields.values_mut() {
            postings.retain(|_, docs| {
                docs.remove(id);
                !docs.is_empty()
            });
        }
    }
}

#[async_trait]
impl TermIndex for InMemoryTermIndex {
    async fn put(&self, doc: &IndexedDocument) -> Result<()> {
        let mut inner = self.write()?;
        let id = doc.id().to_string();
        if inner.docs.contains_key(&id) {
            inner.remove_postings(&id);
        }
        for field in Field::ALL {
            let postings = inner.fields.entry(field).or_default();
            for token in field_tokens(doc, field) {
                *postings
                    .entry(token)
                    .or_default()
                    .entry(id.clone())
                    .or_default() += 1;
            }
        }
        inner.docs.insert(id, doc.clone());
        Ok(())
    }

    async fn search(&self, field: Field, terms: &[String], limit: usize) -> Result<Vec<TermHit>> {
        let query: BTreeSet<&str> = terms.iter().map(String::as_str).collect();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let inner = self.read()?;
        let postings = match inner.fields.get(&field) {
            Some(p) => p,
            None => return Ok(Vec::new()),
        };
        let total = inner.docs.len();

        // id → (weighted sum, matched terms)
        let mut acc: HashMap<&str, (f64, usize)> = HashMap::new();
        for term in &query {
            if let Some(docs) = postings.get(*term) {
                let w = idf(total, docs.len()).powi(2);
                for (id, tf) in docs {
                    let e = acc.entry(id.as_str()).or_insert((0.0, 0));
                    e.0 += (*tf as f64).sqrt() * w;
                    e.1 += 1;
                }
            }
        }

        let n = query.len() as f64;
        let mut hits: Vec<TermHit> = acc
            .into_iter()
            .map(|(id, (sum, matched))| TermHit::new(id, sum * matched as f64 / n))
            .collect();
        hits.sort_by(|a, b| {
            b.raw_score
                .total_cmp(&a.raw_score)
                .then_with(|| a.pattern_id.cmp(&b.pattern_id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<IndexedDocument>> {
        Ok(self.read()?.docs.get(id).cloned())
    }

    async fn documents(&self) -> Result<Vec<IndexedDocument>> {
        Ok(self.read()?.docs.values().cloned().collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.read()?.docs.len())
    }
}
