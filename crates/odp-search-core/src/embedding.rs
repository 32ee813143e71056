//! Embedding index trait, vector utilities, and a random-indexing model.
//!
//! [`EmbeddingIndex`] is the seam to nearest-neighbour search over pattern
//! document vectors. [`TermVectorModel`] is the built-in implementation:
//! random indexing over each document's `allTerms` bag, with reflective
//! training cycles, queried by summing the query terms' vectors.

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::store::TermHit;

/// Nearest-neighbour search over pattern document vectors.
#[async_trait]
pub trait EmbeddingIndex: Send + Sync {
    /// Up to `k` patterns closest to the combined vector of `query_terms`,
    /// most similar first.
    async fn nearest_neighbors(&self, query_terms: &[String], k: usize) -> Result<Vec<TermHit>>;
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// ```rust
/// use odp_search_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`; `0.0` for empty, zero, or
/// mismatched-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm >= f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

fn add_scaled(acc: &mut [f32], v: &[f32], scale: f32) {
    for (a, x) in acc.iter_mut().zip(v) {
        *a += x * scale;
    }
}

/// Training parameters for [`TermVectorModel::train`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorParams {
    /// Vector dimensionality.
    pub dims: usize,
    /// Non-zero entries per elemental vector; half `+1`, half `-1`.
    pub seed_length: usize,
    /// Number of doc → term training passes (at least one is run).
    pub training_cycles: usize,
}

impl Default for VectorParams {
    fn default() -> Self {
        Self {
            dims: 200,
            seed_length: 10,
            training_cycles: 2,
        }
    }
}

/// Deterministic sparse ternary vector for a term.
///
/// Positions come from SHA-256 digests of `term` and a counter, so the
/// same term always maps to the same vector for given `dims`.
pub fn elemental_vector(term: &str, dims: usize, seed_length: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dims];
    if dims == 0 {
        return v;
    }
    let wanted = seed_length.min(dims);
    let mut used = HashSet::with_capacity(wanted);
    let mut counter: u32 = 0;
    while used.len() < wanted {
        let digest = Sha256::new()
            .chain_update(term.as_bytes())
            .chain_update(counter.to_le_bytes())
            .finalize();
        for chunk in digest.chunks_exact(4) {
            if used.len() == wanted {
                break;
            }
            let pos = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as usize % dims;
            if used.insert(pos) {
                v[pos] = if used.len() <= wanted / 2 { 1.0 } else { -1.0 };
            }
        }
        counter += 1;
    }
    v
}

/// Trained term and document vectors for one index generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermVectorModel {
    dims: usize,
    term_vectors: HashMap<String, Vec<f32>>,
    /// Ordered by pattern id.
    doc_vectors: Vec<(String, Vec<f32>)>,
}

impl TermVectorModel {
    /// Reassemble a model from persisted vectors.
    pub fn from_parts(
        dims: usize,
        term_vectors: HashMap<String, Vec<f32>>,
        mut doc_vectors: Vec<(String, Vec<f32>)>,
    ) -> Self {
        doc_vectors.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            dims,
            term_vectors,
            doc_vectors,
        }
    }

    /// Train a model over `(pattern_id, all_terms)` documents.
    pub fn train(docs: &[(String, Vec<String>)], params: VectorParams) -> Self {
        let dims = params.dims;

        // term frequencies per document, deterministic order
        let mut ordered: Vec<(&str, BTreeMap<&str, f32>)> = docs
            .iter()
            .map(|(id, terms)| {
                let mut tf: BTreeMap<&str, f32> = BTreeMap::new();
                for t in terms {
                    *tf.entry(t.as_str()).or_default() += 1.0;
                }
                (id.as_str(), tf)
            })
            .collect();
        ordered.sort_by(|a, b| a.0.cmp(b.0));
        ordered.dedup_by(|a, b| a.0 == b.0);

        let mut term_vectors: HashMap<String, Vec<f32>> = HashMap::new();
        for (_, tf) in &ordered {
            for term in tf.keys() {
                if !term_vectors.contains_key(*term) {
                    term_vectors.insert(
                        term.to_string(),
                        elemental_vector(term, dims, params.seed_length),
                    );
                }
            }
        }

        let mut doc_vectors: Vec<(String, Vec<f32>)> = Vec::with_capacity(ordered.len());
        for _ in 0..params.training_cycles.max(1) {
            doc_vectors = ordered
                .iter()
                .map(|(id, tf)| {
                    let mut v = vec![0.0f32; dims];
                    for (term, count) in tf {
                        if let Some(tv) = term_vectors.get(*term) {
                            add_scaled(&mut v, tv, *count);
                        }
                    }
                    normalize(&mut v);
                    (id.to_string(), v)
                })
                .collect();

            let mut next: HashMap<String, Vec<f32>> = HashMap::with_capacity(term_vectors.len());
            for ((_, tf), (_, dv)) in ordered.iter().zip(&doc_vectors) {
                for (term, count) in tf {
                    let acc = next
                        .entry(term.to_string())
                        .or_insert_with(|| vec![0.0f32; dims]);
                    add_scaled(acc, dv, *count);
                }
            }
            for v in next.values_mut() {
                normalize(v);
            }
            term_vectors = next;
        }

        Self {
            dims,
            term_vectors,
            doc_vectors,
        }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn term_vectors(&self) -> &HashMap<String, Vec<f32>> {
        &self.term_vectors
    }

    pub fn doc_vectors(&self) -> &[(String, Vec<f32>)] {
        &self.doc_vectors
    }

    pub fn is_empty(&self) -> bool {
        self.doc_vectors.is_empty()
    }

    /// Sum of the known query terms' vectors, or `None` if no term is known.
    pub fn query_vector(&self, query_terms: &[String]) -> Option<Vec<f32>> {
        let mut v = vec![0.0f32; self.dims];
        let mut known = false;
        for term in query_terms {
            if let Some(tv) = self.term_vectors.get(term) {
                add_scaled(&mut v, tv, 1.0);
                known = true;
            }
        }
        known.then(|| {
            normalize(&mut v);
            v
        })
    }

    /// Documents by cosine similarity to the query vector. Only positive
    /// similarities are returned, most similar first, ties by id.
    pub fn search(&self, query_terms: &[String], k: usize) -> Vec<TermHit> {
        let qv = match self.query_vector(query_terms) {
            Some(v) => v,
            None => return Vec::new(),
        };
        let mut hits: Vec<TermHit> = self
            .doc_vectors
            .iter()
            .map(|(id, dv)| TermHit::new(id.clone(), cosine_similarity(&qv, dv) as f64))
            .filter(|h| h.raw_score > 0.0)
            .collect();
        hits.sort_by(|a, b| {
            b.raw_score
                .total_cmp(&a.raw_score)
                .then_with(|| a.pattern_id.cmp(&b.pattern_id))
        });
        hits.truncate(k);
        hits
    }
}

#[async_trait]
impl EmbeddingIndex for TermVectorModel {
    async fn nearest_neighbors(&self, query_terms: &[String], k: usize) -> Result<Vec<TermHit>> {
        Ok(self.search(query_terms, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn corpus() -> Vec<(String, Vec<String>)> {
        vec![
            ("p1".into(), terms("event participant time participation event")),
            ("p2".into(), terms("information realization object expression")),
            ("p3".into(), terms("agent role person organization")),
        ]
    }

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        assert_eq!(blob_to_vec(&vec_to_blob(&vec)), vec);
    }

    #[test]
    fn test_cosine_identical_and_orthogonal() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_elemental_vector_is_deterministic_and_sparse() {
        let a = elemental_vector("event", 100, 10);
        let b = elemental_vector("event", 100, 10);
        assert_eq!(a, b);
        assert_eq!(a.iter().filter(|x| **x != 0.0).count(), 10);
        assert_eq!(a.iter().filter(|x| **x > 0.0).count(), 5);
        assert_ne!(a, elemental_vector("time", 100, 10));
    }

    #[test]
    fn test_training_is_deterministic() {
        let params = VectorParams::default();
        assert_eq!(
            TermVectorModel::train(&corpus(), params),
            TermVectorModel::train(&corpus(), params)
        );
    }

    #[test]
    fn test_search_ranks_matching_document_first() {
        let model = TermVectorModel::train(&corpus(), VectorParams::default());
        let hits = model.search(&terms("participant event"), 10);
        assert_eq!(hits[0].pattern_id, "p1");
        assert!(hits.len() <= 3);
    }

    #[test]
    fn test_unknown_terms_give_no_hits() {
        let model = TermVectorModel::train(&corpus(), VectorParams::default());
        assert!(model.search(&terms("zebra giraffe"), 10).is_empty());
    }

    #[test]
    fn test_empty_corpus() {
        let model = TermVectorModel::train(&[], VectorParams::default());
        assert!(model.is_empty());
        assert!(model.search(&terms("event"), 5).is_empty());
    }

    #[test]
    fn test_from_parts_orders_documents() {
        let model = TermVectorModel::from_parts(
            2,
            HashMap::new(),
            vec![("b".into(), vec![1.0, 0.0]), ("a".into(), vec![0.0, 1.0])],
        );
        assert_eq!(model.doc_vectors()[0].0, "a");
    }
}
