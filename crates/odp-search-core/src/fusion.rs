//! Score fusion across retrieval strategies.
//!
//! Each strategy scores patterns on its own scale, so lists are rescaled
//! independently before they are combined.
//!
//! # Fusion Algorithm
//!
//! 1. Divide every score of each strategy list by that list's maximum
//!    (lists with fewer than two entries are left as they are).
//! 2. Sum the rescaled scores per pattern; absent patterns contribute 0.
//! 3. Sort by summed score (desc), pattern id (asc).
//! 4. Rescale the merged list by the same max-division rule.
//! 5. Drop patterns whose fused score is not positive.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::SearchResult;
use crate::store::TermHit;

/// The retrieval strategies the engine fans out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Lexical,
    Embedding,
    CompetencyQuestion,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [
        Strategy::Lexical,
        Strategy::Embedding,
        Strategy::CompetencyQuestion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Lexical => "lexical",
            Strategy::Embedding => "embedding",
            Strategy::CompetencyQuestion => "cq",
        }
    }
}

/// One strategy's raw result list.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyResult {
    pub strategy: Strategy,
    pub hits: Vec<TermHit>,
}

impl StrategyResult {
    pub fn new(strategy: Strategy, hits: Vec<TermHit>) -> Self {
        Self { strategy, hits }
    }

    /// Result of a strategy that failed or whose index is not loaded.
    pub fn empty(strategy: Strategy) -> Self {
        Self::new(strategy, Vec::new())
    }
}

/// Divide every score by the list maximum.
///
/// Lists with fewer than two entries, or whose maximum is not positive,
/// are returned unchanged.
///
/// ```rust
/// use odp_search_core::fusion::normalize_by_max;
/// use odp_search_core::store::TermHit;
///
/// let hits = vec![TermHit::new("a", 4.0), TermHit::new("b", 1.0)];
/// let scaled = normalize_by_max(&hits);
/// assert_eq!(scaled[0].raw_score, 1.0);
/// assert_eq!(scaled[1].raw_score, 0.25);
/// ```
pub fn normalize_by_max(hits: &[TermHit]) -> Vec<TermHit> {
    if hits.len() < 2 {
        return hits.to_vec();
    }
    let max = hits
        .iter()
        .map(|h| h.raw_score)
        .fold(f64::NEG_INFINITY, f64::max);
    if max <= 0.0 || !max.is_finite() {
        return hits.to_vec();
    }
    hits.iter()
        .map(|h| TermHit::new(h.pattern_id.clone(), h.raw_score / max))
        .collect()
}

/// Order by score descending, then pattern id ascending.
pub fn rank_order(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.pattern_id.cmp(&b.pattern_id))
    });
}

/// Sum of per-strategy normalized scores, sorted but not yet rescaled.
pub fn combine(lists: &[StrategyResult]) -> Vec<SearchResult> {
    let mut sums: HashMap<&str, f64> = HashMap::new();
    let normalized: Vec<Vec<TermHit>> = lists.iter().map(|l| normalize_by_max(&l.hits)).collect();
    for list in &normalized {
        // a strategy may list a pattern twice; keep its best score
        let mut best: HashMap<&str, f64> = HashMap::new();
        for hit in list {
            let e = best.entry(hit.pattern_id.as_str()).or_insert(f64::NEG_INFINITY);
            *e = e.max(hit.raw_score);
        }
        for (id, score) in best {
            *sums.entry(id).or_insert(0.0) += score;
        }
    }

    let mut merged: Vec<SearchResult> = sums
        .into_iter()
        .map(|(id, score)| SearchResult::new(id, score))
        .collect();
    rank_order(&mut merged);
    merged
}

/// Fuse strategy lists into the final ranking with confidences in `[0, 1]`.
pub fn fuse(lists: &[StrategyResult]) -> Vec<SearchResult> {
    let merged = combine(lists);
    let as_hits: Vec<TermHit> = merged
        .iter()
        .map(|r| TermHit::new(r.pattern_id.clone(), r.confidence))
        .collect();

    let mut out: Vec<SearchResult> = normalize_by_max(&as_hits)
        .into_iter()
        .filter(|h| h.raw_score > 0.0)
        .map(|h| SearchResult::new(h.pattern_id, h.raw_score.min(1.0)))
        .collect();
    rank_order(&mut out);
    out
}
