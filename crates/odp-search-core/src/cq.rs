//! Competency-question matching by edit distance.
//!
//! The query is compared as a whole string against every stored competency
//! question, so near-verbatim phrasings score high even when token overlap
//! would miss them.

use crate::models::IndexedDocument;
use crate::store::TermHit;

/// Levenshtein distance over Unicode scalar values.
///
/// ```rust
/// use odp_search_core::cq::levenshtein;
///
/// assert_eq!(levenshtein("kitten", "sitting"), 3);
/// assert_eq!(levenshtein("event", "event"), 0);
/// ```
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Edit distance divided by the longer string's length, in `[0, 1]`.
/// Two empty strings are at distance 0.
pub fn normalized_distance(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 0.0;
    }
    levenshtein(a, b) as f64 / longest as f64
}

/// Similarity of `query` to the closest of `questions`: `1 - distance` of
/// the best question, or 0 when there are none. Case-insensitive.
pub fn best_similarity(query: &str, questions: &[String]) -> f64 {
    let query = query.trim().to_lowercase();
    questions
        .iter()
        .map(|q| normalized_distance(&query, &q.trim().to_lowercase()))
        .min_by(|a, b| a.total_cmp(b))
        .map(|d| 1.0 - d)
        .unwrap_or(0.0)
}

/// Score every document by its best-matching competency question.
///
/// Every document gets an entry, including a zero score for documents
/// without questions, ordered by score descending then id.
pub fn match_competency_questions(query: &str, docs: &[IndexedDocument]) -> Vec<TermHit> {
    let mut hits: Vec<TermHit> = docs
        .iter()
        .map(|d| TermHit::new(d.id(), best_similarity(query, &d.record.competency_questions)))
        .collect();
    hits.sort_by(|a, b| {
        b.raw_score
            .total_cmp(&a.raw_score)
            .then_with(|| a.pattern_id.cmp(&b.pattern_id))
    });
    hits
}
