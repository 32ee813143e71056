//! Reconciliation of bulk-imported and extracted pattern metadata.
//!
//! When both sources describe the same `id`, the bulk record wins for
//! every non-empty single-valued field, and for list-valued fields the
//! longer list wins (ties go to the bulk record). A pattern with no bulk
//! record is taken from the extractor unchanged.

use crate::models::PatternRecord;

/// Name used when neither source nor the id yields one.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Merge a bulk-imported record with an extracted record for the same id.
///
/// Pure and deterministic. The returned record always has the extracted
/// record's `id` and a non-empty `name`.
pub fn merge(bulk: &PatternRecord, extracted: &PatternRecord) -> PatternRecord {
    let name = if !bulk.name.trim().is_empty() {
        bulk.name.clone()
    } else if !extracted.name.trim().is_empty() {
        extracted.name.clone()
    } else {
        name_from_id(&extracted.id)
    };

    PatternRecord {
        id: extracted.id.clone(),
        name,
        image_ref: first_present(&bulk.image_ref, &extracted.image_ref),
        intent: first_present(&bulk.intent, &extracted.intent),
        description: first_present(&bulk.description, &extracted.description),
        consequences: first_present(&bulk.consequences, &extracted.consequences),
        categories: longer(&bulk.categories, &extracted.categories),
        scenarios: longer(&bulk.scenarios, &extracted.scenarios),
        competency_questions: longer(&bulk.competency_questions, &extracted.competency_questions),
        size: first_present(&bulk.size, &extracted.size),
        profile: first_present(&bulk.profile, &extracted.profile),
        strategy: first_present(&bulk.strategy, &extracted.strategy),
        mappings: longer(&bulk.mappings, &extracted.mappings),
    }
}

/// Apply the merge policy when a bulk record may or may not exist.
pub fn reconcile(bulk: Option<&PatternRecord>, extracted: PatternRecord) -> PatternRecord {
    match bulk {
        Some(b) => merge(b, &extracted),
        None => with_name(extracted),
    }
}

/// Fill in an empty name from the record's id.
pub fn with_name(mut record: PatternRecord) -> PatternRecord {
    if record.name.trim().is_empty() {
        record.name = name_from_id(&record.id);
    }
    record
}

/// Derive a display name from the last path segment of an IRI.
///
/// ```rust
/// use odp_search_core::merge::name_from_id;
///
/// assert_eq!(name_from_id("http://example.org/cp/owl/participation.owl"), "participation.owl");
/// assert_eq!(name_from_id("http://example.org/cp/Participation/"), "Participation");
/// ```
pub fn name_from_id(id: &str) -> String {
    let trimmed = id.trim_end_matches(['/', '#']);
    let segment = trimmed
        .rsplit(['/', '#'])
        .next()
        .unwrap_or_default()
        .trim();
    if segment.is_empty() {
        UNKNOWN_NAME.to_string()
    } else {
        segment.to_string()
    }
}

fn first_present(bulk: &Option<String>, extracted: &Option<String>) -> Option<String> {
    non_empty(bulk).or_else(|| non_empty(extracted))
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .filter(|v| !v.trim().is_empty())
        .cloned()
}

fn longer(bulk: &[String], extracted: &[String]) -> Vec<String> {
    if extracted.len() > bulk.len() {
        extracted.to_vec()
    } else {
        bulk.to_vec()
    }
}
