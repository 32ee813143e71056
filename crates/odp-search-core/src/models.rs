//! Core data models used throughout ODP Search.
//!
//! These types represent the pattern records, indexed documents, and
//! search results that flow through the indexing and query pipeline.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Canonical metadata for one ontology design pattern.
///
/// One record exists per `id` in an index generation. Bulk-imported
/// records are deserialized into this same type with most fields absent;
/// see [`crate::merge`] for how the two sources are reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRecord {
    /// Stable IRI of the pattern. Unique across all sources.
    pub id: String,
    /// Display name. Empty only on partial bulk records before merging.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image_ref: Option<String>,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub consequences: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub scenarios: Vec<String>,
    #[serde(default)]
    pub competency_questions: Vec<String>,
    /// Size tag (e.g. `"small"`), used only for filtering.
    #[serde(default)]
    pub size: Option<String>,
    /// Profile tag (e.g. `"OWL 2 DL"`), used only for filtering.
    #[serde(default)]
    pub profile: Option<String>,
    /// Modelling strategy tag, used only for filtering.
    #[serde(default)]
    pub strategy: Option<String>,
    /// External vocabularies this pattern is aligned with (`dolce`, `schema.org`, ...).
    #[serde(default)]
    pub mappings: Vec<String>,
}

impl PatternRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// True if the record aligns with the given external vocabulary.
    pub fn has_mapping(&self, vocabulary: &str) -> bool {
        self.mappings
            .iter()
            .any(|m| m.eq_ignore_ascii_case(vocabulary))
    }

    /// True if one of the record's categories equals `category`, ignoring case.
    pub fn in_category(&self, category: &str) -> bool {
        self.categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category))
    }
}

/// Output of a pattern extractor for a single ontology document.
///
/// Carries the record fields plus the class and property labels of the
/// ontology, which feed lexical matching but are never displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPattern {
    pub record: PatternRecord,
    pub class_labels: Vec<String>,
    pub property_labels: Vec<String>,
}

/// A searchable field of an [`IndexedDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Intent,
    Description,
    Consequences,
    Categories,
    Scenarios,
    CompetencyQuestions,
    Classes,
    Properties,
    /// Tokenized, synonym-expanded catch-all used for lexical matching.
    AllTerms,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::Name,
        Field::Intent,
        Field::Description,
        Field::Consequences,
        Field::Categories,
        Field::Scenarios,
        Field::CompetencyQuestions,
        Field::Classes,
        Field::Properties,
        Field::AllTerms,
    ];

    /// Column name used by storage backends.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Intent => "intent",
            Field::Description => "description",
            Field::Consequences => "consequences",
            Field::Categories => "categories",
            Field::Scenarios => "scenarios",
            Field::CompetencyQuestions => "cqs",
            Field::Classes => "classes",
            Field::Properties => "properties",
            Field::AllTerms => "allterms",
        }
    }
}

/// The term index's stored representation of one pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// Display record. Its `id` is the document key.
    pub record: PatternRecord,
    pub class_labels: Vec<String>,
    pub property_labels: Vec<String>,
    /// Raw tokens followed by their related terms; duplicates are kept.
    pub all_terms: Vec<String>,
}

impl IndexedDocument {
    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// Raw text of a field, joined with spaces for list-valued fields.
    pub fn field_text(&self, field: Field) -> String {
        let r = &self.record;
        match field {
            Field::Name => r.name.clone(),
            Field::Intent => r.intent.clone().unwrap_or_default(),
            Field::Description => r.description.clone().unwrap_or_default(),
            Field::Consequences => r.consequences.clone().unwrap_or_default(),
            Field::Categories => r.categories.join(" "),
            Field::Scenarios => r.scenarios.join(" "),
            Field::CompetencyQuestions => r.competency_questions.join(" "),
            Field::Classes => self.class_labels.join(" "),
            Field::Properties => self.property_labels.join(" "),
            Field::AllTerms => self.all_terms.join(" "),
        }
    }
}

/// A `(pattern_id, confidence)` pair produced by a search.
///
/// Equality and ordering are defined over `(pattern_id, confidence)`.
/// Ranking order is a different concern; see [`crate::fusion::rank_order`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub pattern_id: String,
    pub confidence: f64,
}

impl SearchResult {
    pub fn new(pattern_id: impl Into<String>, confidence: f64) -> Self {
        Self {
            pattern_id: pattern_id.into(),
            confidence,
        }
    }
}

impl PartialEq for SearchResult {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchResult {}

impl PartialOrd for SearchResult {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchResult {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pattern_id
            .cmp(&other.pattern_id)
            .then(self.confidence.total_cmp(&other.confidence))
    }
}

/// A search result enriched with the pattern's display record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPattern {
    pub pattern: PatternRecord,
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_result_equality_includes_confidence() {
        assert_eq!(SearchResult::new("a", 0.5), SearchResult::new("a", 0.5));
        assert_ne!(SearchResult::new("a", 0.5), SearchResult::new("a", 0.6));
        assert_ne!(SearchResult::new("a", 0.5), SearchResult::new("b", 0.5));
    }

    #[test]
    fn test_search_result_orders_by_id_then_confidence() {
        let mut v = vec![
            SearchResult::new("b", 0.1),
            SearchResult::new("a", 0.9),
            SearchResult::new("a", 0.2),
        ];
        v.sort();
        assert_eq!(v[0], SearchResult::new("a", 0.2));
        assert_eq!(v[1], SearchResult::new("a", 0.9));
        assert_eq!(v[2], SearchResult::new("b", 0.1));
    }

    #[test]
    fn test_bulk_record_deserializes_with_defaults() {
        let rec: PatternRecord =
            serde_json::from_str(r#"{"id": "http://example.org/p.owl", "categories": ["General"]}"#)
                .unwrap();
        assert_eq!(rec.name, "");
        assert!(rec.intent.is_none());
        assert_eq!(rec.categories, vec!["General"]);
        assert!(rec.competency_questions.is_empty());
    }

    #[test]
    fn test_field_text_joins_lists() {
        let mut rec = PatternRecord::new("p", "P");
        rec.categories = vec!["General".into(), "Events".into()];
        let doc = IndexedDocument {
            record: rec,
            class_labels: vec!["event".into()],
            property_labels: vec![],
            all_terms: vec!["event".into(), "occurrence".into()],
        };
        assert_eq!(doc.field_text(Field::Categories), "General Events");
        assert_eq!(doc.field_text(Field::AllTerms), "event occurrence");
        assert_eq!(doc.field_text(Field::Intent), "");
    }
}
