//! Construction of [`IndexedDocument`]s from merged pattern records.

use std::collections::{BTreeSet, HashMap};

use crate::lexical::LexicalExpander;
use crate::models::{Field, IndexedDocument, PatternRecord};
use crate::text::tokenize;

/// Flat token list over every textual field of a pattern, in field order:
/// name, intent, description, consequences, categories, scenarios,
/// competency questions, class labels, property labels.
pub fn raw_tokens(record: &PatternRecord, class_labels: &[String], property_labels: &[String]) -> Vec<String> {
    let singles = [
        Some(&record.name),
        record.intent.as_ref(),
        record.description.as_ref(),
        record.consequences.as_ref(),
    ];
    let lists = [
        &record.categories,
        &record.scenarios,
        &record.competency_questions,
    ];

    let mut tokens = Vec::new();
    for text in singles.into_iter().flatten() {
        tokens.extend(tokenize(text));
    }
    for list in lists {
        for text in list {
            tokens.extend(tokenize(text));
        }
    }
    for text in class_labels.iter().chain(property_labels) {
        tokens.extend(tokenize(text));
    }
    tokens
}

/// Build the `allTerms` bag: raw tokens followed by the synonym bag.
///
/// Every occurrence of a token contributes its related terms, so term
/// frequency survives expansion. A related term identical to the token
/// that produced it is not added twice.
pub fn all_terms(tokens: &[String], expander: &dyn LexicalExpander) -> Vec<String> {
    let mut cache: HashMap<&str, Vec<String>> = HashMap::new();
    let mut synonyms = Vec::new();

    for token in tokens {
        let related = cache.entry(token.as_str()).or_insert_with(|| {
            let mut words = BTreeSet::new();
            for term in expander.related_terms(token) {
                words.extend(tokenize(&term));
            }
            words.remove(token.as_str());
            words.into_iter().collect()
        });
        synonyms.extend(related.iter().cloned());
    }

    let mut out = Vec::with_capacity(tokens.len() + synonyms.len());
    out.extend(tokens.iter().cloned());
    out.extend(synonyms);
    out
}

/// Turn a merged record plus extractor labels into an indexable document.
pub fn build_document(
    record: PatternRecord,
    class_labels: Vec<String>,
    property_labels: Vec<String>,
    expander: &dyn LexicalExpander,
) -> IndexedDocument {
    let tokens = raw_tokens(&record, &class_labels, &property_labels);
    let all_terms = all_terms(&tokens, expander);
    IndexedDocument {
        record,
        class_labels,
        property_labels,
        all_terms,
    }
}

/// Tokens indexed for a field, shared by every [`TermIndex`] backend.
/// `allTerms` is already tokenized.
///
/// [`TermIndex`]: crate::store::TermIndex
pub fn field_tokens(doc: &IndexedDocument, field: Field) -> Vec<String> {
    match field {
        Field::AllTerms => doc.all_terms.clone(),
        other => tokenize(&doc.field_text(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::{NoopExpander, Thesaurus};

    fn record() -> PatternRecord {
        PatternRecord {
            id: "http://example.org/participation.owl".into(),
            name: "Participation".into(),
            intent: Some("Represent participation in an event".into()),
            categories: vec!["General".into()],
            competency_questions: vec!["Which objects take part in an event?".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_raw_tokens_cover_all_fields() {
        let tokens = raw_tokens(&record(), &["Event".into()], &["has participant".into()]);
        assert_eq!(
            tokens,
            vec![
                "participation", "represent", "participation", "event", "general", "objects",
                "take", "part", "event", "event", "participant"
            ]
        );
    }

    #[test]
    fn test_all_terms_without_dictionary_is_raw_tokens() {
        let tokens = vec!["event".to_string(), "time".to_string()];
        assert_eq!(all_terms(&tokens, &NoopExpander), tokens);
    }

    #[test]
    fn test_all_terms_preserves_frequency() {
        let mut t = Thesaurus::new();
        t.insert("event", &["occurrence".to_string(), "event".to_string()]);
        let tokens = vec!["event".to_string(), "time".to_string(), "event".to_string()];
        assert_eq!(
            all_terms(&tokens, &t),
            vec!["event", "time", "event", "occurrence", "occurrence"]
        );
    }

    #[test]
    fn test_build_document_keeps_record_for_display() {
        let doc = build_document(record(), vec![], vec![], &NoopExpander);
        assert_eq!(doc.record, record());
        assert!(doc.all_terms.contains(&"participation".to_string()));
        assert!(!doc.all_terms.contains(&"an".to_string()));
    }

    #[test]
    fn test_field_tokens_match_query_terms() {
        let mut r = record();
        r.intent = Some("Links a spatio-temporal object_role to its event".into());
        let doc = build_document(r, vec![], vec![], &NoopExpander);

        let intent = field_tokens(&doc, Field::Intent);
        for term in crate::text::query_terms("spatio-temporal object_role") {
            assert!(intent.contains(&term), "missing {term}");
        }
        assert_eq!(field_tokens(&doc, Field::AllTerms), doc.all_terms);
    }
}
