//! Synonym and hypernym expansion.
//!
//! The [`LexicalExpander`] trait is the seam to an external lexical
//! dictionary. It never fails: an unknown word or an unavailable
//! dictionary both yield an empty set, so lexical matching degrades to
//! raw-token overlap instead of erroring.

use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};

use crate::text::tokenize;

/// Source of related terms (synonyms, hypernyms) for a word.
pub trait LexicalExpander: Send + Sync {
    /// Related terms for `word`. Empty when unknown. Never fails.
    fn related_terms(&self, word: &str) -> BTreeSet<String>;

    /// Whether a dictionary is actually backing this expander.
    fn is_available(&self) -> bool {
        true
    }
}

/// Expander used when no dictionary is configured or it failed to load.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExpander;

impl LexicalExpander for NoopExpander {
    fn related_terms(&self, _word: &str) -> BTreeSet<String> {
        BTreeSet::new()
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// One dictionary entry: synonyms and hypernyms of a headword.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThesaurusEntry {
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub hypernyms: Vec<String>,
}

/// In-memory thesaurus keyed by lower-cased headword.
#[derive(Debug, Clone, Default)]
pub struct Thesaurus {
    entries: HashMap<String, BTreeSet<String>>,
}

impl Thesaurus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from headword entries. Headwords are lower-cased; a headword
    /// is never listed among its own related terms.
    pub fn from_entries(entries: HashMap<String, ThesaurusEntry>) -> Self {
        let mut t = Self::new();
        for (word, entry) in entries {
            t.insert(&word, entry.synonyms.iter().chain(entry.hypernyms.iter()));
        }
        t
    }

    pub fn insert<'a>(&mut self, word: &str, related: impl IntoIterator<Item = &'a String>) {
        let key = word.trim().to_lowercase();
        let set = self.entries.entry(key.clone()).or_default();
        for r in related {
            let r = r.trim().to_lowercase();
            if !r.is_empty() && r != key {
                set.insert(r);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LexicalExpander for Thesaurus {
    fn related_terms(&self, word: &str) -> BTreeSet<String> {
        self.entries
            .get(&word.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}

/// Expand query terms into the set used for lexical matching: every term
/// plus the tokens of all its related terms. A set, so skewed synonym
/// distributions do not weight a query.
pub fn expand_query_terms(expander: &dyn LexicalExpander, terms: &[String]) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for term in terms {
        out.insert(term.clone());
        for related in expander.related_terms(term) {
            out.extend(tokenize(&related));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thesaurus() -> Thesaurus {
        let mut entries = HashMap::new();
        entries.insert(
            "Event".to_string(),
            ThesaurusEntry {
                synonyms: vec!["occurrence".into(), "event".into()],
                hypernyms: vec!["Happening".into()],
            },
        );
        Thesaurus::from_entries(entries)
    }

    #[test]
    fn test_thesaurus_lookup_is_case_insensitive() {
        let t = thesaurus();
        let related = t.related_terms("EVENT");
        assert!(related.contains("occurrence"));
        assert!(related.contains("happening"));
        assert!(!related.contains("event"));
    }

    #[test]
    fn test_unknown_word_is_empty() {
        assert!(thesaurus().related_terms("zebra").is_empty());
        assert!(NoopExpander.related_terms("event").is_empty());
        assert!(!NoopExpander.is_available());
    }

    #[test]
    fn test_expand_query_terms_includes_originals() {
        let t = thesaurus();
        let expanded = expand_query_terms(&t, &["event".into(), "time".into()]);
        let v: Vec<&str> = expanded.iter().map(String::as_str).collect();
        assert_eq!(v, vec!["event", "happening", "occurrence", "time"]);
    }

    #[test]
    fn test_multiword_related_terms_are_tokenized() {
        let mut t = Thesaurus::new();
        t.insert("party", &["social_event".to_string()]);
        let expanded = expand_query_terms(&t, &["party".into()]);
        assert!(expanded.contains("social"));
        assert!(expanded.contains("event"));
        assert!(!expanded.contains("social_event"));
    }
}
