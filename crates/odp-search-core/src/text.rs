//! Tokenization for indexing and query normalization.
//!
//! Index-side tokenization removes junk characters and stop words. Query
//! normalization deliberately keeps stop words: removing them from short
//! competency-question style queries lowers recall.

use std::collections::HashSet;
use std::sync::OnceLock;

/// English stop words dropped from indexed text.
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "him", "his",
    "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just", "me", "more", "most",
    "my", "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other", "our",
    "ours", "out", "over", "own", "same", "she", "should", "so", "some", "such", "than", "that",
    "the", "their", "theirs", "them", "then", "there", "these", "they", "this", "those",
    "through", "to", "too", "under", "until", "up", "very", "was", "we", "were", "what", "when",
    "where", "which", "while", "who", "whom", "why", "will", "with", "would", "you", "your",
    "yours",
];

fn stop_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

pub fn is_stop_word(word: &str) -> bool {
    stop_words().contains(word)
}

/// Lower-case a word and strip every non-alphanumeric character.
fn clean_word(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Words separated by whitespace, `_` or `-`. Shared by both sides so a
/// query splits exactly like the indexed text it should match.
fn split_words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c.is_whitespace() || c == '_' || c == '-')
}

/// Tokenize indexed text: whitespace split, junk removal, lower-casing,
/// stop-word removal. Token order and duplicates are preserved.
///
/// Underscores and hyphens separate words, so multi-word lemmas such as
/// `social_event` yield `social` and `event`.
///
/// ```rust
/// use odp_search_core::text::tokenize;
///
/// assert_eq!(tokenize("The participants of an Event!"), vec!["participants", "event"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    split_words(text)
        .map(clean_word)
        .filter(|w| !w.is_empty() && !is_stop_word(w))
        .collect()
}

/// Normalize a query string: lower-case, strip `?` and `/`.
pub fn normalize_query(query: &str) -> String {
    query.to_lowercase().replace(['?', '/'], "")
}

/// Split a normalized query into terms. Stop words are kept.
///
/// ```rust
/// use odp_search_core::text::query_terms;
///
/// assert_eq!(
///     query_terms("What are the participants in that event?"),
///     vec!["what", "are", "the", "participants", "in", "that", "event"],
/// );
/// ```
pub fn query_terms(query: &str) -> Vec<String> {
    let normalized = normalize_query(query);
    split_words(&normalized)
        .map(clean_word)
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_drops_junk_and_stop_words() {
        assert_eq!(
            tokenize("Who is the (main) agent, in this role?"),
            vec!["main", "agent", "role"]
        );
    }

    #[test]
    fn test_tokenize_keeps_duplicates_in_order() {
        assert_eq!(tokenize("event time event"), vec!["event", "time", "event"]);
    }

    #[test]
    fn test_tokenize_splits_lemmas() {
        assert_eq!(tokenize("social_event time-interval"), vec!["social", "event", "time", "interval"]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("   ").is_empty());
        assert!(tokenize("the of and").is_empty());
    }

    #[test]
    fn test_normalize_query_strips_marks() {
        assert_eq!(normalize_query("Where/When IS it?"), "wherewhen is it");
    }

    #[test]
    fn test_query_terms_split_like_index_tokens() {
        let text = "spatio-temporal object_role";
        assert_eq!(query_terms(text), vec!["spatio", "temporal", "object", "role"]);
        assert_eq!(query_terms(text), tokenize(text));
        assert_eq!(query_terms("part-of the_whole"), vec!["part", "of", "the", "whole"]);
    }

    #[test]
    fn test_query_terms_keep_stop_words() {
        assert_eq!(query_terms("Who is it?"), vec!["who", "is", "it"]);
        assert!(query_terms("?? / ?").is_empty());
    }
}
