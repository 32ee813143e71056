//! Conjunctive result filters.

use serde::{Deserialize, Serialize};

use crate::models::PatternRecord;

/// Category value that matches every pattern.
pub const ANY_CATEGORY: &str = "Any";

/// Mapping vocabulary names checked by the `*_mapping_required` flags.
pub const DOLCE: &str = "dolce";
pub const SCHEMA_ORG: &str = "schema.org";
pub const DBPEDIA: &str = "dbpedia";

/// Optional predicates applied to ranked results.
///
/// Every present predicate must hold; absent ones impose nothing. A mapping
/// flag only constrains when it is `Some(true)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub category: Option<String>,
    pub size: Option<String>,
    pub profile: Option<String>,
    pub strategy: Option<String>,
    #[serde(alias = "dolce")]
    pub dolce_mapping_required: Option<bool>,
    #[serde(alias = "schema_org")]
    pub schema_org_mapping_required: Option<bool>,
    #[serde(alias = "dbpedia")]
    pub dbpedia_mapping_required: Option<bool>,
}

fn tag_matches(wanted: Option<&str>, actual: Option<&str>) -> bool {
    match wanted.map(str::trim).filter(|w| !w.is_empty()) {
        None => true,
        Some(w) => actual.is_some_and(|a| a.trim().eq_ignore_ascii_case(w)),
    }
}

impl FilterConfig {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Category constraint, ignoring blank values and the `Any` sentinel.
    pub fn effective_category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case(ANY_CATEGORY))
    }

    pub fn matches(&self, record: &PatternRecord) -> bool {
        if let Some(category) = self.effective_category() {
            if !record.in_category(category) {
                return false;
            }
        }
        if !tag_matches(self.size.as_deref(), record.size.as_deref())
            || !tag_matches(self.profile.as_deref(), record.profile.as_deref())
            || !tag_matches(self.strategy.as_deref(), record.strategy.as_deref())
        {
            return false;
        }

        let required = [
            (self.dolce_mapping_required, DOLCE),
            (self.schema_org_mapping_required, SCHEMA_ORG),
            (self.dbpedia_mapping_required, DBPEDIA),
        ];
        required
            .iter()
            .all(|(flag, vocab)| *flag != Some(true) || record.has_mapping(vocab))
    }
}
