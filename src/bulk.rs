//! Bulk metadata import.
//!
//! The bulk file is a JSON array of partial pattern records, each with at
//! least an `id`. It is the authoritative-when-present source for merging.
//! The categories file is a JSON array of category names.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;

use odp_search_core::models::PatternRecord;

/// Bulk records keyed by id.
#[derive(Debug, Clone, Default)]
pub struct BulkMetadata {
    records: HashMap<String, PatternRecord>,
}

impl BulkMetadata {
    pub fn new(records: impl IntoIterator<Item = PatternRecord>) -> Self {
        let mut map = HashMap::new();
        for record in records {
            let id = record.id.trim().to_string();
            if id.is_empty() {
                continue;
            }
            // a later entry for the same id replaces an earlier one
            map.insert(id, record);
        }
        Self { records: map }
    }

    /// Record for `id`, also trying `id + ".owl"` since bulk sources may
    /// reference the document IRI rather than the ontology IRI.
    pub fn lookup(&self, id: &str) -> Option<&PatternRecord> {
        self.records
            .get(id)
            .or_else(|| self.records.get(&format!("{id}.owl")))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn load_bulk(path: &Path) -> Result<BulkMetadata> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read bulk metadata: {}", path.display()))?;
    let records: Vec<PatternRecord> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse bulk metadata: {}", path.display()))?;
    Ok(BulkMetadata::new(records))
}

/// Known category names, trimmed and deduplicated, in file order.
pub fn load_categories(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read categories: {}", path.display()))?;
    let raw: Vec<String> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse categories: {}", path.display()))?;

    let mut out: Vec<String> = Vec::new();
    for c in raw {
        let c = c.trim();
        if c.is_empty() {
            continue;
        }
        if !out.iter().any(|o| o.eq_ignore_ascii_case(c)) {
            out.push(c.to_string());
        }
    }
    if out.is_empty() {
        bail!("No categories in {}", path.display());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_tolerates_owl_suffix() {
        let bulk = BulkMetadata::new(vec![
            PatternRecord::new("http://example.org/participation.owl", "Participation"),
            PatternRecord::new("  ", "ignored"),
        ]);
        assert_eq!(bulk.len(), 1);
        assert!(bulk.lookup("http://example.org/participation").is_some());
        assert!(bulk.lookup("http://example.org/participation.owl").is_some());
        assert!(bulk.lookup("http://example.org/other").is_none());
    }

    #[test]
    fn test_load_bulk_partial_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bulk.json");
        std::fs::write(
            &path,
            r#"[{"id": "http://example.org/p1", "categories": ["General", "Events", "Time"]}]"#,
        )
        .unwrap();
        let bulk = load_bulk(&path).unwrap();
        let r = bulk.lookup("http://example.org/p1").unwrap();
        assert_eq!(r.name, "");
        assert_eq!(r.categories.len(), 3);
    }

    #[test]
    fn test_load_bulk_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bulk.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_bulk(&path).is_err());
    }

    #[test]
    fn test_load_categories_dedups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.json");
        std::fs::write(&path, r#"["General", " general ", "Semiotics", ""]"#).unwrap();
        assert_eq!(load_categories(&path).unwrap(), vec!["General", "Semiotics"]);
    }
}
