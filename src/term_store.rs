//! SQLite-backed [`TermIndex`] implementation.
//!
//! Each pattern is one row in `patterns` (display record as JSON) and one
//! row in the FTS5 table `patterns_fts`, which has a column per searchable
//! [`Field`] holding that field's tokens. Ranked queries use FTS5's bm25
//! `rank`, negated so larger is better.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use odp_search_core::document::field_tokens;
use odp_search_core::models::{Field, IndexedDocument, PatternRecord};
use odp_search_core::store::{TermHit, TermIndex};

/// SQLite implementation of the [`TermIndex`] trait.
pub struct SqliteTermIndex {
    pool: SqlitePool,
}

impl SqliteTermIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// FTS5 match expression: any of `terms` within the column of `field`.
fn match_expression(field: Field, terms: &[String]) -> Option<String> {
    let quoted: Vec<String> = terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect();
    if quoted.is_empty() {
        return None;
    }
    Some(format!("{} : ({})", field.as_str(), quoted.join(" OR ")))
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<IndexedDocument> {
    let record_json: String = row.get("record_json");
    let classes_json: String = row.get("class_labels_json");
    let properties_json: String = row.get("property_labels_json");
    let all_terms: String = row.get("all_terms");

    let record: PatternRecord =
        serde_json::from_str(&record_json).context("Corrupt pattern record in index")?;
    Ok(IndexedDocument {
        record,
        class_labels: serde_json::from_str(&classes_json)?,
        property_labels: serde_json::from_str(&properties_json)?,
        all_terms: all_terms.split_whitespace().map(String::from).collect(),
    })
}

#[async_trait]
impl TermIndex for SqliteTermIndex {
    async fn put(&self, doc: &IndexedDocument) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO patterns (id, name, record_json, class_labels_json,
                                  property_labels_json, all_terms)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                record_json = excluded.record_json,
                class_labels_json = excluded.class_labels_json,
                property_labels_json = excluded.property_labels_json,
                all_terms = excluded.all_terms
            "#,
        )
        .bind(doc.id())
        .bind(&doc.record.name)
        .bind(serde_json::to_string(&doc.record)?)
        .bind(serde_json::to_string(&doc.class_labels)?)
        .bind(serde_json::to_string(&doc.property_labels)?)
        .bind(doc.all_terms.join(" "))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM patterns_fts WHERE pattern_id = ?")
            .bind(doc.id())
            .execute(&mut *tx)
            .await?;

        let columns: Vec<&str> = Field::ALL.iter().map(|f| f.as_str()).collect();
        let placeholders = vec!["?"; columns.len() + 1].join(", ");
        let sql = format!(
            "INSERT INTO patterns_fts (pattern_id, {}) VALUES ({})",
            columns.join(", "),
            placeholders
        );
        let mut insert = sqlx::query(&sql).bind(doc.id());
        for field in Field::ALL {
            insert = insert.bind(field_tokens(doc, field).join(" "));
        }
        insert.execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn search(&self, field: Field, terms: &[String], limit: usize) -> Result<Vec<TermHit>> {
        let expr = match match_expression(field, terms) {
            Some(e) if limit > 0 => e,
            _ => return Ok(Vec::new()),
        };

        let rows = sqlx::query(
            r#"
            SELECT pattern_id, rank
            FROM patterns_fts
            WHERE patterns_fts MATCH ?
            ORDER BY rank, pattern_id
            LIMIT ?
            "#,
        )
        .bind(&expr)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let hits = rows
            .iter()
            .map(|row| {
                let rank: f64 = row.get("rank");
                TermHit::new(row.get::<String, _>("pattern_id"), -rank)
            })
            .collect();
        Ok(hits)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<IndexedDocument>> {
        let row = sqlx::query(
            "SELECT record_json, class_labels_json, property_labels_json, all_terms FROM patterns WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_document).transpose()
    }

    async fn documents(&self) -> Result<Vec<IndexedDocument>> {
        let rows = sqlx::query(
            "SELECT record_json, class_labels_json, property_labels_json, all_terms FROM patterns ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_document).collect()
    }

    async fn len(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM patterns")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, migrate};

    async fn index(dir: &tempfile::TempDir) -> SqliteTermIndex {
        let pool = db::connect(&dir.path().join("g.sqlite"), true).await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        SqliteTermIndex::new(pool)
    }

    fn doc(id: &str, name: &str, terms: &[&str]) -> IndexedDocument {
        let mut record = PatternRecord::new(id, name);
        record.categories = vec!["General".into()];
        IndexedDocument {
            record,
            class_labels: vec!["Event".into()],
            property_labels: vec![],
            all_terms: terms.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn q(terms: &[&str]) -> Vec<String> {
        terms.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_match_expression_quotes_terms() {
        assert_eq!(
            match_expression(Field::AllTerms, &q(&["event", "time"])).unwrap(),
            "allterms : (\"event\" OR \"time\")"
        );
        assert!(match_expression(Field::Name, &q(&[" "])).is_none());
    }

    #[tokio::test]
    async fn test_put_and_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let idx = index(&dir).await;
        let d = doc("http://example.org/p1.owl", "Participation", &["participation", "event"]);
        idx.put(&d).await.unwrap();
        assert_eq!(idx.get_by_id(d.id()).await.unwrap(), Some(d));
        assert!(idx.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_fts_row() {
        let dir = tempfile::tempdir().unwrap();
        let idx = index(&dir).await;
        idx.put(&doc("p1", "Old", &["event"])).await.unwrap();
        idx.put(&doc("p1", "New", &["time"])).await.unwrap();
        assert_eq!(idx.len().await.unwrap(), 1);
        assert!(idx
            .search(Field::AllTerms, &q(&["event"]), 10)
            .await
            .unwrap()
            .is_empty());
        let hits = idx.search(Field::AllTerms, &q(&["time"]), 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].raw_score > 0.0);
    }

    #[tokio::test]
    async fn test_search_prefers_coverage() {
        let dir = tempfile::tempdir().unwrap();
        let idx = index(&dir).await;
        idx.put(&doc("p1", "A", &["event", "filler", "filler"])).await.unwrap();
        idx.put(&doc("p2", "B", &["event", "participant", "filler"])).await.unwrap();
        idx.put(&doc("p3", "C", &["agent", "role", "filler"])).await.unwrap();
        let hits = idx
            .search(Field::AllTerms, &q(&["event", "participant"]), 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].pattern_id, "p2");
    }

    #[tokio::test]
    async fn test_documents_ordered_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let idx = index(&dir).await;
        idx.put(&doc("b", "B", &["x"])).await.unwrap();
        idx.put(&doc("a", "A", &["y"])).await.unwrap();
        let ids: Vec<String> = idx
            .documents()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.record.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
