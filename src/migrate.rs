use anyhow::Result;
use sqlx::SqlitePool;

use odp_search_core::models::Field;

/// Create the tables of one index generation. Safe to run on an existing
/// generation file.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Create patterns table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS patterns (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            record_json TEXT NOT NULL,
            class_labels_json TEXT NOT NULL DEFAULT '[]',
            property_labels_json TEXT NOT NULL DEFAULT '[]',
            all_terms TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    // FTS5 CREATE is not idempotent natively, so we check first
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='patterns_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !fts_exists {
        let columns: Vec<&str> = Field::ALL.iter().map(|f| f.as_str()).collect();
        let sql = format!(
            "CREATE VIRTUAL TABLE patterns_fts USING fts5(pattern_id UNINDEXED, {})",
            columns.join(", ")
        );
        sqlx::query(&sql).execute(pool).await?;
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS term_vectors (
            term TEXT PRIMARY KEY,
            embedding BLOB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS doc_vectors (
            pattern_id TEXT PRIMARY KEY,
            embedding BLOB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS index_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::connect(&dir.path().join("g.sqlite"), true).await.unwrap();
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .fetch_all(&pool)
                .await
                .unwrap();
        for t in ["doc_vectors", "index_meta", "patterns", "patterns_fts", "term_vectors"] {
            assert!(tables.iter().any(|n| n == t), "missing table {t}");
        }
        pool.close().await;
    }
}
