//! Persistence of the trained [`TermVectorModel`] inside a generation file.
//!
//! Vectors are stored as little-endian f32 BLOBs in `term_vectors` and
//! `doc_vectors`; the dimensionality lives in `index_meta`.

use anyhow::{bail, Result};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use odp_search_core::embedding::{blob_to_vec, vec_to_blob, TermVectorModel};

const DIMS_KEY: &str = "vector_dims";

pub async fn set_meta(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO index_meta (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_meta(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM index_meta WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value)
}

/// Replace any stored vectors with `model`.
pub async fn save_model(pool: &SqlitePool, model: &TermVectorModel) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM term_vectors").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM doc_vectors").execute(&mut *tx).await?;

    for (term, vec) in model.term_vectors() {
        sqlx::query("INSERT INTO term_vectors (term, embedding) VALUES (?, ?)")
            .bind(term)
            .bind(vec_to_blob(vec))
            .execute(&mut *tx)
            .await?;
    }
    for (id, vec) in model.doc_vectors() {
        sqlx::query("INSERT INTO doc_vectors (pattern_id, embedding) VALUES (?, ?)")
            .bind(id)
            .bind(vec_to_blob(vec))
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query(
        "INSERT INTO index_meta (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(DIMS_KEY)
    .bind(model.dims().to_string())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Load the stored model, or `None` if this generation has no vectors.
pub async fn load_model(pool: &SqlitePool) -> Result<Option<TermVectorModel>> {
    let dims = match get_meta(pool, DIMS_KEY).await? {
        Some(v) => v.parse::<usize>()?,
        None => return Ok(None),
    };

    let mut term_vectors = HashMap::new();
    for row in sqlx::query("SELECT term, embedding FROM term_vectors")
        .fetch_all(pool)
        .await?
    {
        let blob: Vec<u8> = row.get("embedding");
        let vec = blob_to_vec(&blob);
        if vec.len() != dims {
            bail!("term vector has {} dims, expected {}", vec.len(), dims);
        }
        term_vectors.insert(row.get::<String, _>("term"), vec);
    }

    let rows = sqlx::query("SELECT pattern_id, embedding FROM doc_vectors ORDER BY pattern_id")
        .fetch_all(pool)
        .await?;
    let mut doc_vectors = Vec::with_capacity(rows.len());
    for row in rows {
        let blob: Vec<u8> = row.get("embedding");
        let vec = blob_to_vec(&blob);
        if vec.len() != dims {
            bail!("document vector has {} dims, expected {}", vec.len(), dims);
        }
        doc_vectors.push((row.get::<String, _>("pattern_id"), vec));
    }

    Ok(Some(TermVectorModel::from_parts(dims, term_vectors, doc_vectors)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, migrate};
    use odp_search_core::embedding::VectorParams;

    #[tokio::test]
    async fn test_model_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::connect(&dir.path().join("g.sqlite"), true).await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();

        assert!(load_model(&pool).await.unwrap().is_none());

        let docs = vec![
            ("p1".to_string(), vec!["event".to_string(), "time".to_string()]),
            ("p2".to_string(), vec!["agent".to_string(), "role".to_string()]),
        ];
        let params = VectorParams {
            dims: 32,
            seed_length: 4,
            training_cycles: 2,
        };
        let model = TermVectorModel::train(&docs, params);
        save_model(&pool, &model).await.unwrap();

        let loaded = load_model(&pool).await.unwrap().unwrap();
        assert_eq!(loaded, model);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_meta_upsert() {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::connect(&dir.path().join("g.sqlite"), true).await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        set_meta(&pool, "k", "1").await.unwrap();
        set_meta(&pool, "k", "2").await.unwrap();
        assert_eq!(get_meta(&pool, "k").await.unwrap().as_deref(), Some("2"));
        pool.close().await;
    }
}
