//! Index builder.
//!
//! A rebuild always produces a brand-new generation file: pattern
//! documents are scanned from the repository, extracted, merged with bulk
//! metadata, expanded, and written to a fresh term index, after which the
//! vector model is trained from the stored `allTerms` bags. Nothing from a
//! previous generation is reused.
//!
//! Generations live under `<index.dir>/generations/`; the `CURRENT` file
//! names the live one and is replaced atomically on publish. The generation
//! it replaced is kept until the following rebuild.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use sqlx::SqlitePool;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use odp_search_core::document::build_document;
use odp_search_core::embedding::{TermVectorModel, VectorParams};
use odp_search_core::extract::{ExtractionError, PatternExtractor};
use odp_search_core::lexical::LexicalExpander;
use odp_search_core::merge::reconcile;
use odp_search_core::store::TermIndex;

use crate::bulk::{load_bulk, BulkMetadata};
use crate::config::Config;
use crate::error::OdpError;
use crate::term_store::SqliteTermIndex;
use crate::{db, migrate, vector_store};

/// Summary of one completed rebuild.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RebuildStatus {
    pub documents_indexed: usize,
    pub documents_skipped: usize,
    pub term_index_secs: f64,
    pub vector_index_secs: f64,
    pub vectors_built: bool,
}

impl fmt::Display for RebuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Indexed {} patterns ({} skipped) in {:.1} seconds.",
            self.documents_indexed, self.documents_skipped, self.term_index_secs
        )?;
        if self.vectors_built {
            write!(
                f,
                " Vector index rebuilt in {:.1} seconds.",
                self.vector_index_secs
            )
        } else {
            write!(f, " Vector index disabled.")
        }
    }
}

/// A freshly built, not yet published, index generation.
pub struct BuiltGeneration {
    pub path: PathBuf,
    pub pool: SqlitePool,
    pub terms: Arc<SqliteTermIndex>,
    pub vectors: Option<Arc<TermVectorModel>>,
    pub status: RebuildStatus,
}

/// One pattern document found in the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSource {
    pub path: PathBuf,
    /// Path relative to the repository root, used in logs and errors.
    pub relative: String,
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Pattern documents under the repository root, sorted by relative path.
pub fn scan_repository(config: &Config) -> Result<Vec<PatternSource>> {
    let repo = &config.repository;
    let root = &repo.path;
    if !root.is_dir() {
        bail!("Pattern repository does not exist: {}", root.display());
    }

    let include_set = build_globset(&repo.include_globs)?;

    let mut default_excludes = vec!["**/.git/**".to_string()];
    default_excludes.extend(repo.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut sources = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        sources.push(PatternSource {
            path: path.to_path_buf(),
            relative: rel_str,
        });
    }

    // Sort for deterministic ordering
    sources.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(sources)
}

async fn extract_one(
    extractor: Arc<dyn PatternExtractor>,
    source: &PatternSource,
    timeout: Duration,
) -> Result<odp_search_core::models::ExtractedPattern, OdpError> {
    let content = tokio::fs::read(&source.path).await?;
    let name = source.relative.clone();
    let task = tokio::task::spawn_blocking(move || extractor.extract(&name, &content));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => Ok(result?),
        Ok(Err(join)) => Err(ExtractionError::malformed(&source.relative, join).into()),
        Err(_) => Err(ExtractionError::TimedOut {
            source_name: source.relative.clone(),
            secs: timeout.as_secs(),
        }
        .into()),
    }
}

/// Build a complete new generation from the repository.
///
/// Per-pattern failures are logged and counted as skipped. Anything else
/// (unreadable repository or bulk file, storage errors) fails the rebuild;
/// the partial generation file is removed.
pub async fn build_generation(
    config: &Config,
    expander: Arc<dyn LexicalExpander>,
    extractor: Arc<dyn PatternExtractor>,
) -> Result<BuiltGeneration> {
    let dir = config.index.generations_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create index directory: {}", dir.display()))?;
    let path = dir.join(format!("{}.sqlite", uuid::Uuid::new_v4()));

    let pool = db::connect(&path, true).await?;
    match populate(config, &pool, expander, extractor).await {
        Ok((vectors, status)) => Ok(BuiltGeneration {
            terms: Arc::new(SqliteTermIndex::new(pool.clone())),
            path,
            pool,
            vectors,
            status,
        }),
        Err(e) => {
            pool.close().await;
            remove_generation_files(&path);
            Err(e)
        }
    }
}

async fn populate(
    config: &Config,
    pool: &SqlitePool,
    expander: Arc<dyn LexicalExpander>,
    extractor: Arc<dyn PatternExtractor>,
) -> Result<(Option<Arc<TermVectorModel>>, RebuildStatus)> {
    migrate::run_migrations(pool).await?;
    let terms = SqliteTermIndex::new(pool.clone());

    let bulk = match &config.metadata.bulk_path {
        Some(p) => load_bulk(p)?,
        None => BulkMetadata::default(),
    };
    debug!(records = bulk.len(), "Bulk metadata loaded");

    let sources = scan_repository(config)?;
    info!(documents = sources.len(), "Scanning pattern repository");

    let timeout = Duration::from_secs(config.indexing.extract_timeout_secs);
    let mut status = RebuildStatus::default();
    let started = Instant::now();

    for source in &sources {
        let extracted = match extract_one(extractor.clone(), source, timeout).await {
            Ok(p) => p,
            Err(e) => {
                warn!(document = %source.relative, error = %e, "Skipping pattern");
                status.documents_skipped += 1;
                continue;
            }
        };

        let id = extracted.record.id.clone();
        if terms.get_by_id(&id).await?.is_some() {
            warn!(document = %source.relative, id = %id, "Duplicate pattern id; replacing earlier document");
            status.documents_indexed -= 1;
        }

        let record = reconcile(bulk.lookup(&id), extracted.record);
        let doc = build_document(
            record,
            extracted.class_labels,
            extracted.property_labels,
            expander.as_ref(),
        );
        terms.put(&doc).await?;
        status.documents_indexed += 1;
    }
    status.term_index_secs = started.elapsed().as_secs_f64();
    info!(
        indexed = status.documents_indexed,
        skipped = status.documents_skipped,
        secs = status.term_index_secs,
        "Term index built"
    );

    let vectors = if config.embedding.enabled {
        let started = Instant::now();
        let corpus: Vec<(String, Vec<String>)> = terms
            .documents()
            .await?
            .into_iter()
            .map(|d| (d.record.id, d.all_terms))
            .collect();
        let params = VectorParams {
            dims: config.embedding.dims,
            seed_length: config.embedding.seed_length,
            training_cycles: config.embedding.training_cycles,
        };
        let model = tokio::task::spawn_blocking(move || TermVectorModel::train(&corpus, params))
            .await
            .context("Vector training task failed")?;
        vector_store::save_model(pool, &model).await?;
        status.vector_index_secs = started.elapsed().as_secs_f64();
        status.vectors_built = true;
        info!(
            terms = model.term_vectors().len(),
            secs = status.vector_index_secs,
            "Vector index built"
        );
        Some(Arc::new(model))
    } else {
        None
    };

    vector_store::set_meta(pool, "pattern_count", &status.documents_indexed.to_string()).await?;
    Ok((vectors, status))
}

fn remove_generation_files(path: &Path) {
    for suffix in ["", "-wal", "-shm"] {
        let mut p = path.as_os_str().to_owned();
        p.push(suffix);
        let p = PathBuf::from(p);
        if p.exists() {
            if let Err(e) = std::fs::remove_file(&p) {
                warn!(path = %p.display(), error = %e, "Failed to remove generation file");
            }
        }
    }
}

/// Point `CURRENT` at `generation` (write temp file, then rename).
pub fn publish(config: &Config, generation: &Path) -> Result<()> {
    let name = generation
        .file_name()
        .context("Generation path has no file name")?
        .to_string_lossy()
        .to_string();
    let current = config.index.current_path();
    let tmp = current.with_extension("tmp");
    std::fs::write(&tmp, format!("{name}\n"))?;
    std::fs::rename(&tmp, &current)?;
    Ok(())
}

/// Path of the live generation, if one has been published and exists.
pub fn current_generation(config: &Config) -> Result<Option<PathBuf>> {
    let current = config.index.current_path();
    if !current.exists() {
        return Ok(None);
    }
    let name = std::fs::read_to_string(&current)?;
    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }
    let path = config.index.generations_dir().join(name);
    if !path.exists() {
        return Err(OdpError::unavailable(format!(
            "CURRENT names missing generation {}",
            path.display()
        ))
        .into());
    }
    Ok(Some(path))
}

/// Delete every generation file not named in `keep`.
pub fn prune_generations(config: &Config, keep: &[&Path]) {
    let dir = config.index.generations_dir();
    let entries = match std::fs::read_dir(&dir) {
        Ok(e) => e,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let is_db = path.extension().is_some_and(|e| e == "sqlite");
        let kept = keep.iter().any(|k| k.file_name() == path.file_name());
        if is_db && !kept {
            debug!(path = %path.display(), "Pruning old generation");
            remove_generation_files(&path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(root: &Path) -> Config {
        let text = format!(
            "[index]\ndir = {:?}\n[repository]\npath = {:?}\nexclude_globs = [\"drafts/**\"]\n",
            root.join("index").display().to_string(),
            root.join("repo").display().to_string(),
        );
        toml::from_str(&text).unwrap()
    }

    #[test]
    fn test_status_line() {
        let status = RebuildStatus {
            documents_indexed: 2,
            documents_skipped: 1,
            term_index_secs: 0.12,
            vector_index_secs: 0.01,
            vectors_built: true,
        };
        assert_eq!(
            status.to_string(),
            "Indexed 2 patterns (1 skipped) in 0.1 seconds. Vector index rebuilt in 0.0 seconds."
        );
    }

    #[test]
    fn test_scan_applies_globs_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        std::fs::create_dir_all(repo.join("drafts")).unwrap();
        std::fs::create_dir_all(repo.join("a")).unwrap();
        std::fs::write(repo.join("z.owl"), "").unwrap();
        std::fs::write(repo.join("a/b.rdf"), "").unwrap();
        std::fs::write(repo.join("notes.txt"), "").unwrap();
        std::fs::write(repo.join("drafts/c.owl"), "").unwrap();

        let found: Vec<String> = scan_repository(&config(dir.path()))
            .unwrap()
            .into_iter()
            .map(|s| s.relative)
            .collect();
        assert_eq!(found, vec!["a/b.rdf", "z.owl"]);
    }

    #[test]
    fn test_scan_missing_repository_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_repository(&config(dir.path())).is_err());
    }

    #[test]
    fn test_publish_and_prune() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let gens = config.index.generations_dir();
        std::fs::create_dir_all(&gens).unwrap();
        let oldest = gens.join("oldest.sqlite");
        let old = gens.join("old.sqlite");
        let new = gens.join("new.sqlite");
        std::fs::write(&oldest, "").unwrap();
        std::fs::write(gens.join("oldest.sqlite-wal"), "").unwrap();
        std::fs::write(&old, "").unwrap();
        std::fs::write(&new, "").unwrap();

        assert!(current_generation(&config).unwrap().is_none());
        publish(&config, &new).unwrap();
        assert_eq!(current_generation(&config).unwrap(), Some(new.clone()));

        prune_generations(&config, &[new.as_path(), old.as_path()]);
        assert!(!oldest.exists());
        assert!(!gens.join("oldest.sqlite-wal").exists());
        assert!(old.exists());
        assert!(new.exists());

        prune_generations(&config, &[new.as_path()]);
        assert!(!old.exists());
        assert!(new.exists());
    }
}
