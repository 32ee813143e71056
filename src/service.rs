//! Query service: the public entry point for search, rebuild, and reads.
//!
//! The service owns the live index generation as an immutable snapshot
//! behind a lock that is only held long enough to clone an `Arc`. A rebuild
//! builds a complete new generation off to the side and then swaps the
//! snapshot, so queries never block on, or observe, a partial rebuild.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use odp_search_core::embedding::EmbeddingIndex;
use odp_search_core::extract::PatternExtractor;
use odp_search_core::filter::{FilterConfig, ANY_CATEGORY};
use odp_search_core::lexical::{expand_query_terms, LexicalExpander};
use odp_search_core::models::{PatternRecord, RankedPattern, SearchResult};
use odp_search_core::store::TermIndex;
use odp_search_core::text::query_terms;

use crate::bulk::load_categories;
use crate::config::Config;
use crate::engine::{self, EngineParams, FusionQuery};
use crate::error::{OdpError, Result};
use crate::indexer::{self, RebuildStatus};
use crate::lexicon;
use crate::owl_extract::OwlExtractor;
use crate::term_store::SqliteTermIndex;
use crate::{db, vector_store};

pub const REBUILD_IN_PROGRESS: &str = "Index rebuild already in progress.";

/// The indices of one generation. Either may be unavailable.
#[derive(Default, Clone)]
pub struct Indices {
    pub terms: Option<Arc<dyn TermIndex>>,
    pub vectors: Option<Arc<dyn EmbeddingIndex>>,
    /// Generation file backing `terms`, if on disk.
    pub path: Option<PathBuf>,
}

impl Indices {
    pub fn new(terms: Option<Arc<dyn TermIndex>>, vectors: Option<Arc<dyn EmbeddingIndex>>) -> Self {
        Self {
            terms,
            vectors,
            path: None,
        }
    }
}

/// Outcome of a rebuild request, rendered as a single status line.
#[derive(Debug, Clone, PartialEq)]
pub enum RebuildOutcome {
    Completed(RebuildStatus),
    Failed(String),
    InProgress,
}

impl fmt::Display for RebuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebuildOutcome::Completed(status) => write!(f, "{status}"),
            RebuildOutcome::Failed(reason) => write!(f, "Index rebuild failed: {reason}"),
            RebuildOutcome::InProgress => f.write_str(REBUILD_IN_PROGRESS),
        }
    }
}

/// Id and display name of a pattern, for category listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternSummary {
    pub id: String,
    pub name: String,
}

pub struct QueryService {
    config: Config,
    expander: Arc<dyn LexicalExpander>,
    extractor: Arc<dyn PatternExtractor>,
    /// Configured category list; empty means derive from the index.
    categories: Vec<String>,
    current: RwLock<Arc<Indices>>,
    rebuild_lock: Mutex<()>,
}

async fn open_generation(config: &Config) -> anyhow::Result<Option<Indices>> {
    let path = match indexer::current_generation(config)? {
        Some(p) => p,
        None => return Ok(None),
    };
    let pool = db::connect(&path, false).await?;
    let terms = SqliteTermIndex::new(pool.clone());
    let count = terms.len().await?;

    let vectors: Option<Arc<dyn EmbeddingIndex>> = if config.embedding.enabled {
        match vector_store::load_model(&pool).await {
            Ok(Some(model)) => Some(Arc::new(model)),
            Ok(None) => {
                warn!("{}", OdpError::unavailable("generation has no vector model"));
                None
            }
            Err(e) => {
                warn!("{}", OdpError::unavailable(format!("{e:#}")));
                None
            }
        }
    } else {
        None
    };

    info!(patterns = count, path = %path.display(), "Opened index generation");
    Ok(Some(Indices {
        terms: Some(Arc::new(terms)),
        vectors,
        path: Some(path),
    }))
}

impl QueryService {
    /// Assemble a service around already-open indices.
    pub fn new(
        config: Config,
        expander: Arc<dyn LexicalExpander>,
        extractor: Arc<dyn PatternExtractor>,
        categories: Vec<String>,
        indices: Indices,
    ) -> Self {
        Self {
            config,
            expander,
            extractor,
            categories,
            current: RwLock::new(Arc::new(indices)),
            rebuild_lock: Mutex::new(()),
        }
    }

    /// Startup: load the lexicon and category list and open the live
    /// generation. A missing or unreadable index is logged and leaves the
    /// service running with that index unavailable.
    pub async fn open(config: Config) -> Result<Self> {
        let categories = match &config.metadata.categories_path {
            Some(p) => load_categories(p).map_err(|e| OdpError::config(format!("{e:#}")))?,
            None => Vec::new(),
        };
        let expander = lexicon::expander(&config);

        let indices = match open_generation(&config).await {
            Ok(Some(indices)) => indices,
            Ok(None) => {
                warn!("{}", OdpError::unavailable("index has never been built"));
                Indices::default()
            }
            Err(e) => {
                warn!("{}", OdpError::unavailable(format!("{e:#}")));
                Indices::default()
            }
        };

        Ok(Self::new(
            config,
            expander,
            Arc::new(OwlExtractor),
            categories,
            indices,
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn snapshot(&self) -> Arc<Indices> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn swap(&self, indices: Indices) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(indices);
    }

    /// Identifier of the live on-disk generation, if any.
    pub fn generation(&self) -> Option<String> {
        self.snapshot()
            .path
            .as_ref()
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().to_string())
    }

    /// Whether the term and vector indices are loaded.
    pub fn availability(&self) -> (bool, bool) {
        let s = self.snapshot();
        (s.terms.is_some(), s.vectors.is_some())
    }

    /// Fused pattern ranking, most relevant first, best effort.
    ///
    /// Never fails: a query with no usable terms, unavailable indices, or
    /// failing strategies all yield an empty or partial list.
    pub async fn search_results(&self, query: &str) -> Vec<SearchResult> {
        self.rank(&self.snapshot(), query).await
    }

    async fn rank(&self, snapshot: &Indices, query: &str) -> Vec<SearchResult> {
        let terms = query_terms(query);
        if terms.is_empty() {
            debug!("{}", OdpError::QueryParse(format!("no terms in {query:?}")));
            return Vec::new();
        }
        let expanded: Vec<String> = expand_query_terms(self.expander.as_ref(), &terms)
            .into_iter()
            .collect();

        let params = EngineParams {
            candidate_k_keyword: self.config.retrieval.candidate_k_keyword,
            neighbors: self.config.embedding.neighbors,
        };
        let fusion_query = FusionQuery {
            raw: query.to_string(),
            expanded_terms: expanded,
        };
        engine::search(
            snapshot.terms.clone(),
            snapshot.vectors.clone(),
            fusion_query,
            params,
        )
        .await
    }

    /// Search, enrich with display records, filter, and truncate to the
    /// configured result limit.
    ///
    /// Ranking and enrichment read the same generation, even if a rebuild
    /// swaps in a new one meanwhile.
    pub async fn search(&self, query: &str, filter: &FilterConfig) -> Vec<RankedPattern> {
        let snapshot = self.snapshot();
        let ranked = self.rank(&snapshot, query).await;
        let terms = match snapshot.terms.clone() {
            Some(t) => t,
            None => return Vec::new(),
        };

        let mut out = Vec::new();
        for result in ranked {
            let doc = match terms.get_by_id(&result.pattern_id).await {
                Ok(Some(doc)) => doc,
                Ok(None) => continue,
                Err(e) => {
                    warn!(id = %result.pattern_id, error = %format!("{e:#}"), "Pattern lookup failed");
                    continue;
                }
            };
            if !filter.matches(&doc.record) {
                continue;
            }
            out.push(RankedPattern {
                pattern: doc.record,
                confidence: result.confidence,
            });
            if out.len() >= self.config.retrieval.final_limit {
                break;
            }
        }
        out
    }

    /// Rebuild the index from the repository and swap it in.
    ///
    /// Concurrent requests are rejected rather than queued.
    pub async fn rebuild(&self) -> RebuildOutcome {
        let _guard = match self.rebuild_lock.try_lock() {
            Ok(g) => g,
            Err(_) => {
                info!("Rejecting concurrent rebuild request");
                return RebuildOutcome::InProgress;
            }
        };

        info!("Index rebuild started");
        let built = match indexer::build_generation(
            &self.config,
            self.expander.clone(),
            self.extractor.clone(),
        )
        .await
        {
            Ok(b) => b,
            Err(e) => {
                error!(error = %format!("{e:#}"), "Index rebuild failed");
                return RebuildOutcome::Failed(format!("{e:#}"));
            }
        };

        if let Err(e) = indexer::publish(&self.config, &built.path) {
            error!(error = %format!("{e:#}"), "Publishing index generation failed");
            built.pool.close().await;
            return RebuildOutcome::Failed(format!("{e:#}"));
        }

        let vectors = built.vectors.map(|v| v as Arc<dyn EmbeddingIndex>);
        let previous = self.snapshot().path.clone();
        self.swap(Indices {
            terms: Some(built.terms),
            vectors,
            path: Some(built.path.clone()),
        });

        // the replaced generation may still back in-flight searches; it is
        // pruned by the next rebuild instead
        let mut keep = vec![built.path.as_path()];
        keep.extend(previous.as_deref());
        indexer::prune_generations(&self.config, &keep);

        info!(status = %built.status, "Index rebuild finished");
        RebuildOutcome::Completed(built.status)
    }

    /// Full record of one pattern.
    pub async fn get_pattern(&self, id: &str) -> Result<Option<PatternRecord>> {
        let terms = self.terms()?;
        let doc = terms
            .get_by_id(id)
            .await
            .map_err(|e| OdpError::unavailable(format!("{e:#}")))?;
        Ok(doc.map(|d| d.record))
    }

    /// Patterns in `category` (all for `Any`), ordered by id.
    pub async fn patterns_by_category(&self, category: &str) -> Result<Vec<PatternSummary>> {
        let filter = FilterConfig {
            category: Some(category.to_string()),
            ..Default::default()
        };
        let docs = self.documents().await?;
        let mut out: Vec<PatternSummary> = docs
            .into_iter()
            .filter(|r| filter.matches(r))
            .map(|r| PatternSummary {
                id: r.id,
                name: r.name,
            })
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    /// Known categories, sorted and deduplicated, led by `Any`.
    pub async fn categories(&self) -> Vec<String> {
        let mut names: Vec<String> = if self.categories.is_empty() {
            match self.documents().await {
                Ok(docs) => docs.into_iter().flat_map(|r| r.categories).collect(),
                Err(_) => Vec::new(),
            }
        } else {
            self.categories.clone()
        };

        // dedup case-insensitively, keeping the first spelling
        let mut seen: BTreeMap<String, String> = BTreeMap::new();
        for name in names.drain(..) {
            let name = name.trim().to_string();
            if name.is_empty() || name.eq_ignore_ascii_case(ANY_CATEGORY) {
                continue;
            }
            seen.entry(name.to_lowercase()).or_insert(name);
        }

        let mut out = Vec::with_capacity(seen.len() + 1);
        out.push(ANY_CATEGORY.to_string());
        out.extend(seen.into_values());
        out
    }

    fn terms(&self) -> Result<Arc<dyn TermIndex>> {
        self.snapshot()
            .terms
            .clone()
            .ok_or_else(|| OdpError::unavailable("term index is not loaded"))
    }

    async fn documents(&self) -> Result<Vec<PatternRecord>> {
        let docs = self
            .terms()?
            .documents()
            .await
            .map_err(|e| OdpError::unavailable(format!("{e:#}")))?;
        Ok(docs.into_iter().map(|d| d.record).collect())
    }
}
