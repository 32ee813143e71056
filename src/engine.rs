//! Score fusion engine: concurrent fan-out over the retrieval strategies.
//!
//! The three strategies only read from already-built indices and share no
//! mutable state. Each runs as its own task; a strategy whose index is not
//! loaded, that errors, or that panics contributes an empty list. Fusion
//! happens once all of them have finished.

use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use odp_search_core::cq::match_competency_questions;
use odp_search_core::embedding::EmbeddingIndex;
use odp_search_core::fusion::{fuse, Strategy, StrategyResult};
use odp_search_core::models::{Field, SearchResult};
use odp_search_core::store::{TermHit, TermIndex};

/// Retrieval limits, decoupled from application config.
#[derive(Debug, Clone, Copy)]
pub struct EngineParams {
    /// Lexical candidates fetched from the term index.
    pub candidate_k_keyword: usize,
    /// Nearest neighbours fetched from the embedding index.
    pub neighbors: usize,
}

/// Inputs for one fused search.
#[derive(Debug, Clone)]
pub struct FusionQuery {
    /// The query as typed, compared whole against competency questions.
    pub raw: String,
    /// Normalized query tokens plus their lexical expansions, used by both
    /// the lexical and the embedding strategy.
    pub expanded_terms: Vec<String>,
}

async fn lexical(
    terms: Option<Arc<dyn TermIndex>>,
    query: Arc<FusionQuery>,
    params: EngineParams,
) -> anyhow::Result<Vec<TermHit>> {
    match terms {
        Some(t) => {
            t.search(Field::AllTerms, &query.expanded_terms, params.candidate_k_keyword)
                .await
        }
        None => Ok(Vec::new()),
    }
}

async fn embedding(
    vectors: Option<Arc<dyn EmbeddingIndex>>,
    query: Arc<FusionQuery>,
    params: EngineParams,
) -> anyhow::Result<Vec<TermHit>> {
    match vectors {
        Some(v) => v.nearest_neighbors(&query.expanded_terms, params.neighbors).await,
        None => Ok(Vec::new()),
    }
}

async fn competency_questions(
    terms: Option<Arc<dyn TermIndex>>,
    query: Arc<FusionQuery>,
) -> anyhow::Result<Vec<TermHit>> {
    let Some(t) = terms else {
        return Ok(Vec::new());
    };
    let docs = t.documents().await?;
    let hits =
        tokio::task::spawn_blocking(move || match_competency_questions(&query.raw, &docs)).await?;
    Ok(hits)
}

/// Run every strategy concurrently and fuse their results.
///
/// Never fails: the ranking is built from whichever strategies succeeded,
/// and is empty if none did.
pub async fn search(
    terms: Option<Arc<dyn TermIndex>>,
    vectors: Option<Arc<dyn EmbeddingIndex>>,
    query: FusionQuery,
    params: EngineParams,
) -> Vec<SearchResult> {
    let query = Arc::new(query);
    let mut set: JoinSet<(Strategy, anyhow::Result<Vec<TermHit>>)> = JoinSet::new();

    {
        let (terms, query) = (terms.clone(), query.clone());
        set.spawn(async move { (Strategy::Lexical, lexical(terms, query, params).await) });
    }
    {
        let query = query.clone();
        set.spawn(async move { (Strategy::Embedding, embedding(vectors, query, params).await) });
    }
    {
        let query = query.clone();
        set.spawn(async move {
            (
                Strategy::CompetencyQuestion,
                competency_questions(terms, query).await,
            )
        });
    }

    let mut lists = Vec::with_capacity(Strategy::ALL.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((strategy, Ok(hits))) => {
                debug!(strategy = strategy.as_str(), hits = hits.len(), "Strategy finished");
                lists.push(StrategyResult::new(strategy, hits));
            }
            Ok((strategy, Err(e))) => {
                warn!(strategy = strategy.as_str(), error = %format!("{e:#}"), "Strategy failed; ignoring");
            }
            Err(e) => {
                warn!(error = %e, "Strategy task panicked; ignoring");
            }
        }
    }

    fuse(&lists)
}
