//! Lexical expander loading.
//!
//! The thesaurus file is a JSON object mapping headwords to
//! `{ "synonyms": [...], "hypernyms": [...] }`. A missing or unreadable
//! dictionary is not an error: the expander degrades to a no-op.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use odp_search_core::lexical::{LexicalExpander, NoopExpander, Thesaurus, ThesaurusEntry};

use crate::config::Config;

pub fn load_thesaurus(path: &Path) -> Result<Thesaurus> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read thesaurus: {}", path.display()))?;
    let entries: HashMap<String, ThesaurusEntry> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse thesaurus: {}", path.display()))?;
    Ok(Thesaurus::from_entries(entries))
}

/// The configured expander, or a no-op one if none is configured or it
/// fails to load.
pub fn expander(config: &Config) -> Arc<dyn LexicalExpander> {
    let path = match &config.lexicon.thesaurus_path {
        Some(p) => p,
        None => {
            info!("No thesaurus configured; lexical expansion disabled");
            return Arc::new(NoopExpander);
        }
    };
    match load_thesaurus(path) {
        Ok(t) => {
            info!(entries = t.len(), path = %path.display(), "Loaded thesaurus");
            Arc::new(t)
        }
        Err(e) => {
            warn!(error = %format!("{e:#}"), "Thesaurus unavailable; lexical expansion disabled");
            Arc::new(NoopExpander)
        }
    }
}
