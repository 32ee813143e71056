use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::OdpError;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub index: IndexConfig,
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub lexicon: LexiconConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Directory holding index generations and the `CURRENT` pointer.
    pub dir: PathBuf,
}

impl IndexConfig {
    pub fn generations_dir(&self) -> PathBuf {
        self.dir.join("generations")
    }

    /// File naming the live generation.
    pub fn current_path(&self) -> PathBuf {
        self.dir.join("CURRENT")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RepositoryConfig {
    pub path: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.owl".to_string(), "**/*.rdf".to_string()]
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MetadataConfig {
    /// JSON array of partial pattern records.
    #[serde(default)]
    pub bulk_path: Option<PathBuf>,
    /// JSON array of known category names.
    #[serde(default)]
    pub categories_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LexiconConfig {
    #[serde(default)]
    pub thesaurus_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_seed_length")]
    pub seed_length: usize,
    #[serde(default = "default_training_cycles")]
    pub training_cycles: usize,
    #[serde(default = "default_neighbors")]
    pub neighbors: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dims: default_dims(),
            seed_length: default_seed_length(),
            training_cycles: default_training_cycles(),
            neighbors: default_neighbors(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_dims() -> usize {
    200
}
fn default_seed_length() -> usize {
    10
}
fn default_training_cycles() -> usize {
    2
}
fn default_neighbors() -> usize {
    25
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_candidate_k")]
    pub candidate_k_keyword: usize,
    #[serde(default = "default_final_limit")]
    pub final_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_k_keyword: default_candidate_k(),
            final_limit: default_final_limit(),
        }
    }
}

fn default_candidate_k() -> usize {
    100
}
fn default_final_limit() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexingConfig {
    #[serde(default = "default_extract_timeout")]
    pub extract_timeout_secs: u64,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            extract_timeout_secs: default_extract_timeout(),
        }
    }
}

fn default_extract_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    /// Check value ranges. Called by [`load_config`]; tests that build a
    /// `Config` with `toml::from_str` may call it directly.
    pub fn validate(&self) -> Result<(), OdpError> {
        let e = &self.embedding;
        if e.dims == 0 {
            return Err(OdpError::config("embedding.dims must be > 0"));
        }
        if e.seed_length == 0 || e.seed_length % 2 != 0 || e.seed_length > e.dims {
            return Err(OdpError::config(
                "embedding.seed_length must be even, > 0 and <= embedding.dims",
            ));
        }
        if e.training_cycles == 0 {
            return Err(OdpError::config("embedding.training_cycles must be >= 1"));
        }
        if e.neighbors == 0 {
            return Err(OdpError::config("embedding.neighbors must be >= 1"));
        }

        if self.retrieval.final_limit < 1 {
            return Err(OdpError::config("retrieval.final_limit must be >= 1"));
        }
        if self.retrieval.candidate_k_keyword < 1 {
            return Err(OdpError::config("retrieval.candidate_k_keyword must be >= 1"));
        }

        if self.indexing.extract_timeout_secs < 1 {
            return Err(OdpError::config("indexing.extract_timeout_secs must be >= 1"));
        }

        if self.server.bind.trim().is_empty() {
            return Err(OdpError::config("server.bind must not be empty"));
        }

        if self.repository.include_globs.is_empty() {
            return Err(OdpError::config("repository.include_globs must not be empty"));
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config, OdpError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        OdpError::config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| OdpError::config(format!("Failed to parse config file: {}", e)))?;

    config.validate()?;
    Ok(config)
}
