//! # ODP Search
//!
//! Search engine over a catalog of ontology design patterns.
//!
//! Pattern documents (RDF/XML) are harvested from a repository folder,
//! merged with optional bulk metadata, and indexed into a SQLite FTS5 term
//! index plus a random-indexing vector model. A query is answered by three
//! strategies running concurrently (lexical match over expanded terms,
//! embedding nearest neighbours, and competency-question string similarity)
//! whose scores are fused into one ranking with confidences in `[0, 1]`.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Repository │──▶│ Index Builder│──▶│ SQLite gen.  │
//! │ RDF/XML    │   │ extract+merge│   │ FTS5+vectors │
//! └────────────┘   └──────────────┘   └──────┬───────┘
//!                                            │ snapshot swap
//!                                            ▼
//!                  ┌──────────┐       ┌──────────────┐
//!                  │ CLI/HTTP │──────▶│ Query Service│
//!                  └──────────┘       └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`error`] | Error taxonomy |
//! | [`owl_extract`] | RDF/XML pattern extraction |
//! | [`bulk`] | Bulk metadata and category list import |
//! | [`lexicon`] | Thesaurus loading |
//! | [`indexer`] | Index generation build and publish |
//! | [`term_store`] | SQLite FTS5 term index |
//! | [`vector_store`] | Persisted vector model |
//! | [`engine`] | Concurrent strategy fan-out and fusion |
//! | [`service`] | Query service |
//! | [`server`] | HTTP server |

pub mod bulk;
pub mod commands;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod indexer;
pub mod lexicon;
pub mod migrate;
pub mod owl_extract;
pub mod server;
pub mod service;
pub mod term_store;
pub mod vector_store;
