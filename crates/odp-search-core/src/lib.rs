//! # ODP Search Core
//!
//! Shared, runtime-free logic for ODP Search: pattern records and their
//! merge policy, tokenization, the term index abstraction, competency
//! question matching, the random-indexing vector model, and score fusion.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! native-only dependencies. The application crate supplies storage,
//! extraction from ontology documents, and the concurrent search fan-out.

pub mod cq;
pub mod document;
pub mod embedding;
pub mod extract;
pub mod filter;
pub mod fusion;
pub mod lexical;
pub mod merge;
pub mod models;
pub mod store;
pub mod text;
