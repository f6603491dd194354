//! Core traits and types for docrag
//!
//! This crate defines the data model shared by the ingestion and retrieval pipeline
//! and the capability-facing interfaces for embedding providers and vector stores,
//! so that concrete backends can be swapped and tests can substitute in-memory fakes.

pub mod embedding;
pub mod error;
pub mod types;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use error::{Error, Result};
pub use types::*;
pub use vector_store::{Distance, PointFilter, ScrollPage, VectorStore};
