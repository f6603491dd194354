//! Ingestion and retrieval pipeline for docrag
//!
//! This crate provides the text chunker, embedding providers, vector stores and the
//! [`DocumentCatalog`] that ties them together.

pub mod chunker;
pub mod embedder;
pub mod store;
mod catalog;
mod config;

#[cfg(test)]
mod tests;

pub use catalog::{DEFAULT_SCROLL_LIMIT, DocumentCatalog};
pub use chunker::{TextChunker, chunk_text};
pub use config::{CatalogConfig, DynCatalog, EmbeddingBackend, StoreBackend};
#[cfg(feature = "fastembed")]
pub use embedder::FastEmbedder;
pub use embedder::{HashEmbedder, OpenAiEmbedder};
pub use store::{MemoryVectorStore, QdrantVectorStore};

// Re-export core types for convenience
pub use docrag_core::{
    CatalogStatistics, DeletionReceipt, DocumentDetail, DocumentSummary, EmbeddingProvider,
    Error, IngestReceipt, IngestRequest, MetadataMap, MetadataUpdateReceipt, Result,
    RetrievedChunk, VectorStore,
};
