//! Environment-driven configuration for the catalog and its backends

use std::env;
use std::str::FromStr;
use std::sync::Arc;

use docrag_core::{EmbeddingProvider, Error, Result, VectorStore};

use crate::catalog::{DEFAULT_SCROLL_LIMIT, DocumentCatalog};
use crate::chunker::TextChunker;
use crate::embedder::{HashEmbedder, OpenAiEmbedder};
use crate::store::{MemoryVectorStore, QdrantVectorStore};

/// Catalog over whichever backends the configuration selects
pub type DynCatalog = DocumentCatalog<dyn EmbeddingProvider, dyn VectorStore>;

/// Which vector store to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Qdrant,
    /// Process-local; contents are lost on exit
    Memory,
}

impl FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "qdrant" => Ok(Self::Qdrant),
            "memory" => Ok(Self::Memory),
            other => Err(Error::Configuration(format!(
                "unknown vector store '{}', expected qdrant or memory",
                other
            ))),
        }
    }
}

/// Which embedding provider to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    Hash,
    OpenAi,
    FastEmbed,
}

impl FromStr for EmbeddingBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hash" => Ok(Self::Hash),
            "openai" => Ok(Self::OpenAi),
            "fastembed" => Ok(Self::FastEmbed),
            other => Err(Error::Configuration(format!(
                "unknown embedding provider '{}', expected hash, openai or fastembed",
                other
            ))),
        }
    }
}

/// Configuration for building a [`DocumentCatalog`]
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub store: StoreBackend,
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub collection: String,
    pub embedding: EmbeddingBackend,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub embedding_batch_size: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub scroll_limit: usize,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
}

impl CatalogConfig {
    /// Load configuration from environment variables (and `.env`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let qdrant_url = match (get("QDRANT_URL"), get("QDRANT_HOST")) {
            (Some(url), _) => url,
            (None, Some(host)) => {
                let port = get("QDRANT_PORT").unwrap_or_else(|| "6334".to_string());
                format!("http://{}:{}", host, port)
            }
            (None, None) => QdrantVectorStore::DEFAULT_URL.to_string(),
        };

        let config = Self {
            store: parse_or(&get, "VECTOR_STORE", StoreBackend::Qdrant)?,
            qdrant_url,
            qdrant_api_key: get("QDRANT_API_KEY"),
            collection: get("COLLECTION_NAME").unwrap_or_else(|| "documents".to_string()),
            embedding: parse_or(&get, "EMBEDDING_PROVIDER", EmbeddingBackend::Hash)?,
            embedding_model: get("EMBEDDING_MODEL")
                .unwrap_or_else(|| "all-MiniLM-L6-v2".to_string()),
            embedding_dimension: parse_or(
                &get,
                "EMBEDDING_DIMENSION",
                HashEmbedder::DEFAULT_DIMENSION,
            )?,
            embedding_batch_size: parse_or(&get, "EMBEDDING_BATCH_SIZE", 64)?,
            chunk_size: parse_or(&get, "CHUNK_SIZE", 1000)?,
            chunk_overlap: parse_or(&get, "CHUNK_OVERLAP", 200)?,
            scroll_limit: parse_or(&get, "SCROLL_LIMIT", DEFAULT_SCROLL_LIMIT)?,
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| OpenAiEmbedder::DEFAULT_BASE_URL.to_string()),
        };

        if config.scroll_limit == 0 {
            return Err(Error::Configuration(
                "SCROLL_LIMIT must be greater than zero".to_string(),
            ));
        }
        config.chunker()?;

        Ok(config)
    }

    pub fn chunker(&self) -> Result<TextChunker> {
        TextChunker::new(self.chunk_size, self.chunk_overlap)
    }

    pub fn build_embedder(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        match self.embedding {
            EmbeddingBackend::Hash => Ok(Arc::new(HashEmbedder::new(self.embedding_dimension)?)),
            EmbeddingBackend::OpenAi => {
                if self.openai_api_key.is_none()
                    && self.openai_base_url == OpenAiEmbedder::DEFAULT_BASE_URL
                {
                    return Err(Error::Configuration(
                        "OPENAI_API_KEY environment variable not found".to_string(),
                    ));
                }
                Ok(Arc::new(OpenAiEmbedder::new(
                    self.openai_base_url.clone(),
                    self.openai_api_key.clone(),
                    self.embedding_model.clone(),
                    self.embedding_dimension,
                    self.embedding_batch_size,
                )?))
            }
            EmbeddingBackend::FastEmbed => self.build_local_embedder(),
        }
    }

    #[cfg(feature = "fastembed")]
    fn build_local_embedder(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        Ok(Arc::new(crate::embedder::FastEmbedder::new(
            &self.embedding_model,
        )?))
    }

    #[cfg(not(feature = "fastembed"))]
    fn build_local_embedder(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        Err(Error::Configuration(
            "EMBEDDING_PROVIDER=fastembed requires building with the fastembed feature"
                .to_string(),
        ))
    }

    pub fn build_store(&self) -> Result<Arc<dyn VectorStore>> {
        match self.store {
            StoreBackend::Qdrant => Ok(Arc::new(QdrantVectorStore::new(
                &self.qdrant_url,
                self.qdrant_api_key.clone(),
            )?)),
            StoreBackend::Memory => Ok(Arc::new(MemoryVectorStore::new())),
        }
    }

    /// Wire up the configured embedder, store and chunker
    pub fn build_catalog(&self) -> Result<DynCatalog> {
        Ok(DocumentCatalog::new(
            self.build_embedder()?,
            self.build_store()?,
            self.chunker()?,
            self.collection.clone(),
        )
        .with_scroll_limit(self.scroll_limit))
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e| {
            Error::Configuration(format!("invalid value for {}: '{}' ({})", key, raw, e))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.store, StoreBackend::Qdrant);
        assert_eq!(config.qdrant_url, "http://localhost:6334");
        assert_eq!(config.collection, "documents");
        assert_eq!(config.embedding, EmbeddingBackend::Hash);
        assert_eq!(config.embedding_dimension, 384);
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.scroll_limit, 1000);
        assert!(config.qdrant_api_key.is_none());
    }

    #[test]
    fn test_host_and_port_build_url() {
        let config =
            CatalogConfig::from_lookup(lookup(&[("QDRANT_HOST", "qdrant"), ("QDRANT_PORT", "7000")]))
                .unwrap();
        assert_eq!(config.qdrant_url, "http://qdrant:7000");

        let config = CatalogConfig::from_lookup(lookup(&[
            ("QDRANT_URL", "http://vectors:6334"),
            ("QDRANT_HOST", "ignored"),
        ]))
        .unwrap();
        assert_eq!(config.qdrant_url, "http://vectors:6334");
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = CatalogConfig::from_lookup(lookup(&[
            ("VECTOR_STORE", "Memory"),
            ("EMBEDDING_PROVIDER", "openai"),
            ("EMBEDDING_DIMENSION", "1536"),
            ("CHUNK_SIZE", "500"),
            ("CHUNK_OVERLAP", "50"),
            ("COLLECTION_NAME", "papers"),
        ]))
        .unwrap();
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.embedding, EmbeddingBackend::OpenAi);
        assert_eq!(config.embedding_dimension, 1536);
        assert_eq!(config.chunker().unwrap().chunk_size(), 500);
        assert_eq!(config.collection, "papers");
    }

    #[test]
    fn test_invalid_values_are_configuration_errors() {
        for pairs in [
            vec![("CHUNK_SIZE", "big")],
            vec![("CHUNK_SIZE", "100"), ("CHUNK_OVERLAP", "100")],
            vec![("VECTOR_STORE", "sqlite")],
            vec![("EMBEDDING_PROVIDER", "magic")],
            vec![("SCROLL_LIMIT", "0")],
        ] {
            let result = CatalogConfig::from_lookup(lookup(&pairs));
            assert!(
                matches!(result, Err(Error::Configuration(_))),
                "expected configuration error for {:?}",
                pairs
            );
        }
    }

    #[test]
    fn test_openai_requires_key_for_default_endpoint() {
        let config =
            CatalogConfig::from_lookup(lookup(&[("EMBEDDING_PROVIDER", "openai")])).unwrap();
        assert!(matches!(
            config.build_embedder(),
            Err(Error::Configuration(_))
        ));

        let config = CatalogConfig::from_lookup(lookup(&[
            ("EMBEDDING_PROVIDER", "openai"),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1"),
        ]))
        .unwrap();
        assert!(config.build_embedder().is_ok());
    }

    #[tokio::test]
    async fn test_memory_catalog_builds_and_initializes() {
        let config = CatalogConfig::from_lookup(lookup(&[
            ("VECTOR_STORE", "memory"),
            ("EMBEDDING_DIMENSION", "32"),
        ]))
        .unwrap();
        let catalog = config.build_catalog().unwrap();
        catalog.initialize().await.unwrap();
        assert_eq!(catalog.embedder().dimension(), 32);
        assert!(catalog.list().await.unwrap().is_empty());
    }
}
