//! Local embeddings through fastembed (ONNX Runtime)

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};

use docrag_core::{Embedding, EmbeddingProvider, Error, Result};

/// Runs a sentence-transformers model in-process
pub struct FastEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
    dimension: usize,
}

impl FastEmbedder {
    /// Load a model by its sentence-transformers name, downloading it on first use
    pub fn new(model_name: &str) -> Result<Self> {
        let model = match model_name {
            "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
                EmbeddingModel::AllMiniLML6V2
            }
            "bge-small-en-v1.5" | "BAAI/bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
            other => {
                return Err(Error::Configuration(format!(
                    "unsupported local embedding model: {}",
                    other
                )));
            }
        };

        let mut text_model =
            TextEmbedding::try_new(InitOptions::new(model).with_show_download_progress(false))
                .map_err(|e| Error::ProviderUnavailable(e.to_string()))?;

        // Get dimensions by generating a test embedding
        let probe = text_model
            .embed(vec!["dimension probe"], None)
            .map_err(|e| Error::ProviderUnavailable(e.to_string()))?;
        let dimension = probe.first().map(Vec::len).ok_or(Error::CardinalityMismatch {
            expected: 1,
            actual: 0,
        })?;

        Ok(Self {
            model: Arc::new(Mutex::new(text_model)),
            model_name: model_name.to_string(),
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let model = Arc::clone(&self.model);
        let inputs = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|e| Error::ProviderUnavailable(format!("Lock error: {}", e)))?;
            model
                .embed(inputs, None)
                .map_err(|e| Error::ProviderUnavailable(e.to_string()))
        })
        .await
        .map_err(|e| Error::Other(e.to_string()))?
    }
}
