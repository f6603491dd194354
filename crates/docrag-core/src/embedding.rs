//! Embedding provider trait

use async_trait::async_trait;

use crate::{Embedding, Error, Result};

/// Trait for embedding providers (e.g., a local model, an HTTP embedding API)
///
/// Implementors only supply [`EmbeddingProvider::embed_batch`], the raw model call.
/// Callers go through [`EmbeddingProvider::embed`], which filters blank inputs and
/// enforces that exactly one vector comes back per input, in order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier of the underlying model
    fn model_name(&self) -> &str;

    /// Dimension of every vector this provider returns
    fn dimension(&self) -> usize;

    /// Embed a batch of non-blank texts, one vector per text, same order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Embed texts after dropping blank ones
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let inputs: Vec<String> = texts
            .iter()
            .filter(|text| !text.trim().is_empty())
            .cloned()
            .collect();

        if inputs.is_empty() {
            return Err(Error::EmptyInput);
        }

        let vectors = self.embed_batch(&inputs).await?;
        if vectors.len() != inputs.len() {
            return Err(Error::CardinalityMismatch {
                expected: inputs.len(),
                actual: vectors.len(),
            });
        }

        Ok(vectors)
    }

    /// Embed a single query string
    async fn embed_query(&self, query: &str) -> Result<Embedding> {
        let vectors = self.embed(&[query.to_string()]).await?;
        vectors.into_iter().next().ok_or(Error::CardinalityMismatch {
            expected: 1,
            actual: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns `extra` more vectors than asked for, and counts model calls
    struct CountingProvider {
        extra: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn model_name(&self) -> &str {
            "counting"
        }

        fn dimension(&self) -> usize {
            2
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((0..texts.len() + self.extra)
                .map(|i| vec![i as f32, 1.0])
                .collect())
        }
    }

    fn provider(extra: usize) -> CountingProvider {
        CountingProvider {
            extra,
            calls: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_blank_inputs_are_filtered() {
        let provider = provider(0);
        let texts = vec!["alpha".to_string(), "   ".to_string(), "beta".to_string()];

        let vectors = provider.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
    }

    #[tokio::test]
    async fn test_all_blank_fails_before_model_call() {
        let provider = provider(0);
        let texts = vec!["".to_string(), "\n\t".to_string()];

        let err = provider.embed(&texts).await.unwrap_err();
        assert!(matches!(err, Error::EmptyInput));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_count_mismatch_is_rejected() {
        let provider = provider(1);
        let err = provider.embed(&["one".to_string()]).await.unwrap_err();
        assert!(matches!(
            err,
            Error::CardinalityMismatch {
                expected: 1,
                actual: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_embed_query_returns_single_vector() {
        let provider = provider(0);
        let vector = provider.embed_query("what is rust").await.unwrap();
        assert_eq!(vector, vec![0.0, 1.0]);
    }
}
