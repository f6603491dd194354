//! Deterministic hash-based embeddings

use async_trait::async_trait;

use docrag_core::{Embedding, EmbeddingProvider, Error, Result};

/// Embeds text by hashing words and bigrams into a fixed number of buckets.
///
/// No model, no network: the same text always maps to the same unit-length vector,
/// and texts sharing words land close together. Tokens are bucketed by MD5, so vectors
/// stored by one build keep matching queries embedded by another.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub const DEFAULT_DIMENSION: usize = 384;

    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::Configuration(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    fn bucket(&self, token: &str) -> u64 {
        let digest = md5::compute(token.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.0[..8]);
        u64::from_le_bytes(head)
    }

    fn embed_one(&self, text: &str) -> Embedding {
        let normalized: String = text
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect();
        let words: Vec<&str> = normalized.split_whitespace().collect();
        let dim = self.dimension as u64;
        let mut embedding = vec![0.0f32; self.dimension];

        for (i, word) in words.iter().enumerate() {
            let hash = self.bucket(word);
            let weight = 1.0 / (1.0 + i as f32 * 0.1);
            embedding[(hash % dim) as usize] += weight;

            if word.len() > 3 {
                embedding[((hash >> 16) % dim) as usize] += weight * 0.5;
            }
        }

        for window in words.windows(2) {
            let bigram = format!("{} {}", window[0], window[1]);
            embedding[(self.bucket(&bigram) % dim) as usize] += 0.3;
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut embedding {
                *value /= magnitude;
            }
        }

        embedding
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            dimension: Self::DEFAULT_DIMENSION,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_vectors_are_deterministic_and_normalized() {
        let embedder = HashEmbedder::new(64).unwrap();
        let texts = vec!["Vector stores rank by cosine".to_string()];

        let first = embedder.embed(&texts).await.unwrap();
        let second = embedder.embed(&texts).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].len(), 64);

        let norm: f32 = first[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_shared_words_score_higher() {
        let embedder = HashEmbedder::default();
        let texts = vec![
            "rust ownership and borrowing".to_string(),
            "ownership and borrowing in rust".to_string(),
            "baking sourdough bread at home".to_string(),
        ];
        let vectors = embedder.embed(&texts).await.unwrap();

        assert!(cosine(&vectors[0], &vectors[1]) > cosine(&vectors[0], &vectors[2]));
    }

    #[tokio::test]
    async fn test_buckets_are_fixed_across_builds() {
        let embedder = HashEmbedder::new(64).unwrap();
        let vector = embedder.embed_query("rust").await.unwrap();

        let hot: Vec<usize> = (0..64).filter(|i| vector[*i] > 0.0).collect();
        assert_eq!(hot, vec![46, 50]);
        assert!(vector[50] > vector[46]);
    }

    #[test]
    fn test_zero_dimension_is_rejected() {
        assert!(matches!(HashEmbedder::new(0), Err(Error::Configuration(_))));
    }
}
