//! Vector store trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::SOURCE_FIELD;
use crate::{Point, PointId, Result, ScoredPoint};

/// Similarity metric a collection ranks by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    Cosine,
    Dot,
    Euclid,
}

/// Exact-match predicate on a payload key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointFilter {
    pub key: String,
    pub value: String,
}

impl PointFilter {
    pub fn matches(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Match every chunk of the named document
    pub fn source(name: impl Into<String>) -> Self {
        Self::matches(SOURCE_FIELD, name)
    }
}

/// One page of a scroll
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrollPage {
    pub points: Vec<Point>,
    /// Id to resume from; `None` once the collection is exhausted
    pub next_offset: Option<PointId>,
}

impl ScrollPage {
    /// Whether more points exist beyond this page
    pub fn is_truncated(&self) -> bool {
        self.next_offset.is_some()
    }
}

/// Trait for vector stores (e.g., Qdrant, an in-memory index)
///
/// Every operation names the collection it works on. Scrolls are bounded by a page
/// size: a caller that needs every point has to follow `next_offset` until it is `None`.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if absent; fails if it exists with another dimension
    async fn ensure_collection(
        &self,
        collection: &str,
        dimension: usize,
        distance: Distance,
    ) -> Result<()>;

    /// Insert or overwrite points by id
    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()>;

    /// Similarity search, best match first
    async fn query(&self, collection: &str, vector: &[f32], limit: usize)
    -> Result<Vec<ScoredPoint>>;

    /// Paginated retrieval, optionally filtered
    async fn scroll(
        &self,
        collection: &str,
        filter: Option<&PointFilter>,
        limit: usize,
        offset: Option<&str>,
    ) -> Result<ScrollPage>;

    /// Remove points by id; an empty list is a no-op
    async fn delete(&self, collection: &str, ids: &[PointId]) -> Result<()>;

    /// Check that the store is reachable
    async fn health_check(&self) -> Result<()>;
}
