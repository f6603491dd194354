//! In-memory vector store
//!
//! Points live in an ordered map keyed by id, so scrolls page through a collection in
//! id order. Search is brute force. Useful for tests and for running without Qdrant.

use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{Arc, RwLock};
use tracing::debug;

use docrag_core::{
    Distance, Error, Point, PointFilter, PointId, Result, ScoredPoint, ScrollPage, VectorStore,
};

struct Collection {
    dimension: usize,
    distance: Distance,
    points: BTreeMap<PointId, Point>,
}

/// Local in-memory vector store implementation
#[derive(Clone, Default)]
pub struct MemoryVectorStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl MemoryVectorStore {
    /// Create a new, empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points in a collection
    pub fn len(&self, collection: &str) -> Result<usize> {
        let collections = self.read()?;
        Ok(Self::collection(&collections, collection)?.points.len())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .read()
            .map_err(|e| Error::StoreUnavailable(format!("Lock error: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .write()
            .map_err(|e| Error::StoreUnavailable(format!("Lock error: {}", e)))
    }

    fn collection<'a>(
        collections: &'a HashMap<String, Collection>,
        name: &str,
    ) -> Result<&'a Collection> {
        collections
            .get(name)
            .ok_or_else(|| Error::Configuration(format!("collection '{}' does not exist", name)))
    }

    fn check_dimension(expected: usize, vector: &[f32]) -> Result<()> {
        if vector.len() != expected {
            return Err(Error::InvalidInput(format!(
                "vector has {} dimensions, collection expects {}",
                vector.len(),
                expected
            )));
        }
        Ok(())
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot / (norm_a * norm_b)
    }

    fn score(distance: Distance, a: &[f32], b: &[f32]) -> f32 {
        match distance {
            Distance::Cosine => Self::cosine_similarity(a, b),
            Distance::Dot => a.iter().zip(b).map(|(x, y)| x * y).sum(),
            Distance::Euclid => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
        }
    }

    /// Ordering that puts the best match first
    fn rank(distance: Distance, a: f32, b: f32) -> Ordering {
        let ordering = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        match distance {
            // Smaller distance is better
            Distance::Euclid => ordering,
            Distance::Cosine | Distance::Dot => ordering.reverse(),
        }
    }

    /// Resolve a dotted payload path such as `source` or `metadata.filename`
    fn payload_matches(point: &Point, filter: &PointFilter) -> bool {
        let Ok(payload) = serde_json::to_value(&point.payload) else {
            return false;
        };

        let mut current = &payload;
        for segment in filter.key.split('.') {
            match current.get(segment) {
                Some(next) => current = next,
                None => return false,
            }
        }

        match current {
            Value::String(s) => *s == filter.value,
            other => other.to_string() == filter.value,
        }
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn ensure_collection(
        &self,
        collection: &str,
        dimension: usize,
        distance: Distance,
    ) -> Result<()> {
        let mut collections = self.write()?;

        if let Some(existing) = collections.get(collection) {
            if existing.dimension != dimension {
                return Err(Error::Configuration(format!(
                    "collection '{}' has dimension {}, requested {}",
                    collection, existing.dimension, dimension
                )));
            }
            return Ok(());
        }

        collections.insert(
            collection.to_string(),
            Collection {
                dimension,
                distance,
                points: BTreeMap::new(),
            },
        );
        debug!(collection, dimension, "created in-memory collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
        let mut collections = self.write()?;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| Error::Configuration(format!("collection '{}' does not exist", collection)))?;

        for point in &points {
            Self::check_dimension(target.dimension, &point.vector)?;
        }

        let count = points.len();
        for point in points {
            target.points.insert(point.id.clone(), point);
        }
        debug!(collection, count, "upserted points");
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let collections = self.read()?;
        let target = Self::collection(&collections, collection)?;
        Self::check_dimension(target.dimension, vector)?;

        let mut results: Vec<ScoredPoint> = target
            .points
            .values()
            .map(|point| ScoredPoint {
                id: point.id.clone(),
                score: Self::score(target.distance, vector, &point.vector),
                payload: point.payload.clone(),
            })
            .collect();

        results.sort_by(|a, b| Self::rank(target.distance, a.score, b.score));
        results.truncate(limit);
        Ok(results)
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: Option<&PointFilter>,
        limit: usize,
        offset: Option<&str>,
    ) -> Result<ScrollPage> {
        if limit == 0 {
            return Err(Error::InvalidInput(
                "scroll limit must be greater than zero".to_string(),
            ));
        }

        let collections = self.read()?;
        let target = Self::collection(&collections, collection)?;

        let lower = match offset {
            Some(id) => Bound::Included(id.to_string()),
            None => Bound::Unbounded,
        };

        let mut matching = target
            .points
            .range((lower, Bound::Unbounded))
            .map(|(_, point)| point)
            .filter(|point| filter.is_none_or(|f| Self::payload_matches(point, f)));

        let points: Vec<Point> = matching.by_ref().take(limit).cloned().collect();
        let next_offset = matching.next().map(|point| point.id.clone());

        Ok(ScrollPage {
            points,
            next_offset,
        })
    }

    async fn delete(&self, collection: &str, ids: &[PointId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut collections = self.write()?;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| Error::Configuration(format!("collection '{}' does not exist", collection)))?;

        for id in ids {
            target.points.remove(id);
        }
        debug!(collection, count = ids.len(), "deleted points");
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        self.read().map(|_| ())
    }
}
