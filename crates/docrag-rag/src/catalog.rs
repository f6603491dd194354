//! Document catalog: the ingest/search/manage pipeline over an embedding provider
//! and a vector store

use chrono::Utc;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use docrag_core::{
    CatalogStatistics, ChunkDetail, ChunkPayload, ChunkSummary, DeletionReceipt, Distance,
    DocumentDetail, DocumentMetadata, DocumentSummary, EmbeddingProvider, Error, IngestReceipt,
    IngestRequest, MetadataMap, MetadataUpdateReceipt, Point, PointFilter, Result,
    RetrievedChunk, ScrollPage, VectorStore,
};

use crate::chunker::TextChunker;

/// Page size used for catalog scrolls unless configured otherwise
pub const DEFAULT_SCROLL_LIMIT: usize = 1000;

/// Characters of chunk text shown in a listing
const PREVIEW_CHARS: usize = 100;

/// Catalog of documents stored as chunk points in one collection
pub struct DocumentCatalog<E: EmbeddingProvider + ?Sized, V: VectorStore + ?Sized> {
    embedder: Arc<E>,
    store: Arc<V>,
    chunker: TextChunker,
    collection: String,
    scroll_limit: usize,
}

impl<E: EmbeddingProvider + ?Sized, V: VectorStore + ?Sized> DocumentCatalog<E, V> {
    pub fn new(
        embedder: Arc<E>,
        store: Arc<V>,
        chunker: TextChunker,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            chunker,
            collection: collection.into(),
            scroll_limit: DEFAULT_SCROLL_LIMIT,
        }
    }

    /// Set the page size of catalog scrolls (at least 1)
    pub fn with_scroll_limit(mut self, limit: usize) -> Self {
        self.scroll_limit = limit.max(1);
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub fn store(&self) -> &V {
        &self.store
    }

    /// Create the collection, sized to the embedder's dimension, if it does not exist
    pub async fn initialize(&self) -> Result<()> {
        self.store
            .ensure_collection(&self.collection, self.embedder.dimension(), Distance::Cosine)
            .await?;
        info!(
            collection = %self.collection,
            dimension = self.embedder.dimension(),
            model = self.embedder.model_name(),
            "catalog ready"
        );
        Ok(())
    }

    /// Chunk, embed and store a document.
    ///
    /// Nothing is written unless every step before the single upsert succeeds.
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestReceipt> {
        let IngestRequest {
            filename,
            text,
            file_size_bytes,
            page_count,
            metadata,
        } = request;

        if filename.trim().is_empty() {
            return Err(Error::InvalidInput("filename must not be blank".to_string()));
        }
        if text.trim().is_empty() {
            return Err(Error::EmptyText);
        }

        let chunks = self.chunker.chunk(&text);
        if chunks.is_empty() {
            return Err(Error::EmptyChunkSet(filename));
        }

        // Caller keys go through the same merge as updates, so a key naming a fixed
        // field replaces it and an ill-typed one is rejected here
        let processed_at = Utc::now();
        let snapshot = DocumentMetadata {
            filename: filename.clone(),
            file_size_bytes: file_size_bytes.unwrap_or(text.len() as u64),
            page_count,
            total_chunks: chunks.len(),
            processed_at,
            text_length: text.chars().count(),
            updated_at: None,
            extra: MetadataMap::new(),
        }
        .merged(&metadata)?;

        let vectors = self.embedder.embed(&chunks).await?;
        if vectors.len() != chunks.len() {
            return Err(Error::CardinalityMismatch {
                expected: chunks.len(),
                actual: vectors.len(),
            });
        }

        let total_chunks = chunks.len();
        let points: Vec<Point> = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(index, (chunk, vector))| Point {
                id: Uuid::new_v4().to_string(),
                vector,
                payload: ChunkPayload {
                    chunk_length: chunk.chars().count(),
                    text: chunk,
                    source: filename.clone(),
                    chunk_index: index,
                    total_chunks,
                    created_at: processed_at,
                    metadata: snapshot.clone(),
                },
            })
            .collect();

        self.store.upsert(&self.collection, points).await?;
        info!(filename = %filename, chunks = total_chunks, "ingested document");

        Ok(IngestReceipt {
            filename,
            chunk_count: total_chunks,
            file_size_bytes: snapshot.file_size_bytes,
            page_count: snapshot.page_count,
            text_length: snapshot.text_length,
            processed_at,
        })
    }

    /// Top `limit` chunks for a query, best match first
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<RetrievedChunk>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed_query(query).await?;
        let hits = self.store.query(&self.collection, &vector, limit).await?;
        debug!(query, hits = hits.len(), "search complete");

        Ok(hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                text: hit.payload.text,
                source: hit.payload.source,
                score: hit.score,
                chunk_index: hit.payload.chunk_index,
                chunk_length: hit.payload.chunk_length,
            })
            .collect())
    }

    /// Every document visible in one scroll page, grouped in first-seen order
    pub async fn list(&self) -> Result<Vec<DocumentSummary>> {
        let points = self.scroll_page("list", None).await?;

        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<Point>> = HashMap::new();
        for point in points {
            match groups.entry(point.payload.source.clone()) {
                Entry::Occupied(mut entry) => {
                    if entry.get()[0].payload.metadata != point.payload.metadata {
                        warn!(
                            document = %entry.key(),
                            point = %point.id,
                            "chunk metadata differs from the first chunk seen; keeping the first"
                        );
                    }
                    entry.get_mut().push(point);
                }
                Entry::Vacant(entry) => {
                    order.push(entry.key().clone());
                    entry.insert(vec![point]);
                }
            }
        }

        let mut documents = Vec::with_capacity(order.len());
        for name in order {
            let Some(mut group) = groups.remove(&name) else {
                continue;
            };
            let metadata = group[0].payload.metadata.clone();
            group.sort_by_key(|point| point.payload.chunk_index);

            documents.push(DocumentSummary {
                name,
                filename: metadata.filename,
                file_size_bytes: metadata.file_size_bytes,
                page_count: metadata.page_count,
                total_chunks: metadata.total_chunks,
                processed_at: metadata.processed_at,
                text_length: metadata.text_length,
                updated_at: metadata.updated_at,
                custom_metadata: metadata.extra,
                actual_chunks: group.len(),
                chunks: group
                    .into_iter()
                    .map(|point| ChunkSummary {
                        text_preview: preview(&point.payload.text),
                        id: point.id,
                        chunk_index: point.payload.chunk_index,
                        chunk_length: point.payload.chunk_length,
                        created_at: point.payload.created_at,
                    })
                    .collect(),
            });
        }

        Ok(documents)
    }

    /// Full view of one document, or `None` when no chunk carries its name
    pub async fn get(&self, name: &str) -> Result<Option<DocumentDetail>> {
        let mut points = self.document_points("get", name).await?;
        if points.is_empty() {
            return Ok(None);
        }

        points.sort_by_key(|point| point.payload.chunk_index);
        let metadata = points[0].payload.metadata.clone();

        Ok(Some(DocumentDetail {
            name: name.to_string(),
            metadata,
            actual_chunks: points.len(),
            chunks: points
                .into_iter()
                .map(|point| ChunkDetail {
                    id: point.id,
                    chunk_index: point.payload.chunk_index,
                    chunk_length: point.payload.chunk_length,
                    created_at: point.payload.created_at,
                    text: point.payload.text,
                })
                .collect(),
        }))
    }

    /// Merge `patch` into the metadata of every chunk of a document.
    ///
    /// Points keep their ids and stored vectors; nothing is re-embedded.
    pub async fn update_metadata(
        &self,
        name: &str,
        patch: &MetadataMap,
    ) -> Result<MetadataUpdateReceipt> {
        let points = self.document_points("update_metadata", name).await?;
        if points.is_empty() {
            return Err(Error::NotFound(name.to_string()));
        }

        let updated_at = Utc::now();
        let updated = points
            .into_iter()
            .map(|mut point| {
                let mut metadata = point.payload.metadata.merged(patch)?;
                metadata.updated_at = Some(updated_at);
                point.payload.metadata = metadata;
                Ok(point)
            })
            .collect::<Result<Vec<_>>>()?;

        let updated_metadata = updated[0].payload.metadata.clone();
        let updated_chunks = updated.len();
        self.store.upsert(&self.collection, updated).await?;
        info!(document = %name, chunks = updated_chunks, "updated document metadata");

        Ok(MetadataUpdateReceipt {
            name: name.to_string(),
            updated_chunks,
            updated_metadata,
            updated_at,
        })
    }

    /// Remove every chunk of a document
    pub async fn delete(&self, name: &str) -> Result<DeletionReceipt> {
        let points = self.document_points("delete", name).await?;
        let Some(first) = points.first() else {
            return Err(Error::NotFound(name.to_string()));
        };

        let metadata_snapshot = first.payload.metadata.clone();
        let ids: Vec<String> = points.iter().map(|point| point.id.clone()).collect();
        self.store.delete(&self.collection, &ids).await?;
        info!(document = %name, chunks = ids.len(), "deleted document");

        Ok(DeletionReceipt {
            name: name.to_string(),
            deleted_chunks: ids.len(),
            deleted_at: Utc::now(),
            metadata_snapshot,
        })
    }

    /// Collection-wide totals over one scroll page
    pub async fn statistics(&self) -> Result<CatalogStatistics> {
        let points = self.scroll_page("statistics", None).await?;

        let mut documents: Vec<&str> = points
            .iter()
            .map(|point| point.payload.source.as_str())
            .collect();
        documents.sort_unstable();
        documents.dedup();

        let total_chunks = points.len();
        let total_file_size: u64 = points
            .iter()
            .map(|point| point.payload.metadata.file_size_bytes)
            .sum();
        let total_text_length: usize = points.iter().map(|point| point.payload.chunk_length).sum();
        let average_chunk_size = if total_chunks == 0 {
            0.0
        } else {
            total_text_length as f64 / total_chunks as f64
        };

        Ok(CatalogStatistics {
            total_documents: documents.len(),
            total_chunks,
            total_file_size,
            total_text_length,
            average_chunk_size,
            generated_at: Utc::now(),
        })
    }

    async fn document_points(&self, operation: &str, name: &str) -> Result<Vec<Point>> {
        let filter = PointFilter::source(name);
        self.scroll_page(operation, Some(&filter)).await
    }

    async fn scroll_page(&self, operation: &str, filter: Option<&PointFilter>) -> Result<Vec<Point>> {
        let ScrollPage {
            points,
            next_offset,
        } = self
            .store
            .scroll(&self.collection, filter, self.scroll_limit, None)
            .await?;

        if next_offset.is_some() {
            warn!(
                operation,
                limit = self.scroll_limit,
                "scroll returned a full page; results past the limit are not included"
            );
        }

        Ok(points)
    }
}

/// First characters of a chunk, with `...` when cut
fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
