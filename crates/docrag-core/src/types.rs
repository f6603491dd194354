//! Data model shared across the ingestion and retrieval pipeline
//!
//! Document metadata is denormalized: every chunk of a document carries its own copy
//! of [`DocumentMetadata`] inside its [`ChunkPayload`]. Reads never join across
//! records, so updates and deletions have to touch every chunk of a document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Payload key holding the document name; the field catalog filters match on
pub const SOURCE_FIELD: &str = "source";

/// Identifier of a stored point (a UUID string)
pub type PointId = String;

/// A fixed-dimension embedding vector
pub type Embedding = Vec<f32>;

/// Caller-supplied metadata: an open key/value map
pub type MetadataMap = Map<String, Value>;

/// Metadata snapshot of a document, copied into every one of its chunks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub filename: String,
    pub file_size_bytes: u64,
    pub page_count: Option<u32>,
    pub total_chunks: usize,
    pub processed_at: DateTime<Utc>,
    /// Length of the extracted text in characters
    pub text_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Caller-supplied keys, stored alongside the fixed fields
    #[serde(flatten)]
    pub extra: MetadataMap,
}

impl DocumentMetadata {
    /// Shallow-merge `patch` over this snapshot.
    ///
    /// New keys are added, overlapping keys (fixed fields included) are replaced by the
    /// patch value, everything else is kept. A patch that gives a fixed field a value of
    /// the wrong type is rejected.
    pub fn merged(&self, patch: &MetadataMap) -> Result<Self> {
        let mut object = match serde_json::to_value(self)? {
            Value::Object(object) => object,
            other => {
                return Err(Error::Serialization(format!(
                    "metadata serialized to a non-object value: {}",
                    other
                )));
            }
        };

        for (key, value) in patch {
            object.insert(key.clone(), value.clone());
        }

        serde_json::from_value(Value::Object(object))
            .map_err(|e| Error::InvalidInput(format!("metadata patch rejected: {}", e)))
    }
}

/// Everything stored next to a chunk's vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub text: String,
    /// Name of the document this chunk belongs to
    pub source: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    /// Length of `text` in characters
    pub chunk_length: usize,
    pub created_at: DateTime<Utc>,
    pub metadata: DocumentMetadata,
}

/// The physical unit held by a vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: PointId,
    pub vector: Embedding,
    pub payload: ChunkPayload,
}

/// A point returned by a similarity query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: PointId,
    pub score: f32,
    pub payload: ChunkPayload,
}

/// A document handed to the catalog for ingestion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestRequest {
    pub filename: String,
    pub text: String,
    /// Size of the original file; defaults to the UTF-8 length of `text`
    pub file_size_bytes: Option<u64>,
    pub page_count: Option<u32>,
    pub metadata: MetadataMap,
}

impl IngestRequest {
    pub fn new(filename: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_file_size(mut self, bytes: u64) -> Self {
        self.file_size_bytes = Some(bytes);
        self
    }

    pub fn with_page_count(mut self, pages: u32) -> Self {
        self.page_count = Some(pages);
        self
    }

    pub fn with_metadata(mut self, metadata: MetadataMap) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Result of a successful ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReceipt {
    pub filename: String,
    pub chunk_count: usize,
    pub file_size_bytes: u64,
    pub page_count: Option<u32>,
    pub text_length: usize,
    pub processed_at: DateTime<Utc>,
}

/// A chunk returned by a similarity search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub source: String,
    pub score: f32,
    pub chunk_index: usize,
    pub chunk_length: usize,
}

/// Per-chunk entry of a document listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSummary {
    pub id: PointId,
    pub chunk_index: usize,
    pub chunk_length: usize,
    pub created_at: DateTime<Utc>,
    pub text_preview: String,
}

/// Document-level view built from a document's chunks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub name: String,
    pub filename: String,
    pub file_size_bytes: u64,
    pub page_count: Option<u32>,
    pub total_chunks: usize,
    pub processed_at: DateTime<Utc>,
    pub text_length: usize,
    pub updated_at: Option<DateTime<Utc>>,
    pub custom_metadata: MetadataMap,
    /// Number of chunks actually found in the store
    pub actual_chunks: usize,
    pub chunks: Vec<ChunkSummary>,
}

/// Chunk with its full text, as returned by a single-document lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkDetail {
    pub id: PointId,
    pub chunk_index: usize,
    pub chunk_length: usize,
    pub created_at: DateTime<Utc>,
    pub text: String,
}

/// Full view of one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDetail {
    pub name: String,
    pub metadata: DocumentMetadata,
    pub actual_chunks: usize,
    pub chunks: Vec<ChunkDetail>,
}

/// Result of a metadata update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataUpdateReceipt {
    pub name: String,
    pub updated_chunks: usize,
    pub updated_metadata: DocumentMetadata,
    pub updated_at: DateTime<Utc>,
}

/// Result of a document deletion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionReceipt {
    pub name: String,
    pub deleted_chunks: usize,
    pub deleted_at: DateTime<Utc>,
    pub metadata_snapshot: DocumentMetadata,
}

/// Aggregate statistics over the whole collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogStatistics {
    pub total_documents: usize,
    pub total_chunks: usize,
    /// Sum of `file_size_bytes` taken once per chunk, not once per document
    pub total_file_size: u64,
    pub total_text_length: usize,
    pub average_chunk_size: f64,
    pub generated_at: DateTime<Utc>,
}
