//! Catalog tests over the in-memory store

use async_trait::async_trait;
use chrono::Utc;
use insta::assert_yaml_snapshot;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{DocumentCatalog, HashEmbedder, MemoryVectorStore, TextChunker};
use docrag_core::{
    ChunkPayload, DocumentMetadata, Embedding, EmbeddingProvider, Error, IngestRequest,
    MetadataMap, Point, Result, VectorStore,
};

const COLLECTION: &str = "documents";

async fn catalog_with(
    chunker: TextChunker,
) -> (
    DocumentCatalog<HashEmbedder, MemoryVectorStore>,
    Arc<MemoryVectorStore>,
) {
    let store = Arc::new(MemoryVectorStore::new());
    let catalog = DocumentCatalog::new(
        Arc::new(HashEmbedder::default()),
        Arc::clone(&store),
        chunker,
        COLLECTION,
    );
    catalog.initialize().await.unwrap();
    (catalog, store)
}

/// Chunks of exactly 50 characters for text without sentence boundaries
async fn fixed_catalog() -> (
    DocumentCatalog<HashEmbedder, MemoryVectorStore>,
    Arc<MemoryVectorStore>,
) {
    catalog_with(TextChunker::new(50, 0).unwrap()).await
}

fn patch(value: serde_json::Value) -> MetadataMap {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("patch must be an object"),
    }
}

async fn vectors_by_id(store: &MemoryVectorStore) -> HashMap<String, Embedding> {
    store
        .scroll(COLLECTION, None, 1000, None)
        .await
        .unwrap()
        .points
        .into_iter()
        .map(|point| (point.id, point.vector))
        .collect()
}

/// Returns one vector fewer than asked for
struct ShortEmbedder;

#[async_trait]
impl EmbeddingProvider for ShortEmbedder {
    fn model_name(&self) -> &str {
        "short"
    }

    fn dimension(&self) -> usize {
        64
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(vec![vec![0.5; 64]; texts.len().saturating_sub(1)])
    }
}

/// Fails every call
struct DownEmbedder;

#[async_trait]
impl EmbeddingProvider for DownEmbedder {
    fn model_name(&self) -> &str {
        "down"
    }

    fn dimension(&self) -> usize {
        64
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Embedding>> {
        Err(Error::ProviderUnavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_ingest_receipt_snapshot() {
    let (catalog, _) = catalog_with(TextChunker::new(1000, 200).unwrap()).await;

    let receipt = catalog
        .ingest(IngestRequest::new("notes.txt", "A short note. Nothing more.").with_page_count(2))
        .await
        .unwrap();

    assert_yaml_snapshot!(receipt, { ".processed_at" => "[timestamp]" }, @r###"
    filename: notes.txt
    chunk_count: 1
    file_size_bytes: 27
    page_count: 2
    text_length: 27
    processed_at: "[timestamp]"
    "###);
}

#[tokio::test]
async fn test_ingest_then_get_returns_every_chunk() {
    let (catalog, _) = fixed_catalog().await;
    let text = "x".repeat(150);

    let receipt = catalog
        .ingest(IngestRequest::new("long.txt", text).with_file_size(4096))
        .await
        .unwrap();
    assert_eq!(receipt.chunk_count, 3);
    assert_eq!(receipt.file_size_bytes, 4096);
    assert_eq!(receipt.page_count, None);

    let detail = catalog.get("long.txt").await.unwrap().unwrap();
    assert_eq!(detail.actual_chunks, receipt.chunk_count);
    assert_eq!(detail.metadata.total_chunks, 3);
    assert_eq!(detail.metadata.text_length, 150);
    let indexes: Vec<usize> = detail.chunks.iter().map(|c| c.chunk_index).collect();
    assert_eq!(indexes, vec![0, 1, 2]);
    assert!(detail.chunks.iter().all(|c| c.chunk_length == 50));

    assert!(catalog.get("missing.txt").await.unwrap().is_none());
}

#[tokio::test]
async fn test_ingest_rejects_bad_input_without_writing() {
    let (catalog, store) = fixed_catalog().await;

    let err = catalog
        .ingest(IngestRequest::new("blank.txt", "  \n\t "))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EmptyText));

    let err = catalog
        .ingest(IngestRequest::new("  ", "some text"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    assert_eq!(store.len(COLLECTION).unwrap(), 0);
}

#[tokio::test]
async fn test_embedding_count_mismatch_writes_nothing() {
    let store = Arc::new(MemoryVectorStore::new());
    let catalog = DocumentCatalog::new(
        Arc::new(ShortEmbedder),
        Arc::clone(&store),
        TextChunker::new(50, 0).unwrap(),
        COLLECTION,
    );
    catalog.initialize().await.unwrap();

    let err = catalog
        .ingest(IngestRequest::new("doc.txt", "z".repeat(120)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::CardinalityMismatch {
            expected: 3,
            actual: 2
        }
    ));
    assert_eq!(store.len(COLLECTION).unwrap(), 0);
}

#[tokio::test]
async fn test_provider_failure_aborts_ingest() {
    let store = Arc::new(MemoryVectorStore::new());
    let catalog = DocumentCatalog::new(
        Arc::new(DownEmbedder),
        Arc::clone(&store),
        TextChunker::new(50, 0).unwrap(),
        COLLECTION,
    );
    catalog.initialize().await.unwrap();

    let err = catalog
        .ingest(IngestRequest::new("doc.txt", "hello world"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProviderUnavailable(_)));
    assert_eq!(store.len(COLLECTION).unwrap(), 0);
}

#[tokio::test]
async fn test_search_orders_by_score() {
    let (catalog, _) = catalog_with(TextChunker::new(1000, 200).unwrap()).await;
    catalog
        .ingest(IngestRequest::new(
            "rust.txt",
            "Rust ownership and borrowing keep memory safe without a garbage collector.",
        ))
        .await
        .unwrap();
    catalog
        .ingest(IngestRequest::new(
            "bread.txt",
            "Sourdough bread needs flour, water, salt and a lively starter.",
        ))
        .await
        .unwrap();

    let results = catalog.search("rust ownership borrowing", 2).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].source, "rust.txt");
    assert!(results[0].score >= results[1].score);
    assert_eq!(results[0].chunk_index, 0);

    let top = catalog.search("rust ownership borrowing", 1).await.unwrap();
    assert_eq!(top.len(), 1);
}

#[tokio::test]
async fn test_search_with_zero_limit_touches_nothing() {
    // Neither the provider nor the (uninitialized) collection may be used
    let catalog = DocumentCatalog::new(
        Arc::new(DownEmbedder),
        Arc::new(MemoryVectorStore::new()),
        TextChunker::new(50, 0).unwrap(),
        COLLECTION,
    );

    assert!(catalog.search("anything", 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_groups_chunks_by_document() {
    let (catalog, _) = fixed_catalog().await;
    let mut metadata = MetadataMap::new();
    metadata.insert("author".to_string(), json!("ada"));

    catalog
        .ingest(IngestRequest::new("a.txt", "a".repeat(150)).with_metadata(metadata))
        .await
        .unwrap();
    catalog
        .ingest(IngestRequest::new("b.txt", "b".repeat(40)))
        .await
        .unwrap();

    let mut documents = catalog.list().await.unwrap();
    documents.sort_by(|x, y| x.name.cmp(&y.name));
    assert_eq!(documents.len(), 2);

    let a = &documents[0];
    assert_eq!(a.name, "a.txt");
    assert_eq!(a.actual_chunks, 3);
    assert_eq!(a.total_chunks, 3);
    assert_eq!(a.custom_metadata["author"], json!("ada"));
    let indexes: Vec<usize> = a.chunks.iter().map(|c| c.chunk_index).collect();
    assert_eq!(indexes, vec![0, 1, 2]);
    assert_eq!(a.chunks[0].text_preview, "a".repeat(50));

    let b = &documents[1];
    assert_eq!(b.actual_chunks, 1);
    assert!(b.custom_metadata.is_empty());
}

#[tokio::test]
async fn test_delete_only_removes_named_document() {
    let (catalog, store) = fixed_catalog().await;
    catalog
        .ingest(IngestRequest::new("keep.txt", "k".repeat(100)))
        .await
        .unwrap();
    catalog
        .ingest(IngestRequest::new("drop.txt", "d".repeat(150)))
        .await
        .unwrap();

    let receipt = catalog.delete("drop.txt").await.unwrap();
    assert_eq!(receipt.deleted_chunks, 3);
    assert_eq!(receipt.metadata_snapshot.filename, "drop.txt");

    assert!(catalog.get("drop.txt").await.unwrap().is_none());
    assert_eq!(catalog.get("keep.txt").await.unwrap().unwrap().actual_chunks, 2);
    assert_eq!(store.len(COLLECTION).unwrap(), 2);

    let err = catalog.delete("drop.txt").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_update_merges_and_keeps_vectors() {
    let (catalog, store) = fixed_catalog().await;
    catalog
        .ingest(IngestRequest::new("doc.txt", "q".repeat(120)))
        .await
        .unwrap();
    let before = vectors_by_id(&store).await;

    let first = catalog
        .update_metadata("doc.txt", &patch(json!({"a": 1, "topic": "physics"})))
        .await
        .unwrap();
    assert_eq!(first.updated_chunks, 3);

    let second = catalog
        .update_metadata("doc.txt", &patch(json!({"a": 2})))
        .await
        .unwrap();
    assert_eq!(second.updated_metadata.extra["a"], json!(2));
    assert_eq!(second.updated_metadata.extra["topic"], json!("physics"));
    assert_eq!(second.updated_metadata.updated_at, Some(second.updated_at));

    let detail = catalog.get("doc.txt").await.unwrap().unwrap();
    assert_eq!(detail.actual_chunks, 3);
    assert_eq!(detail.metadata.extra["a"], json!(2));
    assert_eq!(detail.metadata.filename, "doc.txt");

    assert_eq!(vectors_by_id(&store).await, before);
}

#[tokio::test]
async fn test_update_rejects_ill_typed_patch() {
    let (catalog, _) = fixed_catalog().await;
    catalog
        .ingest(IngestRequest::new("doc.txt", "q".repeat(60)))
        .await
        .unwrap();

    let err = catalog
        .update_metadata("doc.txt", &patch(json!({"total_chunks": "many"})))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let detail = catalog.get("doc.txt").await.unwrap().unwrap();
    assert_eq!(detail.metadata.total_chunks, 2);
    assert!(detail.metadata.updated_at.is_none());
}

#[tokio::test]
async fn test_update_unknown_document_is_not_found() {
    let (catalog, _) = fixed_catalog().await;
    let err = catalog
        .update_metadata("ghost.txt", &patch(json!({"a": 1})))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_statistics_count_file_size_per_chunk() {
    let (catalog, _) = fixed_catalog().await;

    let empty = catalog.statistics().await.unwrap();
    assert_eq!(empty.total_chunks, 0);
    assert_eq!(empty.average_chunk_size, 0.0);

    catalog
        .ingest(IngestRequest::new("three.txt", "t".repeat(150)))
        .await
        .unwrap();
    catalog
        .ingest(IngestRequest::new("five.txt", "f".repeat(250)))
        .await
        .unwrap();

    let stats = catalog.statistics().await.unwrap();
    assert_eq!(stats.total_documents, 2);
    assert_eq!(stats.total_chunks, 8);
    assert_eq!(stats.total_text_length, 400);
    assert_eq!(stats.average_chunk_size, 50.0);
    assert_eq!(stats.total_file_size, 3 * 150 + 5 * 250);
}

#[tokio::test]
async fn test_small_scroll_limit_truncates_listing() {
    let (catalog, _) = fixed_catalog().await;
    let catalog = catalog.with_scroll_limit(2);
    catalog
        .ingest(IngestRequest::new("big.txt", "g".repeat(250)))
        .await
        .unwrap();

    let stats = catalog.statistics().await.unwrap();
    assert_eq!(stats.total_chunks, 2);
}

#[tokio::test]
async fn test_ingest_metadata_naming_fixed_fields_is_merged() {
    let (catalog, _) = fixed_catalog().await;
    catalog
        .ingest(
            IngestRequest::new("doc.txt", "m".repeat(100))
                .with_metadata(patch(json!({"page_count": 7, "author": "ada"}))),
        )
        .await
        .unwrap();

    let detail = catalog.get("doc.txt").await.unwrap().unwrap();
    assert_eq!(detail.metadata.page_count, Some(7));
    assert!(!detail.metadata.extra.contains_key("page_count"));
    assert_eq!(detail.metadata.extra["author"], json!("ada"));

    let stored = serde_json::to_value(&detail.metadata).unwrap();
    assert_eq!(stored["page_count"], json!(7));

    catalog
        .update_metadata("doc.txt", &patch(json!({"a": 1})))
        .await
        .unwrap();
    let updated = catalog.get("doc.txt").await.unwrap().unwrap();
    assert_eq!(updated.metadata.page_count, Some(7));
    assert_eq!(updated.metadata.filename, "doc.txt");
    assert_eq!(updated.metadata.extra["a"], json!(1));
}

#[tokio::test]
async fn test_ingest_rejects_ill_typed_metadata_without_writing() {
    let (catalog, store) = fixed_catalog().await;

    let err = catalog
        .ingest(
            IngestRequest::new("doc.txt", "m".repeat(100))
                .with_metadata(patch(json!({"file_size_bytes": "big"}))),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(store.len(COLLECTION).unwrap(), 0);
}

fn stored_chunk(id: &str, chunk_index: usize, extra: serde_json::Value, dimension: usize) -> Point {
    let now = Utc::now();
    Point {
        id: id.to_string(),
        vector: vec![1.0; dimension],
        payload: ChunkPayload {
            text: format!("chunk {}", chunk_index),
            source: "split.txt".to_string(),
            chunk_index,
            total_chunks: 2,
            chunk_length: 7,
            created_at: now,
            metadata: DocumentMetadata {
                filename: "split.txt".to_string(),
                file_size_bytes: 14,
                page_count: None,
                total_chunks: 2,
                processed_at: now,
                text_length: 14,
                updated_at: None,
                extra: patch(extra),
            },
        },
    }
}

#[tokio::test]
async fn test_list_keeps_first_seen_metadata_when_chunks_diverge() {
    let (catalog, store) = fixed_catalog().await;
    let dimension = catalog.embedder().dimension();

    // The memory store scrolls in id order, so "a-..." is seen first
    store
        .upsert(
            COLLECTION,
            vec![
                stored_chunk("b-second", 0, json!({"version": 2}), dimension),
                stored_chunk("a-first", 1, json!({"version": 1}), dimension),
            ],
        )
        .await
        .unwrap();

    let documents = catalog.list().await.unwrap();
    assert_eq!(documents.len(), 1);
    let document = &documents[0];
    assert_eq!(document.name, "split.txt");
    assert_eq!(document.actual_chunks, 2);
    assert_eq!(document.custom_metadata["version"], json!(1));
    let indexes: Vec<usize> = document.chunks.iter().map(|c| c.chunk_index).collect();
    assert_eq!(indexes, vec![0, 1]);
}

#[tokio::test]
async fn test_small_scroll_limit_bounds_update_and_delete() {
    let (catalog, store) = fixed_catalog().await;
    let catalog = catalog.with_scroll_limit(2);
    catalog
        .ingest(IngestRequest::new("big.txt", "g".repeat(250)))
        .await
        .unwrap();
    assert_eq!(store.len(COLLECTION).unwrap(), 5);

    let updated = catalog
        .update_metadata("big.txt", &patch(json!({"a": 1})))
        .await
        .unwrap();
    assert_eq!(updated.updated_chunks, 2);

    let receipt = catalog.delete("big.txt").await.unwrap();
    assert_eq!(receipt.deleted_chunks, 2);
    assert_eq!(store.len(COLLECTION).unwrap(), 3);
}
