//! Qdrant-backed vector store
//!
//! Payloads travel as Qdrant `Value` trees. They are converted to and from
//! `serde_json::Value` here so the rest of the crate only sees [`ChunkPayload`].

use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, value::Kind, vectors::VectorsOptions, vectors_config::Config,
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance as QdrantDistance, Filter,
    ListValue, PointId as QdrantPointId, PointStruct, PointsIdsList, ScrollPointsBuilder,
    SearchPointsBuilder, Struct, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
    Vectors,
};
use qdrant_client::{Qdrant, QdrantError};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use tracing::{debug, info};

use docrag_core::{
    ChunkPayload, Distance, Embedding, Error, Point, PointFilter, PointId, Result, ScoredPoint,
    ScrollPage, VectorStore,
};

/// Vector store talking to a Qdrant server over gRPC
pub struct QdrantVectorStore {
    client: Qdrant,
    url: String,
}

impl QdrantVectorStore {
    /// Default gRPC endpoint of a local Qdrant
    pub const DEFAULT_URL: &'static str = "http://localhost:6334";

    pub fn new(url: &str, api_key: Option<String>) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .api_key(api_key)
            .build()
            .map_err(store_error)?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn existing_dimension(&self, collection: &str) -> Result<Option<u64>> {
        let info = self
            .client
            .collection_info(collection)
            .await
            .map_err(store_error)?;

        let config = info
            .result
            .and_then(|info| info.config)
            .and_then(|config| config.params)
            .and_then(|params| params.vectors_config)
            .and_then(|vectors| vectors.config);

        Ok(match config {
            Some(Config::Params(params)) => Some(params.size),
            _ => None,
        })
    }
}

fn store_error(err: QdrantError) -> Error {
    Error::StoreUnavailable(err.to_string())
}

fn to_qdrant_distance(distance: Distance) -> QdrantDistance {
    match distance {
        Distance::Cosine => QdrantDistance::Cosine,
        Distance::Dot => QdrantDistance::Dot,
        Distance::Euclid => QdrantDistance::Euclid,
    }
}

fn to_point_id(id: &str) -> QdrantPointId {
    match id.parse::<u64>() {
        Ok(num) => QdrantPointId::from(num),
        Err(_) => QdrantPointId::from(id.to_string()),
    }
}

fn from_point_id(id: Option<QdrantPointId>) -> Result<PointId> {
    match id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Uuid(uuid)) => Ok(uuid),
        Some(PointIdOptions::Num(num)) => Ok(num.to_string()),
        None => Err(Error::Serialization("point without an id".to_string())),
    }
}

fn from_vectors(vectors: Option<Vectors>) -> Result<Embedding> {
    match vectors.and_then(|v| v.vectors_options) {
        Some(VectorsOptions::Vector(vector)) => Ok(vector.data),
        Some(VectorsOptions::Vectors(_)) => Err(Error::Configuration(
            "named vectors are not supported".to_string(),
        )),
        None => Err(Error::Serialization("point without a vector".to_string())),
    }
}

fn json_to_qdrant(value: Value) -> QdrantValue {
    let kind = match value {
        Value::Null => Kind::NullValue(0),
        Value::Bool(b) => Kind::BoolValue(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Kind::IntegerValue(i),
            None => Kind::DoubleValue(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => Kind::StringValue(s),
        Value::Array(items) => Kind::ListValue(ListValue {
            values: items.into_iter().map(json_to_qdrant).collect(),
        }),
        Value::Object(fields) => Kind::StructValue(Struct {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k, json_to_qdrant(v)))
                .collect(),
        }),
    };
    QdrantValue { kind: Some(kind) }
}

fn qdrant_to_json(value: QdrantValue) -> Value {
    match value.kind {
        None | Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::Number(i.into()),
        Some(Kind::DoubleValue(d)) => Number::from_f64(d).map_or(Value::Null, Value::Number),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => {
            Value::Array(list.values.into_iter().map(qdrant_to_json).collect())
        }
        Some(Kind::StructValue(object)) => Value::Object(
            object
                .fields
                .into_iter()
                .map(|(k, v)| (k, qdrant_to_json(v)))
                .collect(),
        ),
    }
}

fn encode_payload(payload: &ChunkPayload) -> Result<HashMap<String, QdrantValue>> {
    match serde_json::to_value(payload)? {
        Value::Object(fields) => Ok(fields
            .into_iter()
            .map(|(k, v)| (k, json_to_qdrant(v)))
            .collect()),
        _ => Err(Error::Serialization(
            "chunk payload is not an object".to_string(),
        )),
    }
}

fn decode_payload(payload: HashMap<String, QdrantValue>) -> Result<ChunkPayload> {
    let object: Map<String, Value> = payload
        .into_iter()
        .map(|(k, v)| (k, qdrant_to_json(v)))
        .collect();
    Ok(serde_json::from_value(Value::Object(object))?)
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn ensure_collection(
        &self,
        collection: &str,
        dimension: usize,
        distance: Distance,
    ) -> Result<()> {
        let exists = self
            .client
            .collection_exists(collection)
            .await
            .map_err(store_error)?;

        if exists {
            if let Some(size) = self.existing_dimension(collection).await? {
                if size != dimension as u64 {
                    return Err(Error::Configuration(format!(
                        "collection '{}' has dimension {}, requested {}",
                        collection, size, dimension
                    )));
                }
            }
            debug!(collection, "collection already exists");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(collection).vectors_config(VectorParamsBuilder::new(
                    dimension as u64,
                    to_qdrant_distance(distance),
                )),
            )
            .await
            .map_err(store_error)?;

        info!(collection, dimension, "created Qdrant collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let count = points.len();
        let structs = points
            .into_iter()
            .map(|point| {
                Ok(PointStruct {
                    id: Some(to_point_id(&point.id)),
                    payload: encode_payload(&point.payload)?,
                    vectors: Some(point.vector.into()),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, structs).wait(true))
            .await
            .map_err(store_error)?;

        debug!(collection, count, "upserted points");
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, vector.to_vec(), limit as u64)
                    .with_payload(true),
            )
            .await
            .map_err(store_error)?;

        response
            .result
            .into_iter()
            .map(|hit| {
                Ok(ScoredPoint {
                    id: from_point_id(hit.id)?,
                    score: hit.score,
                    payload: decode_payload(hit.payload)?,
                })
            })
            .collect()
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

        let limit = u32::try_from(limit).unwrap_or(u32::MAX);
        let mut request = ScrollPointsBuilder::new(collection)
            .limit(limit)
            .with_payload(true)
            .with_vectors(true);

        if let Some(filter) = filter {
            request = request.filter(Filter::must([Condition::matches(
                filter.key.as_str(),
                filter.value.clone(),
            )]));
        }
        if let Some(offset) = offset {
            request = request.offset(to_point_id(offset));
        }

        let response = self.client.scroll(request).await.map_err(store_error)?;

        let points = response
            .result
            .into_iter()
            .map(|retrieved| {
                Ok(Point {
                    id: from_point_id(retrieved.id)?,
                    vector: from_vectors(retrieved.vectors)?,
                    payload: decode_payload(retrieved.payload)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let next_offset = match response.next_page_offset {
            Some(id) => Some(from_point_id(Some(id))?),
            None => None,
        };

        Ok(ScrollPage {
            points,
            next_offset,
        })
    }

    async fn delete(&self, collection: &str, ids: &[PointId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(PointsIdsList {
                        ids: ids.iter().map(|id| to_point_id(id)).collect(),
                    })
                    .wait(true),
            )
            .await
            .map_err(store_error)?;

        debug!(collection, count = ids.len(), "deleted points");
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        self.client.health_check().await.map_err(store_error)?;
        Ok(())
    }
}
