//! Qdrant-backed index admin and vector store

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors_config::Config as VectorsConfig;
use qdrant_client::qdrant::{
    CollectionInfo, CollectionStatus, CountPointsBuilder, CreateCollectionBuilder, Distance,
    PointStruct, SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use docqa_core::{
    Chunk, DistanceMetric, EmbeddingVector, Error, IndexAdmin, IndexDescriptor, IndexSchema,
    ReadinessState, Result, RetrievalResult, ScoredChunk, VectorStore,
};

/// Connection settings for a Qdrant service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl QdrantConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let url = env::var("QDRANT_URL").unwrap_or_else(|_| "http://localhost:6334".to_string());
        let api_key = env::var("QDRANT_API_KEY").ok().filter(|k| !k.is_empty());

        Self {
            url,
            api_key,
            timeout: Duration::from_secs(30),
        }
    }

    /// Create configuration with explicit values
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

fn store_error(e: impl std::fmt::Display) -> Error {
    Error::VectorStore(e.to_string())
}

/// Qdrant collections as indexes
pub struct QdrantIndexAdmin {
    client: Arc<Qdrant>,
}

impl QdrantIndexAdmin {
    /// Connect to the service described by `config`
    pub fn new(config: &QdrantConfig) -> Result<Self> {
        let client = Qdrant::from_url(&config.url)
            .api_key(config.api_key.clone())
            .timeout(config.timeout)
            .build()
            .map_err(store_error)?;

        Ok(Self {
            client: Arc::new(client),
        })
    }
}

#[async_trait]
impl IndexAdmin for QdrantIndexAdmin {
    type Store = QdrantVectorStore;

    async fn list_indexes(&self) -> Result<Vec<IndexDescriptor>> {
        let collections = self.client.list_collections().await.map_err(store_error)?;

        let mut descriptors = Vec::new();
        for collection in collections.collections {
            if let Some(descriptor) = self.describe_index(&collection.name).await? {
                descriptors.push(descriptor);
            }
        }
        Ok(descriptors)
    }

    async fn describe_index(&self, name: &str) -> Result<Option<IndexDescriptor>> {
        if !self.client.collection_exists(name).await.map_err(store_error)? {
            return Ok(None);
        }

        let response = self.client.collection_info(name).await.map_err(store_error)?;
        match response.result {
            Some(info) => descriptor_from_info(name, &info).map(Some),
            None => Ok(None),
        }
    }

    async fn create_index(&self, schema: &IndexSchema) -> Result<()> {
        let request = CreateCollectionBuilder::new(schema.name.clone()).vectors_config(
            VectorParamsBuilder::new(
                schema.dimensionality as u64,
                distance_to_qdrant(schema.distance_metric),
            ),
        );
        self.client
            .create_collection(request)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> Result<()> {
        self.client.delete_collection(name).await.map_err(store_error)?;
        Ok(())
    }

    async fn open_store(&self, descriptor: &IndexDescriptor) -> Result<Arc<QdrantVectorStore>> {
        Ok(Arc::new(QdrantVectorStore {
            client: Arc::clone(&self.client),
            collection_name: descriptor.name.clone(),
            dimensionality: descriptor.dimensionality,
            metric: descriptor.distance_metric,
        }))
    }
}

fn descriptor_from_info(name: &str, info: &CollectionInfo) -> Result<IndexDescriptor> {
    let params = info
        .config
        .as_ref()
        .and_then(|c| c.params.as_ref())
        .and_then(|p| p.vectors_config.as_ref())
        .and_then(|v| v.config.as_ref());

    let (dimensionality, distance_metric) = match params {
        Some(VectorsConfig::Params(params)) => (
            params.size as usize,
            distance_from_qdrant(params.distance())?,
        ),
        Some(VectorsConfig::ParamsMap(_)) => {
            return Err(Error::VectorStore(format!(
                "Collection '{}' uses named vectors, which are not supported",
                name
            )));
        }
        None => {
            return Err(Error::VectorStore(format!(
                "Collection '{}' reported no vector parameters",
                name
            )));
        }
    };

    let readiness_state = match info.status() {
        CollectionStatus::Green | CollectionStatus::Yellow => ReadinessState::Ready,
        CollectionStatus::Red => ReadinessState::Failed,
        _ => ReadinessState::Initializing,
    };

    Ok(IndexDescriptor {
        name: name.to_string(),
        dimensionality,
        distance_metric,
        readiness_state,
    })
}

fn distance_to_qdrant(metric: DistanceMetric) -> Distance {
    match metric {
        DistanceMetric::Cosine => Distance::Cosine,
        DistanceMetric::DotProduct => Distance::Dot,
        DistanceMetric::Euclidean => Distance::Euclid,
    }
}

fn distance_from_qdrant(distance: Distance) -> Result<DistanceMetric> {
    match distance {
        Distance::Cosine => Ok(DistanceMetric::Cosine),
        Distance::Dot => Ok(DistanceMetric::DotProduct),
        Distance::Euclid => Ok(DistanceMetric::Euclidean),
        other => Err(Error::VectorStore(format!(
            "Unsupported distance {:?}",
            other
        ))),
    }
}

/// Qdrant point ids must be integers or UUIDs; chunk ids map onto a stable UUID
pub fn point_id(chunk_id: &str) -> String {
    Uuid::from_bytes(md5::compute(chunk_id.as_bytes()).0).to_string()
}

fn chunk_payload(chunk: &Chunk) -> HashMap<String, Value> {
    let mut payload = HashMap::new();
    payload.insert("chunk_id".to_string(), Value::from(chunk.id.clone()));
    payload.insert("text".to_string(), Value::from(chunk.text.clone()));
    payload.insert(
        "source_document_id".to_string(),
        Value::from(chunk.source_document_id.clone()),
    );
    payload.insert("page_index".to_string(), Value::from(chunk.page_index as i64));
    payload.insert(
        "char_start".to_string(),
        Value::from(chunk.char_offset_range.start as i64),
    );
    payload.insert(
        "char_end".to_string(),
        Value::from(chunk.char_offset_range.end as i64),
    );
    payload.insert("ordinal".to_string(), Value::from(chunk.ordinal as i64));
    payload
}

fn payload_str(payload: &HashMap<String, Value>, key: &str) -> Result<String> {
    match payload.get(key) {
        Some(Value {
            kind: Some(Kind::StringValue(s)),
        }) => Ok(s.clone()),
        _ => Err(Error::Serialization(format!(
            "point payload is missing string field '{}'",
            key
        ))),
    }
}

fn payload_usize(payload: &HashMap<String, Value>, key: &str) -> Result<usize> {
    match payload.get(key) {
        Some(Value {
            kind: Some(Kind::IntegerValue(n)),
        }) if *n >= 0 => Ok(*n as usize),
        _ => Err(Error::Serialization(format!(
            "point payload is missing integer field '{}'",
            key
        ))),
    }
}

fn chunk_from_payload(payload: &HashMap<String, Value>) -> Result<Chunk> {
    Ok(Chunk {
        id: payload_str(payload, "chunk_id")?,
        text: payload_str(payload, "text")?,
        source_document_id: payload_str(payload, "source_document_id")?,
        page_index: payload_usize(payload, "page_index")?,
        char_offset_range: payload_usize(payload, "char_start")?
            ..payload_usize(payload, "char_end")?,
        ordinal: payload_usize(payload, "ordinal")?,
    })
}

/// One Qdrant collection as a [`VectorStore`]
pub struct QdrantVectorStore {
    client: Arc<Qdrant>,
    collection_name: String,
    dimensionality: usize,
    metric: DistanceMetric,
}

/// Qdrant reports raw distance for Euclid; flip it so larger always means closer
fn similarity_from_score(metric: DistanceMetric, score: f32) -> f32 {
    match metric {
        DistanceMetric::Euclidean => -score,
        DistanceMetric::Cosine | DistanceMetric::DotProduct => score,
    }
}

/// Best first, ties broken by document order, cut to `k`
fn rank_hits(mut hits: Vec<ScoredChunk>, k: usize) -> Vec<ScoredChunk> {
    hits.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.chunk.ordinal.cmp(&b.chunk.ordinal))
    });
    hits.truncate(k);
    hits
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn upsert(&self, entries: Vec<(Chunk, EmbeddingVector)>) -> Result<()> {
        if let Some((_, vector)) = entries.iter().find(|(_, v)| v.len() != self.dimensionality) {
            return Err(Error::DimensionMismatch {
                expected: self.dimensionality,
                actual: vector.len(),
            });
        }
        if entries.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = entries
            .into_iter()
            .map(|(chunk, vector)| PointStruct::new(point_id(&chunk.id), vector, chunk_payload(&chunk)))
            .collect();
        let count = points.len();

        self.client
            .upsert_points(UpsertPointsBuilder::new(self.collection_name.clone(), points).wait(true))
            .await
            .map_err(store_error)?;

        debug!(collection = %self.collection_name, points = count, "upserted points");
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<RetrievalResult> {
        if k == 0 {
            return Err(Error::InvalidRetrievalSize(k));
        }
        if vector.len() != self.dimensionality {
            return Err(Error::DimensionMismatch {
                expected: self.dimensionality,
                actual: vector.len(),
            });
        }

        // one extra candidate so a tie at the cut is settled by document order
        let limit = k as u64 + 1;
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(self.collection_name.clone(), vector.to_vec(), limit)
                    .with_payload(true),
            )
            .await
            .map_err(store_error)?;

        let hits = response
            .result
            .into_iter()
            .map(|point| {
                Ok(ScoredChunk {
                    chunk: chunk_from_payload(&point.payload)?,
                    score: similarity_from_score(self.metric, point.score),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RetrievalResult::new(rank_hits(hits, k)))
    }

    async fn count(&self) -> Result<usize> {
        let response = self
            .client
            .count(CountPointsBuilder::new(self.collection_name.clone()).exact(true))
            .await
            .map_err(store_error)?;
        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }

    fn dimensionality(&self) -> usize {
        self.dimensionality
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chunk() -> Chunk {
        Chunk {
            id: "manual.txt#p2c1".to_string(),
            text: "Press the reset button for five seconds.".to_string(),
            source_document_id: "manual.txt".to_string(),
            page_index: 2,
            char_offset_range: 800..840,
            ordinal: 7,
        }
    }

    #[test]
    fn test_point_id_is_stable_uuid() {
        let a = point_id("manual.txt#p0c0");
        let b = point_id("manual.txt#p0c0");
        let c = point_id("manual.txt#p0c1");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn test_payload_round_trip() {
        let chunk = sample_chunk();
        let restored = chunk_from_payload(&chunk_payload(&chunk)).unwrap();
        assert_eq!(restored, chunk);
    }

    #[test]
    fn test_payload_missing_field() {
        let mut payload = chunk_payload(&sample_chunk());
        payload.remove("text");
        assert!(matches!(
            chunk_from_payload(&payload),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_distance_mapping() {
        for metric in [
            DistanceMetric::Cosine,
            DistanceMetric::DotProduct,
            DistanceMetric::Euclidean,
        ] {
            assert_eq!(distance_from_qdrant(distance_to_qdrant(metric)).unwrap(), metric);
        }
        assert!(distance_from_qdrant(Distance::Manhattan).is_err());
    }

    #[test]
    fn test_euclidean_scores_rank_closer_first() {
        let near = similarity_from_score(DistanceMetric::Euclidean, 1.0);
        let far = similarity_from_score(DistanceMetric::Euclidean, 5.0);
        assert!(near > far);
        assert_eq!(similarity_from_score(DistanceMetric::Cosine, 0.8), 0.8);
    }

    #[test]
    fn test_ranking_breaks_ties_by_ordinal() {
        let hit = |ordinal: usize, score: f32| ScoredChunk {
            chunk: Chunk {
                id: format!("manual.txt#p0c{}", ordinal),
                ordinal,
                ..sample_chunk()
            },
            score,
        };
        // server order for tied scores is arbitrary
        let hits = vec![hit(4, 0.5), hit(9, 0.9), hit(2, 0.5)];

        let ranked = rank_hits(hits, 2);
        let ordinals: Vec<usize> = ranked.iter().map(|h| h.chunk.ordinal).collect();
        assert_eq!(ordinals, vec![9, 2]);
    }

    #[test]
    fn test_ranking_tolerates_nan() {
        let mut broken = ScoredChunk {
            chunk: sample_chunk(),
            score: f32::NAN,
        };
        broken.chunk.ordinal = 1;
        let fine = ScoredChunk {
            chunk: sample_chunk(),
            score: 0.3,
        };

        assert_eq!(rank_hits(vec![fine, broken], 5).len(), 2);
    }

    #[test]
    fn test_config_defaults() {
        let config = QdrantConfig::new("http://qdrant:6334");
        assert_eq!(config.url, "http://qdrant:6334");
        assert!(config.api_key.is_none());
    }
}
