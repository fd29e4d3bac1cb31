//! In-process vector store and index catalog

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use docqa_core::{
    Chunk, DistanceMetric, EmbeddingVector, Error, IndexAdmin, IndexDescriptor, IndexSchema,
    ReadinessState, Result, RetrievalResult, ScoredChunk, VectorStore,
};

#[derive(Default)]
struct Entries {
    /// Insertion order; an overwrite keeps the original slot
    rows: Vec<(Chunk, EmbeddingVector)>,
    by_id: HashMap<String, usize>,
}

/// Local in-memory vector store with exact (brute-force) search
pub struct LocalVectorStore {
    dimensionality: usize,
    metric: DistanceMetric,
    entries: RwLock<Entries>,
}

impl LocalVectorStore {
    /// Create a new local vector store
    pub fn new(dimensionality: usize, metric: DistanceMetric) -> Self {
        Self {
            dimensionality,
            metric,
            entries: RwLock::new(Entries::default()),
        }
    }

    fn check_dimensionality(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensionality {
            return Err(Error::DimensionMismatch {
                expected: self.dimensionality,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn upsert(&self, entries: Vec<(Chunk, EmbeddingVector)>) -> Result<()> {
        for (_, vector) in &entries {
            self.check_dimensionality(vector)?;
        }

        let mut store = self
            .entries
            .write()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;

        for (chunk, vector) in entries {
            match store.by_id.get(&chunk.id).copied() {
                Some(slot) => store.rows[slot] = (chunk, vector),
                None => {
                    let slot = store.rows.len();
                    store.by_id.insert(chunk.id.clone(), slot);
                    store.rows.push((chunk, vector));
                }
            }
        }

        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<RetrievalResult> {
        if k == 0 {
            return Err(Error::InvalidRetrievalSize(k));
        }
        self.check_dimensionality(vector)?;

        let store = self
            .entries
            .read()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;

        let mut hits: Vec<ScoredChunk> = store
            .rows
            .iter()
            .map(|(chunk, embedding)| ScoredChunk {
                chunk: chunk.clone(),
                score: self.metric.similarity(vector, embedding),
            })
            .collect();

        // stable sort keeps insertion order among equal scores
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);

        Ok(RetrievalResult::new(hits))
    }

    async fn count(&self) -> Result<usize> {
        let store = self
            .entries
            .read()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;
        Ok(store.rows.len())
    }

    fn dimensionality(&self) -> usize {
        self.dimensionality
    }
}

struct LocalIndex {
    descriptor: IndexDescriptor,
    polls_until_ready: u32,
    store: Arc<LocalVectorStore>,
}

/// In-memory stand-in for a vector database's index control plane
///
/// A new index reports `Initializing` for the first `provisioning_polls`
/// describe calls, mimicking a service that provisions asynchronously.
pub struct LocalIndexCatalog {
    indexes: RwLock<BTreeMap<String, LocalIndex>>,
    provisioning_polls: u32,
}

impl LocalIndexCatalog {
    /// Catalog whose indexes are ready as soon as they are created
    pub fn new() -> Self {
        Self::with_provisioning_polls(0)
    }

    pub fn with_provisioning_polls(provisioning_polls: u32) -> Self {
        Self {
            indexes: RwLock::new(BTreeMap::new()),
            provisioning_polls,
        }
    }
}

impl Default for LocalIndexCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexAdmin for LocalIndexCatalog {
    type Store = LocalVectorStore;

    async fn list_indexes(&self) -> Result<Vec<IndexDescriptor>> {
        let indexes = self
            .indexes
            .read()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;
        Ok(indexes.values().map(|i| i.descriptor.clone()).collect())
    }

    async fn describe_index(&self, name: &str) -> Result<Option<IndexDescriptor>> {
        let mut indexes = self
            .indexes
            .write()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;

        let Some(index) = indexes.get_mut(name) else {
            return Ok(None);
        };

        if index.polls_until_ready > 0 {
            index.polls_until_ready -= 1;
        } else {
            index.descriptor.readiness_state = ReadinessState::Ready;
        }

        Ok(Some(index.descriptor.clone()))
    }

    async fn create_index(&self, schema: &IndexSchema) -> Result<()> {
        let mut indexes = self
            .indexes
            .write()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;

        if indexes.contains_key(&schema.name) {
            return Err(Error::VectorStore(format!(
                "Index '{}' already exists",
                schema.name
            )));
        }

        let readiness_state = if self.provisioning_polls == 0 {
            ReadinessState::Ready
        } else {
            ReadinessState::Initializing
        };

        indexes.insert(
            schema.name.clone(),
            LocalIndex {
                descriptor: IndexDescriptor {
                    name: schema.name.clone(),
                    dimensionality: schema.dimensionality,
                    distance_metric: schema.distance_metric,
                    readiness_state,
                },
                polls_until_ready: self.provisioning_polls,
                store: Arc::new(LocalVectorStore::new(
                    schema.dimensionality,
                    schema.distance_metric,
                )),
            },
        );

        Ok(())
    }

    async fn delete_index(&self, name: &str) -> Result<()> {
        let mut indexes = self
            .indexes
            .write()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;
        indexes.remove(name);
        Ok(())
    }

    async fn open_store(&self, descriptor: &IndexDescriptor) -> Result<Arc<LocalVectorStore>> {
        let indexes = self
            .indexes
            .read()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;

        let index = indexes
            .get(&descriptor.name)
            .ok_or_else(|| Error::VectorStore(format!("Index '{}' not found", descriptor.name)))?;

        if index.descriptor.dimensionality != descriptor.dimensionality {
            return Err(Error::DimensionMismatch {
                expected: descriptor.dimensionality,
                actual: index.descriptor.dimensionality,
            });
        }

        Ok(Arc::clone(&index.store))
    }
}
