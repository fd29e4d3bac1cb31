//! Ingestion pipeline and the question-answering facade it produces

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use docqa_core::{
    Answer, Chunk, Document, EmbeddingGateway, Error, Generator, IndexAdmin, PipelineConfig,
    QuestionAnswering, Result, VectorStore,
};

use crate::{Answerer, Chunker, IndexLifecycleManager, Retriever};

/// Summary of a completed ingestion run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionReport {
    pub document_id: String,
    /// Pages that produced at least one chunk
    pub pages: usize,
    pub chunks: usize,
    /// Entries in the index after the run
    pub stored: usize,
}

/// Builds a populated knowledge base from a document
///
/// Runs chunking, index provisioning and batched embed+upsert. The index
/// only ever holds the latest document: entries left by an earlier run are
/// dropped before the new chunks are written. Only a fully successful run
/// hands back a [`KnowledgeBase`].
pub struct Ingestor<A: IndexAdmin, E: EmbeddingGateway, G: Generator> {
    config: PipelineConfig,
    lifecycle: IndexLifecycleManager<A>,
    chunker: Chunker,
    embedder: Arc<E>,
    generator: Arc<G>,
}

impl<A, E, G> Ingestor<A, E, G>
where
    A: IndexAdmin,
    E: EmbeddingGateway + 'static,
    G: Generator + 'static,
{
    pub fn new(
        config: PipelineConfig,
        admin: Arc<A>,
        embedder: Arc<E>,
        generator: Arc<G>,
    ) -> Result<Self> {
        config.validate()?;

        if embedder.dimensionality() != config.embedding.dimensionality {
            return Err(Error::Configuration(format!(
                "embedder '{}' produces {}-d vectors but the index schema expects {}",
                embedder.model_id(),
                embedder.dimensionality(),
                config.embedding.dimensionality
            )));
        }

        let lifecycle = IndexLifecycleManager::new(admin, &config.index);
        let chunker = Chunker::from_config(&config.chunking)?;

        Ok(Self {
            config,
            lifecycle,
            chunker,
            embedder,
            generator,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Index `document` and return a knowledge base ready for questions
    pub async fn ingest(&self, document: &Document) -> Result<KnowledgeBase<A::Store, E, G>> {
        // a document with no text must fail before the index is touched
        let chunks = self.chunker.split(document)?;
        let mut pages: Vec<usize> = chunks.iter().map(|c| c.page_index).collect();
        pages.dedup();
        info!(
            document = %document.id,
            pages = pages.len(),
            chunks = chunks.len(),
            "chunked document"
        );

        let schema = self.config.index_schema();
        let mut descriptor = self.lifecycle.ensure(&schema).await?;
        let mut store = self.lifecycle.admin().open_store(&descriptor).await?;

        // chunks of an earlier ingestion would stay retrievable otherwise
        let leftover = store.count().await?;
        if leftover > 0 {
            debug!(index = %schema.name, leftover, "index holds an earlier ingestion");
            descriptor = self.lifecycle.reset(&schema).await?;
            store = self.lifecycle.admin().open_store(&descriptor).await?;
        }

        let batches: Vec<Vec<Chunk>> = chunks
            .chunks(self.config.embedding.batch_size)
            .map(|batch| batch.to_vec())
            .collect();
        let batch_count = batches.len();

        let written: Vec<usize> = stream::iter(batches.into_iter().enumerate())
            .map(|(n, batch)| {
                let embedder = self.embedder.clone();
                let store = store.clone();
                async move { embed_and_store(n, batch, embedder.as_ref(), store.as_ref()).await }
            })
            .buffer_unordered(self.config.ingestion.concurrency)
            .try_collect()
            .await?;

        let stored = store.count().await?;
        let report = IngestionReport {
            document_id: document.id.clone(),
            pages: pages.len(),
            chunks: written.iter().sum(),
            stored,
        };
        info!(
            document = %report.document_id,
            batches = batch_count,
            chunks = report.chunks,
            stored = report.stored,
            "ingestion complete"
        );

        Ok(KnowledgeBase {
            retriever: Retriever::new(self.embedder.clone(), store),
            answerer: Answerer::new(self.generator.clone(), &self.config.generation),
            top_k: self.config.retrieval.top_k,
            report,
        })
    }
}

async fn embed_and_store<E, V>(n: usize, batch: Vec<Chunk>, embedder: &E, store: &V) -> Result<usize>
where
    E: EmbeddingGateway,
    V: VectorStore,
{
    let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder.embed(&texts).await?;
    if vectors.len() != batch.len() {
        return Err(Error::EmbeddingService(format!(
            "requested {} embeddings, received {}",
            batch.len(),
            vectors.len()
        )));
    }

    let size = batch.len();
    store.upsert(batch.into_iter().zip(vectors).collect()).await?;
    debug!(batch = n, size, "stored batch");
    Ok(size)
}

/// A fully ingested document that can answer questions
pub struct KnowledgeBase<V: VectorStore, E: EmbeddingGateway, G: Generator> {
    retriever: Retriever<E, V>,
    answerer: Answerer<G>,
    top_k: usize,
    report: IngestionReport,
}

impl<V: VectorStore, E: EmbeddingGateway, G: Generator> KnowledgeBase<V, E, G> {
    pub fn report(&self) -> &IngestionReport {
        &self.report
    }
}

#[async_trait]
impl<V, E, G> QuestionAnswering for KnowledgeBase<V, E, G>
where
    V: VectorStore,
    E: EmbeddingGateway,
    G: Generator,
{
    async fn ask(&self, question: &str) -> Result<Answer> {
        let retrieval = self.retriever.retrieve(question, self.top_k).await?;
        let answer = self.answerer.answer(question, &retrieval).await?;
        debug!(evidence = answer.evidence.len(), "answered question");
        Ok(answer)
    }
}
