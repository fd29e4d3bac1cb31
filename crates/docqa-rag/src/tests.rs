//! End-to-end tests for ingestion and question answering

#[cfg(test)]
mod scenario_tests {
    use crate::{
        Chunker, HashingEmbedder, Ingestor, LocalIndexCatalog, LocalVectorStore, Retriever,
        TextDocumentSource, document_source_for,
    };
    use async_trait::async_trait;
    use docqa_core::{
        Chunk, DistanceMetric, Document, DocumentSource, EmbeddingGateway, EmbeddingVector, Error,
        Generator, IndexAdmin, IndexSchema, PipelineConfig, QuestionAnswering, Result,
        VectorStore,
    };
    use insta::assert_yaml_snapshot;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const DIMS: usize = 256;

    /// Generator that returns a canned reply and keeps every prompt it saw
    struct ScriptedGenerator {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }

        fn model_id(&self) -> &str {
            "scripted"
        }
    }

    /// Embedder whose provider is always down
    struct UnavailableEmbedder;

    #[async_trait]
    impl EmbeddingGateway for UnavailableEmbedder {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<EmbeddingVector>> {
            Err(Error::EmbeddingService("429 Too Many Requests".to_string()))
        }

        fn dimensionality(&self) -> usize {
            DIMS
        }

        fn model_id(&self) -> &str {
            "unavailable"
        }
    }

    fn config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.embedding.dimensionality = DIMS;
        config.embedding.batch_size = 1;
        config.ingestion.concurrency = 2;
        config.chunking.chunk_size = 200;
        config.chunking.chunk_overlap = 20;
        config.index.poll_interval = Duration::from_millis(1);
        config.index.max_wait = Duration::from_millis(500);
        config
    }

    fn manual() -> Document {
        Document::from_pages(
            "manual.txt",
            [
                "The warranty covers manufacturing defects for two years.",
                "   ",
                "Clean the filter every month with warm water.",
            ],
        )
    }

    /// Minimal PDF with one Helvetica text line per page
    fn pdf_bytes(pages: &[&str]) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{Object, Stream, dictionary};

        let mut pdf = lopdf::Document::with_version("1.5");
        let pages_id = pdf.new_object_id();
        let font_id = pdf.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = pdf.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 712.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                pdf.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = pdf.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        pdf.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = pdf.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        pdf.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        pdf.save_to(&mut bytes).unwrap();
        bytes
    }

    fn filler_page(len: usize) -> String {
        "Replace the cartridge when the light turns red. "
            .chars()
            .cycle()
            .take(len)
            .collect()
    }

    #[test]
    fn test_long_pages_split_with_overlap() {
        let document = Document::from_pages("long.txt", [filler_page(2500), filler_page(2500)]);
        let chunker = Chunker::new(1000, 200).unwrap();

        let chunks = chunker.split(&document).unwrap();

        for page in 0..2 {
            let on_page: Vec<&Chunk> = chunks.iter().filter(|c| c.page_index == page).collect();
            assert!(on_page.len() >= 3, "page {} has {} chunks", page, on_page.len());
            assert!(on_page.iter().all(|c| c.text.chars().count() <= 1000));
            for pair in on_page.windows(2) {
                let shared = pair[0].char_offset_range.end - pair[1].char_offset_range.start;
                assert!(shared >= 200);
            }
        }
    }

    #[tokio::test]
    async fn test_ingest_then_ask() {
        let catalog = Arc::new(LocalIndexCatalog::with_provisioning_polls(2));
        let generator = Arc::new(ScriptedGenerator::new("Clean it once a month."));
        let ingestor = Ingestor::new(
            config(),
            catalog.clone(),
            Arc::new(HashingEmbedder::new(DIMS).unwrap()),
            generator.clone(),
        )
        .unwrap();

        let kb = ingestor.ingest(&manual()).await.unwrap();
        assert_yaml_snapshot!(kb.report(), @r###"
        document_id: manual.txt
        pages: 2
        chunks: 2
        stored: 2
        "###);

        let answer = kb.ask("How often should I clean the filter?").await.unwrap();

        assert_eq!(answer.text, "Clean it once a month.");
        assert_eq!(answer.evidence.len(), 2);
        assert_eq!(answer.evidence[0].id, "manual.txt#p2c0");
        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Clean the filter every month with warm water."));
    }

    #[tokio::test]
    async fn test_reingest_is_idempotent() {
        let catalog = Arc::new(LocalIndexCatalog::new());
        let ingestor = Ingestor::new(
            config(),
            catalog,
            Arc::new(HashingEmbedder::new(DIMS).unwrap()),
            Arc::new(ScriptedGenerator::new("ok")),
        )
        .unwrap();

        let first = ingestor.ingest(&manual()).await.unwrap();
        let second = ingestor.ingest(&manual()).await.unwrap();

        assert_eq!(first.report().stored, 2);
        assert_eq!(second.report(), first.report());
    }

    #[tokio::test]
    async fn test_reingest_replaces_earlier_chunks() {
        let ingestor = Ingestor::new(
            config(),
            Arc::new(LocalIndexCatalog::new()),
            Arc::new(HashingEmbedder::new(DIMS).unwrap()),
            Arc::new(ScriptedGenerator::new("ok")),
        )
        .unwrap();
        let v1 = Document::from_pages(
            "manual.txt",
            ["Warranty is two years.", "Old recall notice: return all units."],
        );
        let v2 = Document::from_pages("manual.txt", ["Warranty is five years."]);

        assert_eq!(ingestor.ingest(&v1).await.unwrap().report().stored, 2);
        let kb = ingestor.ingest(&v2).await.unwrap();
        let answer = kb.ask("Is there a recall notice?").await.unwrap();

        assert_eq!(kb.report().stored, 1);
        assert!(answer.evidence.iter().all(|c| c.id != "manual.txt#p1c0"));
        assert_eq!(answer.evidence.len(), 1);
        assert_eq!(answer.evidence[0].text, "Warranty is five years.");
    }

    #[tokio::test]
    async fn test_embedding_failure_yields_no_knowledge_base() {
        let ingestor = Ingestor::new(
            config(),
            Arc::new(LocalIndexCatalog::new()),
            Arc::new(UnavailableEmbedder),
            Arc::new(ScriptedGenerator::new("unused")),
        )
        .unwrap();

        let result = ingestor.ingest(&manual()).await;

        assert!(matches!(result, Err(Error::EmbeddingService(_))));
    }

    #[tokio::test]
    async fn test_blank_document_is_rejected() {
        let ingestor = Ingestor::new(
            config(),
            Arc::new(LocalIndexCatalog::new()),
            Arc::new(HashingEmbedder::new(DIMS).unwrap()),
            Arc::new(ScriptedGenerator::new("unused")),
        )
        .unwrap();

        let blank = Document::from_pages("blank.txt", ["", " \n "]);
        let result = ingestor.ingest(&blank).await;

        assert!(matches!(result, Err(Error::EmptyDocument(id)) if id == "blank.txt"));
    }

    #[tokio::test]
    async fn test_blank_document_leaves_index_untouched() {
        let catalog = Arc::new(LocalIndexCatalog::new());
        let outdated = IndexSchema {
            name: config().index.name,
            dimensionality: 768,
            distance_metric: DistanceMetric::Cosine,
        };
        catalog.create_index(&outdated).await.unwrap();
        let ingestor = Ingestor::new(
            config(),
            catalog.clone(),
            Arc::new(HashingEmbedder::new(DIMS).unwrap()),
            Arc::new(ScriptedGenerator::new("unused")),
        )
        .unwrap();

        let blank = Document::from_pages("blank.txt", ["  "]);
        let result = ingestor.ingest(&blank).await;

        assert!(matches!(result, Err(Error::EmptyDocument(_))));
        let descriptor = catalog.describe_index(&outdated.name).await.unwrap().unwrap();
        assert_eq!(descriptor.dimensionality, 768);
    }

    #[tokio::test]
    async fn test_outdated_index_is_rebuilt_on_ingest() {
        let catalog = Arc::new(LocalIndexCatalog::new());
        let stale = IndexSchema {
            name: config().index.name,
            dimensionality: 768,
            distance_metric: DistanceMetric::Cosine,
        };
        catalog.create_index(&stale).await.unwrap();

        let ingestor = Ingestor::new(
            config(),
            catalog.clone(),
            Arc::new(HashingEmbedder::new(DIMS).unwrap()),
            Arc::new(ScriptedGenerator::new("ok")),
        )
        .unwrap();
        ingestor.ingest(&manual()).await.unwrap();

        let descriptor = catalog.describe_index(&stale.name).await.unwrap().unwrap();
        assert_eq!(descriptor.dimensionality, DIMS);
    }

    #[test]
    fn test_embedder_must_match_index_dimensionality() {
        let result = Ingestor::new(
            config(),
            Arc::new(LocalIndexCatalog::new()),
            Arc::new(HashingEmbedder::new(64).unwrap()),
            Arc::new(ScriptedGenerator::new("unused")),
        );

        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_single_chunk_store_returns_one_hit() {
        let embedder = Arc::new(HashingEmbedder::new(DIMS).unwrap());
        let store = Arc::new(LocalVectorStore::new(DIMS, DistanceMetric::Cosine));
        let chunk = Chunk {
            id: "faq.txt#p0c0".to_string(),
            text: "Opening hours are nine to five.".to_string(),
            source_document_id: "faq.txt".to_string(),
            page_index: 0,
            char_offset_range: 0..31,
            ordinal: 0,
        };
        let vector = embedder.embed(&[chunk.text.clone()]).await.unwrap().remove(0);
        store.upsert(vec![(chunk, vector)]).await.unwrap();

        let retriever = Retriever::new(embedder, store);
        let result = retriever.retrieve("unrelated question", 3).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.hits[0].chunk.id, "faq.txt#p0c0");
    }

    #[tokio::test]
    async fn test_load_text_document_from_disk() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "First page.\u{0C}Second page.\u{0C}").unwrap();

        let document = TextDocumentSource::new().load(file.path()).await.unwrap();

        let expected_id = file.path().file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(document.id, expected_id);
        assert_eq!(document.pages.len(), 2);
        assert_eq!(document.pages[1].text, "Second page.");
    }

    #[tokio::test]
    async fn test_pdf_pages_are_loaded_and_answerable() {
        let mut file = tempfile::Builder::new().suffix(".PDF").tempfile().unwrap();
        file.write_all(&pdf_bytes(&[
            "The warranty covers defects for two years.",
            "Clean the filter every month.",
        ]))
        .unwrap();

        let document = document_source_for(file.path()).load(file.path()).await.unwrap();

        assert_eq!(document.pages.len(), 2);
        assert!(document.pages[0].text.contains("two years"));
        assert!(document.pages[1].text.contains("Clean the filter"));

        let ingestor = Ingestor::new(
            config(),
            Arc::new(LocalIndexCatalog::new()),
            Arc::new(HashingEmbedder::new(DIMS).unwrap()),
            Arc::new(ScriptedGenerator::new("Monthly.")),
        )
        .unwrap();
        let kb = ingestor.ingest(&document).await.unwrap();
        assert_eq!(kb.report().pages, 2);

        let answer = kb.ask("How often do I clean the filter?").await.unwrap();
        assert!(answer.evidence.iter().any(|c| c.page_index == 1));
    }

    #[tokio::test]
    async fn test_non_pdf_extension_loads_as_text() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "%PDF-1.5 is just text here").unwrap();

        let document = document_source_for(file.path()).load(file.path()).await.unwrap();

        assert_eq!(document.pages.len(), 1);
        assert_eq!(document.pages[0].text, "%PDF-1.5 is just text here");
    }

    #[tokio::test]
    async fn test_missing_document_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let result = TextDocumentSource::new()
            .load(&dir.path().join("absent.txt"))
            .await;

        assert!(matches!(result, Err(Error::DocumentLoad(_))));
    }
}
