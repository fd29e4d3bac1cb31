use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docqa_cli::{ChatDriver, TerminalInput, display_banner};
use docqa_core::{
    Document, DocumentSource, EmbeddingGateway, Generator, IndexAdmin, PipelineConfig,
};
use docqa_gemini::{GeminiClient, GeminiEmbedder, GeminiGenerator};
use docqa_rag::{
    HashingEmbedder, Ingestor, LocalIndexCatalog, QdrantConfig, QdrantIndexAdmin,
    document_source_for,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    /// Qdrant collection (QDRANT_URL, QDRANT_API_KEY)
    Qdrant,
    /// In-process index, lost on exit
    Local,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Embedder {
    /// Gemini embedding model
    Gemini,
    /// Offline feature hashing, no API calls
    Hashing,
}

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Ask questions about a document", long_about = None)]
struct Cli {
    /// PDF, or text file whose pages are separated by form feeds
    document: PathBuf,

    /// Where embeddings are stored
    #[arg(long, value_enum, default_value_t = Backend::Qdrant)]
    backend: Backend,

    /// How chunks and questions are embedded
    #[arg(long, value_enum, default_value_t = Embedder::Gemini)]
    embedder: Embedder,

    /// Answer a single question and exit
    #[arg(short, long)]
    question: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env().context("invalid pipeline configuration")?;

    let document = document_source_for(&cli.document)
        .load(&cli.document)
        .await
        .with_context(|| format!("could not load {}", cli.document.display()))?;
    info!(document = %document.id, pages = document.pages.len(), "loaded document");

    let gemini = Arc::new(GeminiClient::from_env()?);
    let generator = Arc::new(GeminiGenerator::new(gemini.clone(), &config.generation));

    match (cli.backend, cli.embedder) {
        (Backend::Qdrant, Embedder::Gemini) => {
            let admin = Arc::new(QdrantIndexAdmin::new(&QdrantConfig::from_env())?);
            let embedder = Arc::new(GeminiEmbedder::new(gemini, &config.embedding));
            run(&cli, config, &document, admin, embedder, generator).await
        }
        (Backend::Qdrant, Embedder::Hashing) => {
            let admin = Arc::new(QdrantIndexAdmin::new(&QdrantConfig::from_env())?);
            let embedder = Arc::new(HashingEmbedder::new(config.embedding.dimensionality)?);
            run(&cli, config, &document, admin, embedder, generator).await
        }
        (Backend::Local, Embedder::Gemini) => {
            let admin = Arc::new(LocalIndexCatalog::new());
            let embedder = Arc::new(GeminiEmbedder::new(gemini, &config.embedding));
            run(&cli, config, &document, admin, embedder, generator).await
        }
        (Backend::Local, Embedder::Hashing) => {
            let admin = Arc::new(LocalIndexCatalog::new());
            let embedder = Arc::new(HashingEmbedder::new(config.embedding.dimensionality)?);
            run(&cli, config, &document, admin, embedder, generator).await
        }
    }
}

/// Ingest the document, then answer one question or start the chat loop
async fn run<A, E, G>(
    cli: &Cli,
    config: PipelineConfig,
    document: &Document,
    admin: Arc<A>,
    embedder: Arc<E>,
    generator: Arc<G>,
) -> Result<()>
where
    A: IndexAdmin,
    E: EmbeddingGateway + 'static,
    G: Generator + 'static,
{
    let embedding_model = embedder.model_id().to_string();
    let generation_model = generator.model_id().to_string();

    let ingestor = Ingestor::new(config, admin, embedder, generator)?;
    let knowledge_base = ingestor
        .ingest(document)
        .await
        .context("ingestion failed, no questions can be answered")?;

    let driver = ChatDriver::new(&knowledge_base);
    let mut stdout = io::stdout();

    if let Some(question) = &cli.question {
        driver.ask_once(question, &mut stdout).await?;
        return Ok(());
    }

    display_banner(
        &document.id,
        &format!("{} + {}", generation_model, embedding_model),
    );
    let mut input = TerminalInput::for_stdin();
    driver.run(input.as_mut(), &mut stdout).await?;
    Ok(())
}
