use clap::Parser;
use snippetd::api::{ApiState, start_http_server};
use snippetd::chat::{ChatOrchestrator, FallbackGenerator};
use snippetd::config::Settings;
use snippetd::embedding::{EmbeddingCache, EmbeddingProvider, TextEmbedder};
use snippetd::index::SnippetIndexer;
use snippetd::search::HybridSearcher;
use snippetd::store::{SearchStore, TypesenseClient};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snippetd", about = "Embedding, hybrid search, and RAG service")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured bind address.
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("snippetd=info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let bind = cli.bind.unwrap_or(settings.api.bind);

    tracing::info!("initializing services");

    // Fail fast: the service must not accept traffic unless the embedding
    // backend loaded and the search engine is reachable.
    let mut provider = EmbeddingProvider::new(settings.embedding.clone());
    provider.initialize().await?;
    let provider: Arc<dyn TextEmbedder> = Arc::new(provider);

    let embedder = Arc::new(EmbeddingCache::new(provider, &settings.embedding.cache));

    let store = Arc::new(TypesenseClient::new(
        &settings.store,
        settings.embedding.dimension,
    )?);
    if !store.health().await {
        anyhow::bail!(
            "search engine is unreachable at {}",
            settings.store.base_url()
        );
    }

    let store: Arc<dyn SearchStore> = store;
    let searcher = HybridSearcher::new(store.clone(), embedder.clone());
    let indexer = Arc::new(SnippetIndexer::new(embedder.clone(), store.clone()));

    let generator = Arc::new(FallbackGenerator::from_config(&settings.llm));
    let chat = ChatOrchestrator::new(
        embedder.clone(),
        store.clone(),
        generator,
        settings.llm.system_prompt.clone(),
        settings.llm.default_k,
    );

    tracing::info!("services initialized");

    let state = Arc::new(ApiState {
        api_key: settings.api.api_key.clone(),
        require_auth: settings.api.require_auth,
        embedder,
        store,
        searcher,
        indexer,
        chat,
    });

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let (_, server) = start_http_server(bind, state, shutdown_rx).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    let _ = shutdown_tx.send(true);
    server.await?;

    Ok(())
}
