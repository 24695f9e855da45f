use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use reelmatch_api::{
    config::Config,
    db::{create_pool, create_redis_client, Cache, Store},
    routes::{create_router, AppState},
    services::{
        providers::{CatalogProvider, ChatModel, EmbeddingProvider, OpenAiClient, RetryPolicy, TmdbProvider},
        spawn_ingest_schedule, CatalogIngestor, PreferenceExtractor, Recommender, TagResolver,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("reelmatch_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(database_url = %config.database_url, "Starting reelmatch-api");

    let pool = create_pool(&config.database_url).await?;
    let store = Store::new(pool);

    let (cache, cache_writer) = match &config.redis_url {
        Some(url) => {
            let (cache, handle) = Cache::new(create_redis_client(url)?);
            tracing::info!("Redis cache enabled");
            (cache, Some(handle))
        }
        None => {
            tracing::info!("REDIS_URL not set, provider responses are not cached");
            (Cache::disabled(), None)
        }
    };

    let retry = RetryPolicy::default().with_max_attempts(config.provider_max_attempts);
    let min_interval = Duration::from_millis(config.provider_min_interval_ms);

    let tmdb: Arc<dyn CatalogProvider> = Arc::new(
        TmdbProvider::new(
            cache.clone(),
            config.tmdb_api_key.clone(),
            config.tmdb_api_url.clone(),
            config.tmdb_language.clone(),
            retry.clone(),
            min_interval,
        )
        .context("Failed to build TMDB client")?,
    );
    let llm = Arc::new(
        OpenAiClient::new(
            cache.clone(),
            config.llm_api_key.clone(),
            config.llm_api_url.clone(),
            config.embedding_model.clone(),
            config.chat_model.clone(),
            retry,
            min_interval,
        )
        .context("Failed to build LLM client")?,
    );
    let embedder: Arc<dyn EmbeddingProvider> = llm.clone();
    let chat: Arc<dyn ChatModel> = llm;

    let tags = TagResolver::new(tmdb.clone(), Duration::from_secs(config.tag_cache_ttl_secs));

    let ingestor = CatalogIngestor::new(tmdb.clone(), embedder.clone(), tags.clone(), store.clone());
    let scheduler = spawn_ingest_schedule(
        ingestor,
        config.ingest_pages,
        Duration::from_secs(config.ingest_interval_secs),
    );

    let state = Arc::new(AppState {
        store: store.clone(),
        extractor: PreferenceExtractor::new(tmdb, embedder, tags, store.clone()),
        recommender: Recommender::new(store),
        chat,
        max_question_length: config.max_question_length,
    });

    let app = create_router(state);

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!(address = %bind_address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await;
    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
