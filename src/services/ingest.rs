use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    db::Store,
    error::AppResult,
    models::{CatalogItem, MovieSummary},
    services::{
        providers::{CatalogProvider, EmbeddingProvider},
        tags::TagResolver,
    },
};

/// Counters describing one ingestion run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub pages_fetched: u32,
    pub pages_failed: u32,
    pub inserted: usize,
    /// Already stored, or without a synopsis to embed
    pub skipped: usize,
    pub failed: usize,
}

enum Outcome {
    Inserted,
    Skipped,
}

/// Pulls trending movies from the catalog provider into the local catalog
#[derive(Clone)]
pub struct CatalogIngestor {
    catalog: Arc<dyn CatalogProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    tags: TagResolver,
    store: Store,
}

impl CatalogIngestor {
    pub fn new(
        catalog: Arc<dyn CatalogProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        tags: TagResolver,
        store: Store,
    ) -> Self {
        Self {
            catalog,
            embedder,
            tags,
            store,
        }
    }

    /// Ingests trending pages `1..=pages`
    ///
    /// A page that cannot be fetched or an item that cannot be embedded is
    /// logged and skipped; the run always continues with the next one.
    pub async fn ingest(&self, pages: u32) -> IngestReport {
        let mut report = IngestReport::default();
        tracing::info!(pages, provider = self.catalog.name(), "Catalog ingestion started");

        for page in 1..=pages {
            let movies = match self.catalog.trending_page(page).await {
                Ok(movies) => movies,
                Err(e) => {
                    tracing::warn!(page, error = %e, "Failed to fetch trending page, skipping");
                    report.pages_failed += 1;
                    continue;
                }
            };
            report.pages_fetched += 1;

            for movie in movies {
                let movie_id = movie.id;
                match self.ingest_movie(movie).await {
                    Ok(Outcome::Inserted) => report.inserted += 1,
                    Ok(Outcome::Skipped) => report.skipped += 1,
                    Err(e) => {
                        tracing::warn!(page, movie_id, error = %e, "Failed to ingest movie, skipping");
                        report.failed += 1;
                    }
                }
            }
        }

        tracing::info!(
            pages_fetched = report.pages_fetched,
            pages_failed = report.pages_failed,
            inserted = report.inserted,
            skipped = report.skipped,
            failed = report.failed,
            "Catalog ingestion finished"
        );

        report
    }

    async fn ingest_movie(&self, movie: MovieSummary) -> AppResult<Outcome> {
        if self.store.catalog_item_exists(movie.id).await? {
            return Ok(Outcome::Skipped);
        }

        if movie.overview.trim().is_empty() {
            tracing::debug!(movie_id = movie.id, title = %movie.title, "Movie has no synopsis");
            return Ok(Outcome::Skipped);
        }

        let tags = self.tags.resolve(&movie.tag_ids).await?;
        let embedding = self.embedder.embed(&movie.overview).await?;
        let item = CatalogItem::from_summary(movie, tags, embedding);

        // A concurrent run may have inserted the same id since the existence check
        if self.store.upsert_catalog_item(&item).await? {
            tracing::debug!(movie_id = item.id, title = %item.title, "Movie added to catalog");
            Ok(Outcome::Inserted)
        } else {
            Ok(Outcome::Skipped)
        }
    }
}

/// Handle for stopping the periodic ingestion task
pub struct IngestSchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl IngestSchedulerHandle {
    /// Signals the scheduler and waits for the task to exit
    ///
    /// An in-flight run is abandoned at its next await point. Each item is
    /// stored with a single insert, so the catalog never holds partial rows.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Ingestion scheduler task ended abnormally");
        }
    }
}

/// Runs an ingestion immediately, then once every `interval`, until shut down
pub fn spawn_ingest_schedule(
    ingestor: CatalogIngestor,
    pages: u32,
    interval: Duration,
) -> IngestSchedulerHandle {
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

    let task = tokio::spawn(async move {
        // tokio rejects a zero period
        let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(pages, interval_secs = interval.as_secs(), "Ingestion scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = ingestor.ingest(pages) => {}
                        _ = shutdown_rx.recv() => {
                            tracing::info!("Ingestion run interrupted by shutdown");
                            break;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Ingestion scheduler stopped");
                    break;
                }
            }
        }
    });

    IngestSchedulerHandle { shutdown_tx, task }
}
