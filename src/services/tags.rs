use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{sync::RwLock, time::Instant};

use crate::{error::AppResult, services::providers::CatalogProvider};

type TagTable = Arc<HashMap<u32, String>>;

/// Resolves tag ids to names through an in-process copy of the provider's
/// tag table, refreshed once it is older than `ttl`
#[derive(Clone)]
pub struct TagResolver {
    provider: Arc<dyn CatalogProvider>,
    ttl: Duration,
    cached: Arc<RwLock<Option<(Instant, TagTable)>>>,
}

impl TagResolver {
    pub fn new(provider: Arc<dyn CatalogProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// Names for `ids` in the given order; ids missing from the table are dropped
    pub async fn resolve(&self, ids: &[u32]) -> AppResult<Vec<String>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let table = self.table().await?;
        Ok(ids.iter().filter_map(|id| table.get(id).cloned()).collect())
    }

    async fn table(&self) -> AppResult<TagTable> {
        if let Some(table) = self.fresh(&*self.cached.read().await) {
            return Ok(table);
        }

        let mut cached = self.cached.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(table) = self.fresh(&cached) {
            return Ok(table);
        }

        let table = Arc::new(self.provider.tag_table().await?);
        tracing::info!(
            tags = table.len(),
            provider = self.provider.name(),
            "Tag table refreshed"
        );
        *cached = Some((Instant::now(), table.clone()));
        Ok(table)
    }

    fn fresh(&self, cached: &Option<(Instant, TagTable)>) -> Option<TagTable> {
        match cached {
            Some((fetched_at, table)) if fetched_at.elapsed() < self.ttl => Some(table.clone()),
            _ => None,
        }
    }
}
