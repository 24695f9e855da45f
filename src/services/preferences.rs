use std::{collections::BTreeSet, sync::Arc};

use chrono::Utc;

use crate::{
    db::Store,
    error::AppResult,
    models::{PreferenceRecord, PreferenceRequest},
    services::{
        providers::{CatalogProvider, EmbeddingProvider},
        tags::TagResolver,
    },
};

const FRAGMENT_SEPARATOR: &str = "\n\n";

/// Turns stated favourites into a stored preference profile
///
/// Each favourite title is resolved to its first catalog match. The matches'
/// genres join the explicit tags and their synopses are joined into one
/// narrative, which is embedded as a whole.
#[derive(Clone)]
pub struct PreferenceExtractor {
    catalog: Arc<dyn CatalogProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    tags: TagResolver,
    store: Store,
}

impl PreferenceExtractor {
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

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Resolves, embeds and persists the preferences of `user_id`
    ///
    /// Nothing is written when a provider call fails.
    pub async fn derive_preferences(
        &self,
        user_id: &str,
        request: &PreferenceRequest,
    ) -> AppResult<PreferenceRecord> {
        request.validate()?;

        let favourite_titles = request.titles();
        let favourite_count = favourite_titles.len();
        let mut tags: BTreeSet<String> = request.explicit_tags();
        let mut fragments: Vec<String> = Vec::new();
        let mut unresolved = 0usize;

        for title in &favourite_titles {
            let Some(movie) = self.catalog.search_by_title(title).await? else {
                tracing::info!(user_id = %user_id, title = %title, "Favourite title not found, skipping");
                unresolved += 1;
                continue;
            };

            tags.extend(self.tags.resolve(&movie.tag_ids).await?);

            let synopsis = movie.overview.trim();
            if !synopsis.is_empty() {
                fragments.push(synopsis.to_string());
            }
        }

        let preference_text = fragments.join(FRAGMENT_SEPARATOR);
        let embedding = if preference_text.is_empty() {
            None
        } else {
            Some(self.embedder.embed(&preference_text).await?)
        };

        let record = PreferenceRecord {
            user_id: user_id.to_string(),
            tags,
            favourite_titles,
            year_range: request.year_range.unwrap_or_default(),
            rating_min: request.rating_min,
            preference_text,
            embedding,
            last_updated: Utc::now(),
        };

        self.store.set_preferences(&record).await?;

        tracing::info!(
            user_id = %user_id,
            resolved = favourite_count - unresolved,
            unresolved,
            narrative_chars = record.preference_text.len(),
            "Preferences derived"
        );

        Ok(record)
    }
}
