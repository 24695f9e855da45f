use serde::Deserialize;

use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::{CatalogFilter, YearRange},
    services::similarity::{rank, ScoredItem},
};

pub const DEFAULT_LIMIT: usize = 5;
pub const MAX_LIMIT: usize = 50;

/// Optional filters narrowing a suggestion request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuggestionRequest {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub year_range: Option<YearRange>,
    /// Falls back to the floor stored with the user's preferences
    #[serde(default)]
    pub rating_min: Option<f64>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SuggestionRequest {
    fn limit(&self) -> AppResult<usize> {
        match self.limit {
            None => Ok(DEFAULT_LIMIT),
            Some(limit) if (1..=MAX_LIMIT).contains(&limit) => Ok(limit),
            Some(limit) => Err(AppError::InvalidInput(format!(
                "Limit must be between 1 and {}, got {}",
                MAX_LIMIT, limit
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Suggestions {
    /// The user has no preference embedding yet
    NeedsPreferences,
    Ranked(Vec<ScoredItem>),
}

/// Ranks the local catalog against a user's stored preference embedding
#[derive(Clone)]
pub struct Recommender {
    store: Store,
}

impl Recommender {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn suggest(&self, user_id: &str, request: &SuggestionRequest) -> AppResult<Suggestions> {
        let limit = request.limit()?;
        if let Some(rating) = request.rating_min {
            if !rating.is_finite() {
                return Err(AppError::InvalidInput(
                    "Minimum rating must be a finite number".to_string(),
                ));
            }
        }

        let preferences = self.store.get_preferences(user_id, true).await?;
        let Some((embedding, stored_rating_min)) =
            preferences.and_then(|p| p.embedding.map(|e| (e, p.rating_min)))
        else {
            tracing::info!(user_id = %user_id, "No preference embedding, suggestions skipped");
            return Ok(Suggestions::NeedsPreferences);
        };

        let filter = CatalogFilter {
            tags: request
                .tags
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            year_range: request.year_range,
            rating_min: request.rating_min.or(stored_rating_min),
        };

        let candidates = self.store.query_catalog(&filter).await?;
        let candidate_count = candidates.len();
        let ranked = rank(&embedding, candidates, limit);

        tracing::info!(
            user_id = %user_id,
            candidates = candidate_count,
            returned = ranked.len(),
            top_similarity = ranked.first().map(|s| s.similarity),
            "Suggestions ranked"
        );

        Ok(Suggestions::Ranked(ranked))
    }
}
