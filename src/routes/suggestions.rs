use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::{AppJson, AppState};
use crate::{
    error::AppResult,
    models::validate_user_id,
    services::{ScoredItem, SuggestionRequest, Suggestions},
};

const NEEDS_PREFERENCES_MESSAGE: &str =
    "No preferences stored yet. Tell me a few movies you love so I can suggest something similar.";

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<ScoredItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl From<Suggestions> for SuggestionsResponse {
    fn from(suggestions: Suggestions) -> Self {
        match suggestions {
            Suggestions::NeedsPreferences => Self {
                suggestions: Vec::new(),
                message: Some(NEEDS_PREFERENCES_MESSAGE),
            },
            Suggestions::Ranked(suggestions) => Self {
                suggestions,
                message: None,
            },
        }
    }
}

/// Handler for the suggestions endpoint; the body may be `{}` for no filters
pub async fn suggest(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    AppJson(request): AppJson<SuggestionRequest>,
) -> AppResult<Json<SuggestionsResponse>> {
    validate_user_id(&user_id)?;
    let suggestions = state.recommender.suggest(&user_id, &request).await?;
    Ok(Json(suggestions.into()))
}
