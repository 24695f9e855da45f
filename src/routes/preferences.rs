use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{AppJson, AppState};
use crate::{
    error::{AppError, AppResult},
    models::{validate_user_id, PreferenceRecord, PreferenceRequest},
};

#[derive(Debug, Deserialize)]
pub struct PreferencesQuery {
    #[serde(default)]
    include_embedding: bool,
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(params): Query<PreferencesQuery>,
) -> AppResult<Json<PreferenceRecord>> {
    validate_user_id(&user_id)?;
    state
        .store
        .get_preferences(&user_id, params.include_embedding)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No preferences stored for user {}", user_id)))
}

/// Derives and stores preferences from favourite titles and tags
pub async fn store(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    AppJson(request): AppJson<PreferenceRequest>,
) -> AppResult<Json<PreferenceRecord>> {
    validate_user_id(&user_id)?;
    let mut record = state.extractor.derive_preferences(&user_id, &request).await?;
    record.embedding = None;
    Ok(Json(record))
}
