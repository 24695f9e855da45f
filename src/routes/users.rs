use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use super::{AppJson, AppState};
use crate::{
    error::{AppError, AppResult},
    models::{validate_user_id, NewUser, User},
};

/// Registers a user; repeating the call with the same id is harmless
pub async fn create(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<NewUser>,
) -> AppResult<Json<User>> {
    validate_user_id(&request.user_id)?;
    let user = state.store.create_user(&request).await?;
    Ok(Json(user))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<User>> {
    validate_user_id(&user_id)?;
    state
        .store
        .get_user(&user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
}
