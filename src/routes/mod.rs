use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    db::Store,
    error::AppResult,
    middleware::{make_span_with_request_id, request_id_middleware},
    services::{providers::ChatModel, PreferenceExtractor, Recommender},
};

mod json;
pub mod preferences;
pub mod question;
pub mod suggestions;
pub mod users;

pub use json::AppJson;

/// Collaborators shared by every handler
pub struct AppState {
    pub store: Store,
    pub extractor: PreferenceExtractor,
    pub recommender: Recommender,
    pub chat: Arc<dyn ChatModel>,
    pub max_question_length: usize,
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/question", post(question::ask))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(users::create))
        .route("/users/:user_id", get(users::get))
        .route(
            "/users/:user_id/preferences",
            get(preferences::get).put(preferences::store),
        )
        .route("/users/:user_id/suggestions", post(suggestions::suggest))
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    let catalog_size = state.store.catalog_size().await?;
    Ok(Json(json!({ "status": "healthy", "catalog_size": catalog_size })))
}
