use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use reelmatch_api::{
    db::{create_memory_pool, Store},
    error::AppResult,
    models::MovieSummary,
    routes::{create_router, AppState},
    services::{
        providers::{CatalogProvider, ChatModel, EmbeddingProvider},
        CatalogIngestor, PreferenceExtractor, Recommender, TagResolver,
    },
};

const KEYWORDS: [&str; 4] = ["space", "dream", "love", "haunted"];

fn movie(id: i64, title: &str, overview: &str, year: &str, rating: f64, tag_ids: &[u32]) -> MovieSummary {
    MovieSummary {
        id,
        title: title.to_string(),
        overview: overview.to_string(),
        release_date: Some(format!("{}-06-01", year)),
        rating: Some(rating),
        popularity: Some(100.0),
        poster_path: None,
        tag_ids: tag_ids.to_vec(),
    }
}

fn trending() -> Vec<MovieSummary> {
    vec![
        movie(27205, "Inception", "A thief steals secrets through dream sharing.", "2010", 8.4, &[28, 878]),
        movie(157336, "Interstellar", "Explorers travel through space to save humanity.", "2014", 8.4, &[12, 18, 878]),
        movie(11036, "The Notebook", "A love story across decades.", "2004", 7.9, &[10749, 18]),
        movie(493922, "Hereditary", "A grieving family in a haunted house.", "2018", 7.3, &[27]),
        movie(329865, "Arrival", "Linguists decode a message from space.", "2016", 7.6, &[18, 878]),
        movie(49047, "Gravity", "Astronauts stranded in space.", "2013", 7.2, &[878]),
        movie(438631, "Dune", "A desert planet and a space empire.", "2021", 7.8, &[12, 878]),
        movie(1, "Untitled", "", "2024", 5.0, &[]),
    ]
}

struct FakeCatalog;

#[async_trait::async_trait]
impl CatalogProvider for FakeCatalog {
    async fn search_by_title(&self, query: &str) -> AppResult<Option<MovieSummary>> {
        Ok(trending()
            .into_iter()
            .find(|m| m.title.eq_ignore_ascii_case(query)))
    }

    async fn trending_page(&self, page: u32) -> AppResult<Vec<MovieSummary>> {
        Ok(if page == 1 { trending() } else { Vec::new() })
    }

    async fn tag_table(&self) -> AppResult<HashMap<u32, String>> {
        Ok(HashMap::from([
            (12, "Adventure".to_string()),
            (18, "Drama".to_string()),
            (27, "Horror".to_string()),
            (28, "Action".to_string()),
            (878, "Science Fiction".to_string()),
            (10749, "Romance".to_string()),
        ]))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Counts keyword occurrences, plus a small constant so no vector is all zeros
struct KeywordEmbedder;

#[async_trait::async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let text = text.to_lowercase();
        Ok(KEYWORDS
            .iter()
            .map(|k| text.matches(k).count() as f32 + 0.1)
            .collect())
    }
}

struct EchoChat;

#[async_trait::async_trait]
impl ChatModel for EchoChat {
    async fn answer(&self, question: &str) -> AppResult<String> {
        Ok(format!("You asked: {}", question))
    }
}

struct TestApp {
    server: TestServer,
    ingestor: CatalogIngestor,
}

async fn create_test_app() -> TestApp {
    let store = Store::new(create_memory_pool().await.unwrap());
    let catalog: Arc<dyn CatalogProvider> = Arc::new(FakeCatalog);
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(KeywordEmbedder);
    let tags = TagResolver::new(catalog.clone(), Duration::from_secs(60));

    let ingestor = CatalogIngestor::new(catalog.clone(), embedder.clone(), tags.clone(), store.clone());
    let state = Arc::new(AppState {
        store: store.clone(),
        extractor: PreferenceExtractor::new(catalog, embedder, tags, store.clone()),
        recommender: Recommender::new(store),
        chat: Arc::new(EchoChat),
        max_question_length: 512,
    });

    TestApp {
        server: TestServer::new(create_router(state)).unwrap(),
        ingestor,
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app().await;
    let response = app.server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["catalog_size"], 0);
}

#[tokio::test]
async fn test_every_response_carries_a_request_id() {
    let app = create_test_app().await;

    let generated = app.server.get("/health").await;
    assert!(!generated.header("x-request-id").is_empty());

    let not_found = app.server.get("/api/v1/users/ghost").await;
    not_found.assert_status(StatusCode::NOT_FOUND);
    assert!(!not_found.header("x-request-id").is_empty());

    let echoed = app
        .server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("chat-7-update-99"),
        )
        .await;
    assert_eq!(echoed.header("x-request-id"), "chat-7-update-99");
}

#[tokio::test]
async fn test_create_user_is_idempotent() {
    let app = create_test_app().await;

    let first = app
        .server
        .post("/api/v1/users")
        .json(&json!({ "user_id": "42", "name": "Ada", "handle": "ada" }))
        .await;
    first.assert_status_ok();
    let first: Value = first.json();

    let second = app
        .server
        .post("/api/v1/users")
        .json(&json!({ "user_id": "42" }))
        .await;
    second.assert_status_ok();
    let second: Value = second.json();

    assert_eq!(second["name"], "Ada");
    assert_eq!(second["created_at"], first["created_at"]);

    let fetched: Value = app.server.get("/api/v1/users/42").await.json();
    assert_eq!(fetched["handle"], "ada");
}

#[tokio::test]
async fn test_blank_user_id_is_rejected() {
    let app = create_test_app().await;
    let response = app
        .server
        .post("/api/v1/users")
        .json(&json!({ "user_id": "  " }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_question_is_answered() {
    let app = create_test_app().await;
    let response = app
        .server
        .post("/question")
        .json(&json!({ "text": "What should I watch tonight?" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["answer"], "You asked: What should I watch tonight?");
}

#[tokio::test]
async fn test_question_length_is_validated() {
    let app = create_test_app().await;

    let empty = app.server.post("/question").json(&json!({ "text": "" })).await;
    empty.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = empty.json();
    assert!(body["error"].is_string());

    let too_long = app
        .server
        .post("/question")
        .json(&json!({ "text": "a".repeat(513) }))
        .await;
    too_long.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let at_limit = app
        .server
        .post("/question")
        .json(&json!({ "text": "a".repeat(512) }))
        .await;
    at_limit.assert_status_ok();

    let wrong_type = app.server.post("/question").json(&json!({ "text": 42 })).await;
    wrong_type.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_missing_preferences_return_not_found() {
    let app = create_test_app().await;
    let response = app.server.get("/api/v1/users/nobody/preferences").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("nobody"));
}

#[tokio::test]
async fn test_suggestions_without_preferences_prompt_for_them() {
    let app = create_test_app().await;
    app.ingestor.ingest(1).await;

    let response = app
        .server
        .post("/api/v1/users/newcomer/suggestions")
        .json(&json!({}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["suggestions"], json!([]));
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_invalid_preferences_are_rejected() {
    let app = create_test_app().await;

    let empty = app
        .server
        .put("/api/v1/users/7/preferences")
        .json(&json!({ "favourite_titles": [], "tags": [] }))
        .await;
    empty.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let reversed = app
        .server
        .put("/api/v1/users/7/preferences")
        .json(&json!({ "favourite_titles": ["Inception"], "year_range": [2020, 1990] }))
        .await;
    reversed.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    app.server
        .get("/api/v1/users/7/preferences")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_body_rejections_use_the_error_envelope() {
    let app = create_test_app().await;

    let reversed = app
        .server
        .put("/api/v1/users/7/preferences")
        .json(&json!({ "favourite_titles": ["Inception"], "year_range": [2020, 1990] }))
        .await;
    reversed.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reversed.header("content-type"), "application/json");
    let body: Value = reversed.json();
    assert!(body["error"].as_str().unwrap().contains("Year range start 2020 is after end 1990"));

    let unknown_field = app
        .server
        .post("/api/v1/users/7/suggestions")
        .json(&json!({ "genres": ["Horror"] }))
        .await;
    unknown_field.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = unknown_field.json();
    assert!(body["error"].is_string());

    let wrong_type = app
        .server
        .post("/api/v1/users")
        .json(&json!({ "user_id": 42 }))
        .await;
    wrong_type.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = wrong_type.json();
    assert!(body["error"].is_string());

    let missing_body = app.server.post("/question").await;
    missing_body.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = missing_body.json();
    assert!(body["error"].is_string());

    let malformed = app
        .server
        .post("/question")
        .content_type("application/json")
        .bytes("{\"text\": ".into())
        .await;
    malformed.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = malformed.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_preferences_drive_ranked_suggestions() {
    let app = create_test_app().await;

    let report = app.ingestor.ingest(2).await;
    assert_eq!(report.inserted, 7);
    assert_eq!(report.skipped, 1);

    let stored = app
        .server
        .put("/api/v1/users/42/preferences")
        .json(&json!({
            "favourite_titles": ["Inception", "Interstellar"],
            "rating_min": 7.0
        }))
        .await;
    stored.assert_status_ok();
    let stored: Value = stored.json();
    let tags: Vec<&str> = stored["tags"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(tags.contains(&"Science Fiction"));

    let with_embedding: Value = app
        .server
        .get("/api/v1/users/42/preferences?include_embedding=true")
        .await
        .json();
    assert_eq!(with_embedding["embedding"].as_array().unwrap().len(), KEYWORDS.len());

    let without_embedding: Value = app.server.get("/api/v1/users/42/preferences").await.json();
    assert!(without_embedding.get("embedding").is_none());

    let response = app
        .server
        .post("/api/v1/users/42/suggestions")
        .json(&json!({}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let suggestions = body["suggestions"].as_array().unwrap();

    assert!(!suggestions.is_empty() && suggestions.len() <= 5);
    assert!(body.get("message").is_none());
    let scores: Vec<f64> = suggestions
        .iter()
        .map(|s| s["similarity"].as_f64().unwrap())
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert!(scores.iter().all(|s| (-1.0..=1.0).contains(s)));
}

#[tokio::test]
async fn test_suggestion_filters_are_applied() {
    let app = create_test_app().await;
    app.ingestor.ingest(1).await;

    app.server
        .put("/api/v1/users/42/preferences")
        .json(&json!({ "favourite_titles": ["Interstellar"] }))
        .await
        .assert_status_ok();

    let response = app
        .server
        .post("/api/v1/users/42/suggestions")
        .json(&json!({ "tags": ["Horror", "Romance"], "year_range": [2000, 2010], "limit": 10 }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let titles: Vec<&str> = body["suggestions"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["The Notebook"]);

    let over_limit = app
        .server
        .post("/api/v1/users/42/suggestions")
        .json(&json!({ "limit": 51 }))
        .await;
    over_limit.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_health_reports_catalog_size_after_ingestion() {
    let app = create_test_app().await;
    app.ingestor.ingest(1).await;

    let body: Value = app.server.get("/health").await.json();
    assert_eq!(body["catalog_size"], 7);
}
