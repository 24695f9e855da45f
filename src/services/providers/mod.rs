/// External provider abstractions
///
/// The matching engine depends on two collaborators: a movie catalog (search,
/// trending lists, genre names) and a text model (embeddings, free-text
/// answers). Both sit behind traits so the engine can be driven by fakes in
/// tests and by other vendors in production.
use std::collections::HashMap;

use crate::{error::AppResult, models::MovieSummary};

pub mod openai;
pub mod retry;
pub mod tmdb;

pub use openai::OpenAiClient;
pub use retry::{RateLimiter, RetryPolicy};
pub use tmdb::TmdbProvider;

/// Source of movie metadata
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Best match for a free-text title, `None` when the provider has no result
    async fn search_by_title(&self, query: &str) -> AppResult<Option<MovieSummary>>;

    /// One page of currently trending movies; pages start at 1
    async fn trending_page(&self, page: u32) -> AppResult<Vec<MovieSummary>>;

    /// Mapping of tag (genre) ids to display names
    async fn tag_table(&self) -> AppResult<HashMap<u32, String>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Maps text to a fixed-length vector
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>>;
}

/// Answers open-ended questions in the assistant's voice
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    async fn answer(&self, question: &str) -> AppResult<String>;
}
