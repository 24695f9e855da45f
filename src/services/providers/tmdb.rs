/// TMDB (The Movie Database) catalog provider
///
/// API Flow:
/// 1. Title search: /search/movie → first result is taken as the match
/// 2. Trending: /trending/movie/day?page=N → one page of trending movies
/// 3. Genres: /genre/movie/list → genre id to name table
///
/// Requests authenticate with a v4 read access token sent as a bearer token.
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{MovieSummary, TmdbGenreList, TmdbPage},
    services::providers::{CatalogProvider, RateLimiter, RetryPolicy},
};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::{collections::HashMap, sync::Arc, time::Duration};

const PROVIDER: &str = "tmdb";
const SEARCH_CACHE_TTL: u64 = 3600; // 1 hour
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    language: String,
    cache: Cache,
    retry: RetryPolicy,
    limiter: Arc<RateLimiter>,
}

impl TmdbProvider {
    pub fn new(
        cache: Cache,
        api_key: String,
        api_url: String,
        language: String,
        retry: RetryPolicy,
        min_interval: Duration,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            language,
            cache,
            retry,
            limiter: Arc::new(RateLimiter::new(min_interval)),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Issues a GET through the rate limiter and retry policy and decodes the body
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        let url = self.endpoint(path);
        let url = url.as_str();

        self.retry
            .run(path, || async move {
                self.limiter.acquire().await;

                let response = self
                    .http_client
                    .get(url)
                    .bearer_auth(&self.api_key)
                    .header("accept", "application/json")
                    .query(&[("language", self.language.as_str())])
                    .query(params)
                    .send()
                    .await?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(AppError::ProviderStatus {
                        provider: PROVIDER,
                        status: status.as_u16(),
                        body,
                    });
                }

                let body = response.text().await?;
                serde_json::from_str::<T>(&body).map_err(|e| {
                    tracing::error!(path, error = %e, "Failed to deserialize TMDB response");
                    AppError::ExternalApi(format!("Failed to parse TMDB response: {}", e))
                })
            })
            .await
    }

    async fn fetch_first_match(&self, query: &str) -> AppResult<Option<MovieSummary>> {
        let page: TmdbPage = self
            .get_json(
                "/search/movie",
                &[("query", query.to_string()), ("page", "1".to_string())],
            )
            .await?;

        let result_count = page.results.len();
        let first = page.results.into_iter().next().map(MovieSummary::from);

        tracing::info!(
            query = %query,
            results = result_count,
            matched = first.as_ref().map(|m| m.title.as_str()).unwrap_or("<none>"),
            provider = PROVIDER,
            "Title search completed"
        );

        Ok(first)
    }
}

#[async_trait::async_trait]
impl CatalogProvider for TmdbProvider {
    async fn search_by_title(&self, query: &str) -> AppResult<Option<MovieSummary>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let movie: Option<MovieSummary> = cached!(
            self.cache,
            CacheKey::TitleSearch(query.to_string()),
            SEARCH_CACHE_TTL,
            self.fetch_first_match(query)
        );
        Ok(movie)
    }

    async fn trending_page(&self, page: u32) -> AppResult<Vec<MovieSummary>> {
        let response: TmdbPage = self
            .get_json("/trending/movie/day", &[("page", page.to_string())])
            .await?;

        let movies: Vec<MovieSummary> = response
            .results
            .into_iter()
            .map(MovieSummary::from)
            .collect();

        tracing::info!(page, movies = movies.len(), provider = PROVIDER, "Trending page fetched");
        Ok(movies)
    }

    async fn tag_table(&self) -> AppResult<HashMap<u32, String>> {
        let genres: TmdbGenreList = self.get_json("/genre/movie/list", &[]).await?;
        let table: HashMap<u32, String> = genres.into();

        tracing::info!(genres = table.len(), provider = PROVIDER, "Genre table fetched");
        Ok(table)
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}
