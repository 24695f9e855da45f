use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// SQLite database connection URL
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Redis connection URL; provider response caching is disabled when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// TMDB API read access token
    pub tmdb_api_key: String,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Language requested from TMDB for titles, synopses and genre names
    #[serde(default = "default_tmdb_language")]
    pub tmdb_language: String,

    /// OpenAI-compatible API base URL (embeddings and chat completions)
    #[serde(default = "default_llm_api_url")]
    pub llm_api_url: String,

    /// API key for the OpenAI-compatible endpoint
    #[serde(default = "default_llm_api_key")]
    pub llm_api_key: String,

    /// Model used to embed synopses and preference narratives
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Model used to answer free-text questions
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Trending pages fetched per ingestion run
    #[serde(default = "default_ingest_pages")]
    pub ingest_pages: u32,

    /// Seconds between ingestion runs
    #[serde(default = "default_ingest_interval_secs")]
    pub ingest_interval_secs: u64,

    /// Seconds the genre table stays cached before it is refetched
    #[serde(default = "default_tag_cache_ttl_secs")]
    pub tag_cache_ttl_secs: u64,

    /// Attempts per outbound provider call, including the first one
    #[serde(default = "default_provider_max_attempts")]
    pub provider_max_attempts: u32,

    /// Minimum spacing between outbound calls to the same provider
    #[serde(default = "default_provider_min_interval_ms")]
    pub provider_min_interval_ms: u64,

    /// Maximum accepted length of a free-text question
    #[serde(default = "default_max_question_length")]
    pub max_question_length: usize,
}

fn default_database_url() -> String {
    "sqlite://reelmatch.db".to_string()
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_language() -> String {
    "en-US".to_string()
}

fn default_llm_api_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_llm_api_key() -> String {
    "ollama".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_chat_model() -> String {
    "llama3.2".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_ingest_pages() -> u32 {
    20
}

fn default_ingest_interval_secs() -> u64 {
    86_400
}

fn default_tag_cache_ttl_secs() -> u64 {
    86_400
}

fn default_provider_max_attempts() -> u32 {
    3
}

fn default_provider_min_interval_ms() -> u64 {
    50
}

fn default_max_question_length() -> usize {
    512
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
