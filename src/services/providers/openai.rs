/// OpenAI-compatible text model client
///
/// Talks to any server exposing the OpenAI REST surface (OpenAI itself,
/// Ollama, vLLM, ...). Embeddings come from /v1/embeddings and free-text
/// answers from /v1/chat/completions. Embeddings are cached by model and text.
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    services::providers::{ChatModel, EmbeddingProvider, RateLimiter, RetryPolicy},
};
use reqwest::Client as HttpClient;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

const PROVIDER: &str = "openai";
const EMBEDDING_CACHE_TTL: u64 = 604800; // 1 week
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant who helps the user find a movie \
    to watch based on their preferences. Ask about favourite movies, genres, release years and \
    minimum ratings when you do not know them yet. Answer short and concise.";

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct OpenAiClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    embedding_model: String,
    chat_model: String,
    cache: Cache,
    retry: RetryPolicy,
    limiter: Arc<RateLimiter>,
}

impl OpenAiClient {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cache: Cache,
        api_key: String,
        api_url: String,
        embedding_model: String,
        chat_model: String,
        retry: RetryPolicy,
        min_interval: Duration,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            embedding_model,
            chat_model,
            cache,
            retry,
            limiter: Arc::new(RateLimiter::new(min_interval)),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1{}", self.api_url, path)
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> AppResult<T> {
        let url = self.endpoint(path);
        let url = url.as_str();

        self.retry
            .run(path, || async move {
                self.limiter.acquire().await;

                let response = self
                    .http_client
                    .post(url)
                    .bearer_auth(&self.api_key)
                    .json(body)
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

                Ok(response.json::<T>().await?)
            })
            .await
    }

    async fn request_embedding(&self, text: &str) -> AppResult<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };
        let response: EmbeddingResponse = self.post_json("/embeddings", &request).await?;
        parse_embedding(response)
    }
}

fn parse_embedding(response: EmbeddingResponse) -> AppResult<Vec<f32>> {
    let embedding = response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| AppError::ExternalApi("Embedding response contained no data".to_string()))?;

    if embedding.is_empty() {
        return Err(AppError::ExternalApi(
            "Embedding response contained an empty vector".to_string(),
        ));
    }

    Ok(embedding)
}

fn parse_answer(response: ChatResponse) -> AppResult<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| AppError::ExternalApi("Chat completion returned no content".to_string()))
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Cannot embed empty text".to_string(),
            ));
        }

        let embedding: Vec<f32> = cached!(
            self.cache,
            CacheKey::embedding(&self.embedding_model, text),
            EMBEDDING_CACHE_TTL,
            self.request_embedding(text)
        );

        tracing::debug!(
            model = %self.embedding_model,
            chars = text.len(),
            dimensions = embedding.len(),
            "Text embedded"
        );

        Ok(embedding)
    }
}

#[async_trait::async_trait]
impl ChatModel for OpenAiClient {
    async fn answer(&self, question: &str) -> AppResult<String> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: question,
                },
            ],
        };

        let response: ChatResponse = self.post_json("/chat/completions", &request).await?;
        let answer = parse_answer(response)?;

        tracing::info!(model = %self.chat_model, chars = answer.len(), "Chat completion received");
        Ok(answer)
    }
}
