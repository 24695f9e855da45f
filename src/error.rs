use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("{provider} returned status {status}: {body}")]
    ProviderStatus {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether a retry of the failed upstream call may succeed.
    ///
    /// Rate limiting and server-side failures are transient; any other
    /// client error means the request itself is wrong and is never retried.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::ProviderStatus { status, .. } => *status == 429 || *status >= 500,
            AppError::HttpClient(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::InvalidInput(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::ProviderStatus { .. } | AppError::HttpClient(_) | AppError::ExternalApi(_) => {
                tracing::error!(error = %self, "Upstream provider failure");
                (
                    StatusCode::BAD_GATEWAY,
                    "Upstream provider unavailable, please try again later".to_string(),
                )
            }
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to process request".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_status(status: u16) -> AppError {
        AppError::ProviderStatus {
            provider: "tmdb",
            status,
            body: String::new(),
        }
    }

    #[test]
    fn test_rate_limit_and_server_errors_are_transient() {
        assert!(provider_status(429).is_transient());
        assert!(provider_status(500).is_transient());
        assert!(provider_status(503).is_transient());
    }

    #[test]
    fn test_client_errors_are_not_transient() {
        assert!(!provider_status(400).is_transient());
        assert!(!provider_status(401).is_transient());
        assert!(!provider_status(404).is_transient());
        assert!(!AppError::InvalidInput("bad".to_string()).is_transient());
    }

    #[test]
    fn test_invalid_input_maps_to_unprocessable_entity() {
        let response = AppError::InvalidInput("text too long".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_internal_failures_map_to_server_error() {
        let response = AppError::Internal("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = provider_status(503).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
