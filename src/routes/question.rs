use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{AppJson, AppState};
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuestionRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub answer: String,
}

fn validate_question(text: &str, max_length: usize) -> AppResult<()> {
    let length = text.chars().count();
    if text.trim().is_empty() {
        return Err(AppError::InvalidInput("Question cannot be empty".to_string()));
    }
    if length > max_length {
        return Err(AppError::InvalidInput(format!(
            "Question must be at most {} characters, got {}",
            max_length, length
        )));
    }
    Ok(())
}

/// Answers a free-text question with the chat model
pub async fn ask(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<QuestionRequest>,
) -> AppResult<Json<QuestionResponse>> {
    validate_question(&request.text, state.max_question_length)?;
    let answer = state.chat.answer(request.text.trim()).await?;
    Ok(Json(QuestionResponse { answer }))
}
