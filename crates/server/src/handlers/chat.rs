//! `POST /chat/query`

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub message: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
    pub source_documents: Vec<String>,
}

pub async fn query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = payload?;
    let user = request.user_id.as_deref().unwrap_or("anonymous");

    let message = request.message.trim();
    if message.is_empty() {
        return Err(ApiError::bad_request("A mensagem não pode estar vazia."));
    }
    let length = message.chars().count();
    if length > state.max_question_chars {
        return Err(ApiError::bad_request(format!(
            "A mensagem excede o limite de {} caracteres.",
            state.max_question_chars
        )));
    }

    tracing::info!(user, chars = length, "Processing query");
    let outcome = state
        .workflow
        .run(message)
        .await
        .map_err(|e| ApiError::chat_failure(&e))?;
    tracing::info!(user, route = outcome.route.as_str(), "Query processed");

    Ok(Json(QueryResponse {
        response: outcome.answer,
        source_documents: outcome.citations,
    }))
}
