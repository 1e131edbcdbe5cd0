//! HTTP error responses.
//!
//! Clients get a short Portuguese message and a stable error code. Internal
//! error text is logged, never returned.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use itt_core::AppError;
use serde::{Deserialize, Serialize};

pub const CHAT_FAILURE_MESSAGE: &str = "Erro ao processar a pergunta.";
pub const INVALID_BODY_MESSAGE: &str = "Corpo da requisição inválido.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub error_code: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
    code: &'static str,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
            code: "VALIDATION_ERROR",
        }
    }

    /// A failed chat query. Only the error category reaches the client.
    pub fn chat_failure(err: &AppError) -> Self {
        tracing::error!(error_code = err.code(), "Error processing query: {}", err);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: CHAT_FAILURE_MESSAGE.to_string(),
            code: err.code(),
        }
    }

    /// A failed knowledge refresh, described by category.
    pub fn sync_failure(err: &AppError) -> Self {
        tracing::error!(error_code = err.code(), "Knowledge sync failed: {}", err);
        let reason = match err {
            AppError::Config(_) => "configuração inválida ou credenciais ausentes",
            AppError::Drive(_) => "não foi possível baixar os documentos do Google Drive",
            AppError::Llm(_) => "não foi possível gerar os embeddings",
            _ => "não foi possível construir o índice",
        };
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: format!("Falha ao atualizar base de conhecimento: {}.", reason),
            code: err.code(),
        }
    }
}

#[cfg(test)]
impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        Self::bad_request(INVALID_BODY_MESSAGE)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            detail: self.detail,
            error_code: Some(self.code.to_string()),
        };
        (self.status, Json(body)).into_response()
    }
}
