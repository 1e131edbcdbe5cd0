//! `GET /` and `GET /health`

use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use itt_knowledge::index_stats;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub index_ready: bool,
    pub chunks: u32,
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "ITT Chatbot API",
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/health",
    }))
}

/// Liveness plus whether a knowledge index is available.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let path = state.index_path.clone();
    let stats = tokio::task::spawn_blocking(move || index_stats(&path)).await;

    let chunks = match stats {
        Ok(Ok(Some(stats))) => Some(stats.chunks_count),
        Ok(Ok(None)) => None,
        Ok(Err(e)) => {
            tracing::warn!("Could not read index stats: {}", e);
            None
        }
        Err(e) => {
            tracing::warn!("Index stats task failed: {}", e);
            None
        }
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        index_ready: chunks.is_some_and(|c| c > 0),
        chunks: chunks.unwrap_or(0),
    })
}
