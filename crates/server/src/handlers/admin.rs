//! `POST /admin/sync-knowledge`

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use itt_knowledge::RefreshReport;

/// Fetch the documents and rebuild the index before responding.
pub async fn sync_knowledge(
    State(state): State<AppState>,
) -> Result<Json<RefreshReport>, ApiError> {
    tracing::info!("Knowledge sync requested");

    let report = state
        .refresher
        .refresh()
        .await
        .map_err(|e| ApiError::sync_failure(&e))?;

    tracing::info!(
        status = ?report.status,
        chunks = report.stats.chunks_count,
        "Knowledge sync finished"
    );
    Ok(Json(report))
}
