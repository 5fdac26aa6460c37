use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "index": state.index.status(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Drops the index and rebuilds it from the docs directory.
pub async fn rebuild_index(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    state.index.invalidate().await;
    let index = state.index.get().await?;
    Ok(Json(json!({
        "success": true,
        "chunks": index.len(),
        "documents": index.documents().len()
    })))
}
