use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn list_docs(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let docs = state.docs.list().await?;
    Ok(Json(docs))
}

pub async fn get_doc(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = state
        .docs
        .get(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound("Document not found".to_string()))?;

    Ok(Json(json!({
        "slug": doc.id,
        "title": doc.title,
        "category": doc.category,
        "content": doc.raw_text
    })))
}
