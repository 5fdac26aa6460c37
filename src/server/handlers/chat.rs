use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::{json_body, model_error, required_text};
use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModelRequest {
    #[serde(default)]
    pub model: Option<String>,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;
    let message = required_text(payload.message, "El mensaje es requerido")?;
    let response = state.chat.send(&message).await?;
    Ok(Json(json!({ "response": response })))
}

pub async fn clear(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.chat.reset().await;
    Json(json!({ "success": true }))
}

pub async fn list_models(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "models": state.chat.available_models(),
        "current": state.chat.current_model().await
    }))
}

pub async fn set_model(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ModelRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;
    let requested = required_text(payload.model, "El modelo es requerido")?;
    let model = state.chat.set_model(&requested).await.map_err(model_error)?;
    Ok(Json(json!({ "success": true, "model": model })))
}
