use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::{json_body, model_error, required_text};
use crate::core::errors::ApiError;
use crate::prompt::ComponentCatalogEntry;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StoryRef {
    #[serde(default)]
    pub name: Option<String>,
}

/// Accepts both the explicit `variant_names` shape and the Storybook
/// `{name, stories}` shape the catalog endpoint returns.
#[derive(Debug, Deserialize)]
pub struct BuildComponent {
    pub name: String,
    #[serde(default)]
    pub variant_names: Vec<String>,
    #[serde(default)]
    pub stories: Vec<StoryRef>,
}

impl From<BuildComponent> for ComponentCatalogEntry {
    fn from(component: BuildComponent) -> Self {
        let story_names = component.stories.into_iter().filter_map(|story| story.name);
        ComponentCatalogEntry::new(component.name)
            .with_variants(component.variant_names.into_iter().chain(story_names))
    }
}

#[derive(Debug, Deserialize)]
pub struct BuildRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub components: Vec<BuildComponent>,
}

pub async fn query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;
    let question = required_text(payload.question, "La pregunta es requerida")?;
    let model = state
        .assistant
        .llm()
        .resolve_model(payload.model.as_deref())
        .map_err(model_error)?;

    let response = state.assistant.answer(&question, Some(&model)).await?;
    Ok(Json(json!({ "response": response })))
}

pub async fn build(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BuildRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;
    let prompt = required_text(payload.prompt, "El prompt es requerido")?;
    let components = payload.components.into_iter().map(Into::into).collect();

    let output = state.assistant.build_component(&prompt, components).await?;
    Ok(Json(json!({
        "code": output.code,
        "unknown_components": output.unknown_components
    })))
}
