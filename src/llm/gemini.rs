//! Gemini REST client (`generateContent` / `batchEmbedContents`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::provider::{EmbeddingProvider, LlmProvider};
use super::types::{EmbedTask, GenerationRequest};
use crate::core::config::settings::GeminiConfig;
use crate::core::errors::AssistantError;

const API_KEY_HEADER: &str = "x-goog-api-key";
const ERROR_BODY_LIMIT: usize = 500;
/// Backend retry hints beyond this are treated as this.
pub const MAX_RETRY_HINT: Duration = Duration::from_secs(3_600);

#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    embedding_model: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: &str, config: &GeminiConfig) -> Result<Self, AssistantError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key.trim())
            .map_err(|_| AssistantError::Config("invalid Gemini API key".to_string()))?;
        headers.insert(API_KEY_HEADER, key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| AssistantError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            embedding_model: config.embedding_model.clone(),
            client,
        })
    }

    fn model_url(&self, model_id: &str, method: &str) -> String {
        let model = model_id.strip_prefix("models/").unwrap_or(model_id);
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, AssistantError> {
        let res = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let header_hint = retry_after_header(res.headers());
            let body = res.text().await.unwrap_or_default();
            let retry_after = header_hint.or_else(|| retry_delay_from_body(&body));
            tracing::warn!(retry_after = ?retry_after, "Gemini rate limit reached");
            return Err(AssistantError::RateLimit { retry_after });
        }

        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(AssistantError::Generation(format!(
                "Gemini returned {}: {}",
                status,
                truncate(&text, ERROR_BODY_LIMIT)
            )));
        }

        res.json::<Value>()
            .await
            .map_err(|e| AssistantError::Generation(format!("malformed Gemini response: {}", e)))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

pub fn build_generate_body(request: &GenerationRequest) -> Value {
    let contents: Vec<Content<'_>> = request
        .messages
        .iter()
        .map(|m| Content {
            role: Some(m.role.as_str()),
            parts: [Part { text: &m.content }],
        })
        .collect();

    let mut body = json!({ "contents": contents });
    if let (Some(obj), Some(temperature)) = (body.as_object_mut(), request.temperature) {
        obj.insert(
            "generationConfig".to_string(),
            json!({ "temperature": temperature }),
        );
    }
    body
}

/// Concatenates the text parts of the first candidate.
pub fn extract_candidate_text(payload: &Value) -> Result<String, AssistantError> {
    if let Some(reason) = payload["promptFeedback"]["blockReason"].as_str() {
        return Err(AssistantError::Generation(format!(
            "prompt blocked by backend: {}",
            reason
        )));
    }

    let parts = payload["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| {
            AssistantError::Generation("malformed Gemini response: no candidate parts".to_string())
        })?;

    let text: String = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();

    if text.is_empty() {
        return Err(AssistantError::Generation(
            "Gemini returned an empty candidate".to_string(),
        ));
    }
    Ok(text)
}

#[async_trait]
impl LlmProvider for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
        model_id: &str,
    ) -> Result<String, AssistantError> {
        let url = self.model_url(model_id, "generateContent");
        let body = build_generate_body(&request);
        tracing::debug!(model = model_id, turns = request.messages.len(), "Gemini generate");
        let payload = self.post_json(&url, &body).await?;
        extract_candidate_text(&payload)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    fn model_id(&self) -> &str {
        &self.embedding_model
    }

    async fn embed(
        &self,
        inputs: &[String],
        task: EmbedTask,
    ) -> Result<Vec<Vec<f32>>, AssistantError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let model_name = format!(
            "models/{}",
            self.embedding_model
                .strip_prefix("models/")
                .unwrap_or(&self.embedding_model)
        );
        let requests: Vec<Value> = inputs
            .iter()
            .map(|text| {
                json!({
                    "model": model_name,
                    "content": { "parts": [{ "text": text }] },
                    "taskType": task.as_gemini(),
                })
            })
            .collect();

        let url = self.model_url(&self.embedding_model, "batchEmbedContents");
        let payload = self
            .post_json(&url, &json!({ "requests": requests }))
            .await?;
        let parsed: BatchEmbedResponse = serde_json::from_value(payload)
            .map_err(|e| AssistantError::Generation(format!("malformed embedding response: {}", e)))?;

        if parsed.embeddings.len() != inputs.len() {
            return Err(AssistantError::Generation(format!(
                "Gemini returned {} embeddings for {} inputs",
                parsed.embeddings.len(),
                inputs.len()
            )));
        }
        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }
}

fn classify_transport_error(err: reqwest::Error) -> AssistantError {
    if err.is_timeout() {
        AssistantError::Generation(format!("backend request timed out: {}", err))
    } else {
        AssistantError::Generation(format!("backend request failed: {}", err))
    }
}

fn retry_after_header(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs).min(MAX_RETRY_HINT))
}

/// Reads `error.details[].retryDelay` (e.g. `"12s"`) from a 429 body.
fn retry_delay_from_body(body: &str) -> Option<Duration> {
    let payload: Value = serde_json::from_str(body).ok()?;
    payload["error"]["details"]
        .as_array()?
        .iter()
        .filter_map(|detail| detail["retryDelay"].as_str())
        .find_map(|delay| {
            let secs = delay.trim().trim_end_matches('s').parse::<f64>().ok()?;
            if !secs.is_finite() {
                return None;
            }
            Duration::try_from_secs_f64(secs.ceil().min(MAX_RETRY_HINT.as_secs_f64())).ok()
        })
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
