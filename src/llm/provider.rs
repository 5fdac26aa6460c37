use async_trait::async_trait;

use super::types::{EmbedTask, GenerationRequest};
use crate::core::errors::AssistantError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// provider name used in logs (e.g. "gemini")
    fn name(&self) -> &str;

    /// single completion; 429 must surface as `AssistantError::RateLimit`
    async fn generate(
        &self,
        request: GenerationRequest,
        model_id: &str,
    ) -> Result<String, AssistantError>;
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// identifier of the embedding space; index and queries must agree on it
    fn model_id(&self) -> &str;

    /// one vector per input, in input order
    async fn embed(
        &self,
        inputs: &[String],
        task: EmbedTask,
    ) -> Result<Vec<Vec<f32>>, AssistantError>;
}
