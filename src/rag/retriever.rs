use std::sync::Arc;

use super::handle::IndexHandle;
use super::index::RetrievalResult;
use crate::core::errors::AssistantError;
use crate::llm::{EmbedTask, EmbeddingProvider};

/// Embeds a question and ranks every indexed chunk against it.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<IndexHandle>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    pub fn new(index: Arc<IndexHandle>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { index, embedder }
    }

    pub fn index(&self) -> &Arc<IndexHandle> {
        &self.index
    }

    pub async fn retrieve(
        &self,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>, AssistantError> {
        let index = self.index.get().await?;

        if index.model_id() != self.embedder.model_id() {
            return Err(AssistantError::Config(format!(
                "index was built with {} but queries use {}",
                index.model_id(),
                self.embedder.model_id()
            )));
        }

        let mut vectors = self
            .embedder
            .embed(&[question.to_string()], EmbedTask::Query)
            .await?;
        let query = vectors.pop().ok_or_else(|| {
            AssistantError::Generation("embedding backend returned no vector".to_string())
        })?;

        let results = index.query(&query, top_k)?;
        tracing::debug!(
            top_k,
            returned = results.len(),
            best = results.first().map(|r| r.score).unwrap_or_default(),
            "retrieved context"
        );
        Ok(results)
    }
}
