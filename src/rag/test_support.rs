//! Deterministic embedders for unit tests.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::chunker::Chunk;
use crate::core::errors::AssistantError;
use crate::llm::{EmbedTask, EmbeddingProvider};

pub const DIMENSION: usize = 64;

pub fn chunk(document_id: &str, sequence: usize, text: &str) -> Chunk {
    Chunk {
        document_id: document_id.to_string(),
        sequence,
        text: text.to_string(),
        heading_path: Vec::new(),
    }
}

/// Bag-of-words embedder: each lowercase token bumps one hashed bucket.
pub struct HashEmbedder {
    model: String,
    delay: Option<Duration>,
    calls: AtomicUsize,
    texts: AtomicUsize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self::with_model("hash-test")
    }

    pub fn with_model(model: &str) -> Self {
        Self {
            model: model.to_string(),
            delay: None,
            calls: AtomicUsize::new(0),
            texts: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn embedded_texts(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; DIMENSION];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            vector[(hasher.finish() % DIMENSION as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed(
        &self,
        inputs: &[String],
        _task: EmbedTask,
    ) -> Result<Vec<Vec<f32>>, AssistantError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.fetch_add(inputs.len(), Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(inputs.iter().map(|text| self.vector_for(text)).collect())
    }
}

/// Fails any batch containing `marker`.
pub struct FailingEmbedder {
    marker: String,
    inner: HashEmbedder,
}

impl FailingEmbedder {
    pub fn new(marker: &str) -> Self {
        Self {
            marker: marker.to_string(),
            inner: HashEmbedder::new(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    async fn embed(
        &self,
        inputs: &[String],
        task: EmbedTask,
    ) -> Result<Vec<Vec<f32>>, AssistantError> {
        if inputs.iter().any(|text| text.contains(&self.marker)) {
            return Err(AssistantError::Generation("backend exploded".to_string()));
        }
        self.inner.embed(inputs, task).await
    }
}

/// Hands out pre-baked vectors in call order.
pub struct FixedEmbedder {
    vectors: Vec<Vec<f32>>,
    cursor: AtomicUsize,
}

impl FixedEmbedder {
    pub fn new(vectors: Vec<Vec<f32>>) -> Self {
        Self {
            vectors,
            cursor: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    fn model_id(&self) -> &str {
        "fixed-test"
    }

    async fn embed(
        &self,
        inputs: &[String],
        _task: EmbedTask,
    ) -> Result<Vec<Vec<f32>>, AssistantError> {
        let start = self.cursor.fetch_add(inputs.len(), Ordering::SeqCst);
        Ok((start..start + inputs.len())
            .map(|i| self.vectors.get(i).cloned().unwrap_or_default())
            .collect())
    }
}
