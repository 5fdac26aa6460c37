//! In-memory embedding index.
//!
//! Similarity is cosine similarity. Vectors are normalised to unit length once
//! at build time and queries are normalised the same way, so ranking uses a
//! plain dot product.

use std::cmp::Ordering;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

use super::chunker::Chunk;
use crate::core::errors::AssistantError;
use crate::docs::DocumentSummary;
use crate::llm::{EmbedTask, EmbeddingProvider};
use crate::vector_math::{dot, normalize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildOptions {
    pub batch_size: usize,
    pub concurrency: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            concurrency: 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub chunk: Arc<Chunk>,
    /// Cosine similarity, higher is closer.
    pub score: f32,
}

#[derive(Debug)]
pub struct EmbeddingIndex {
    model_id: String,
    dimension: usize,
    documents: Vec<DocumentSummary>,
    chunks: Vec<Arc<Chunk>>,
    vectors: Vec<Vec<f32>>,
}

/// Text sent to the embedding model for a chunk.
pub fn embedding_text(chunk: &Chunk) -> String {
    match chunk.section_label() {
        Some(label) => format!("{}\n\n{}", label, chunk.text),
        None => chunk.text.clone(),
    }
}

impl EmbeddingIndex {
    /// Embeds every chunk exactly once. Any failure aborts the whole build.
    pub async fn build(
        documents: Vec<DocumentSummary>,
        chunks: Vec<Chunk>,
        embedder: &dyn EmbeddingProvider,
        options: &BuildOptions,
    ) -> Result<Self, AssistantError> {
        if chunks.is_empty() {
            return Err(AssistantError::IndexBuild(
                "corpus produced no chunks".to_string(),
            ));
        }

        let batch_size = options.batch_size.max(1);
        let batches: Vec<Vec<String>> = chunks
            .chunks(batch_size)
            .map(|batch| batch.iter().map(embedding_text).collect())
            .collect();

        tracing::info!(
            chunks = chunks.len(),
            batches = batches.len(),
            model = embedder.model_id(),
            "Building embedding index"
        );

        let embedded: Vec<Vec<Vec<f32>>> = stream::iter(batches.into_iter().enumerate().map(
            |(batch_no, batch)| async move {
                let vectors = embedder
                    .embed(&batch, EmbedTask::Document)
                    .await
                    .map_err(|e| {
                        AssistantError::IndexBuild(format!("batch {} failed: {}", batch_no, e))
                    })?;
                if vectors.len() != batch.len() {
                    return Err(AssistantError::IndexBuild(format!(
                        "batch {} returned {} vectors for {} chunks",
                        batch_no,
                        vectors.len(),
                        batch.len()
                    )));
                }
                Ok(vectors)
            },
        ))
        .buffered(options.concurrency.max(1))
        .try_collect()
        .await?;

        let raw: Vec<Vec<f32>> = embedded.into_iter().flatten().collect();
        let dimension = raw.first().map(Vec::len).unwrap_or(0);
        if dimension == 0 {
            return Err(AssistantError::IndexBuild(
                "embedding model returned empty vectors".to_string(),
            ));
        }

        let mut vectors = Vec::with_capacity(raw.len());
        for (position, vector) in raw.iter().enumerate() {
            if vector.len() != dimension {
                return Err(AssistantError::IndexBuild(format!(
                    "chunk {} has dimension {} (expected {})",
                    position,
                    vector.len(),
                    dimension
                )));
            }
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(AssistantError::IndexBuild(format!(
                    "chunk {} has non-finite embedding values",
                    position
                )));
            }
            vectors.push(normalize(vector));
        }

        Ok(Self {
            model_id: embedder.model_id().to_string(),
            dimension,
            documents,
            chunks: chunks.into_iter().map(Arc::new).collect(),
            vectors,
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Documents present when the index was built.
    pub fn documents(&self) -> &[DocumentSummary] {
        &self.documents
    }

    /// Top `top_k` chunks by descending score; ties keep chunk order.
    /// `top_k` larger than the index returns every chunk.
    pub fn query(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>, AssistantError> {
        if vector.len() != self.dimension {
            return Err(AssistantError::Config(format!(
                "query vector has dimension {} but the index uses {}",
                vector.len(),
                self.dimension
            )));
        }

        let query = normalize(vector);
        let mut scored = Vec::with_capacity(self.vectors.len());
        for (position, candidate) in self.vectors.iter().enumerate() {
            let score = dot(&query, candidate)?;
            scored.push((position, if score.is_finite() { score } else { 0.0 }));
        }

        scored.sort_by(|left, right| {
            right
                .1
                .partial_cmp(&left.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| left.0.cmp(&right.0))
        });
        scored.truncate(top_k.min(self.chunks.len()));

        Ok(scored
            .into_iter()
            .map(|(position, score)| RetrievalResult {
                chunk: self.chunks[position].clone(),
                score,
            })
            .collect())
    }
}
