//! Process-wide, lazily built embedding index.
//!
//! The first caller of [`IndexHandle::get`] runs the build; callers arriving
//! while it is in flight await the same build through `OnceCell`. A failed
//! build leaves the cell empty so a later call can retry. `invalidate` swaps
//! in a fresh cell; readers holding the old index keep using it until they
//! finish. A build still running on a replaced cell no longer touches the
//! reported status.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde::Serialize;
use tokio::sync::{OnceCell, RwLock};

use super::chunker::MarkdownChunker;
use super::index::{BuildOptions, EmbeddingIndex};
use crate::core::errors::AssistantError;
use crate::docs::{DocumentStore, DocumentSummary};
use crate::llm::EmbeddingProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStatus {
    Idle,
    Building,
    Ready,
    Failed,
}

/// Loads, chunks and embeds the corpus.
pub struct IndexBuilder {
    store: DocumentStore,
    chunker: MarkdownChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    options: BuildOptions,
}

impl IndexBuilder {
    pub fn new(
        store: DocumentStore,
        chunker: MarkdownChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        options: BuildOptions,
    ) -> Self {
        Self {
            store,
            chunker,
            embedder,
            options,
        }
    }

    pub async fn build(&self) -> Result<EmbeddingIndex, AssistantError> {
        let documents = self.store.load_all().await?;
        let chunks = self.chunker.chunk_all(&documents);
        let summaries = documents.iter().map(DocumentSummary::from).collect();
        EmbeddingIndex::build(summaries, chunks, self.embedder.as_ref(), &self.options).await
    }
}

/// Status of the current cell; `generation` counts invalidations.
#[derive(Debug, Clone, Copy)]
struct StatusSlot {
    generation: u64,
    status: IndexStatus,
}

pub struct IndexHandle {
    cell: RwLock<Arc<OnceCell<Arc<EmbeddingIndex>>>>,
    builder: IndexBuilder,
    status: Mutex<StatusSlot>,
}

impl IndexHandle {
    pub fn new(builder: IndexBuilder) -> Self {
        Self {
            cell: RwLock::new(Arc::new(OnceCell::new())),
            builder,
            status: Mutex::new(StatusSlot {
                generation: 0,
                status: IndexStatus::Idle,
            }),
        }
    }

    pub fn status(&self) -> IndexStatus {
        self.slot().status
    }

    /// Returns the ready index, building it first if needed.
    pub async fn get(&self) -> Result<Arc<EmbeddingIndex>, AssistantError> {
        let (cell, generation) = {
            let current = self.cell.read().await;
            let generation = self.slot().generation;
            (Arc::clone(&current), generation)
        };
        if let Some(index) = cell.get() {
            return Ok(index.clone());
        }

        cell.get_or_try_init(|| async {
            self.set_status(generation, IndexStatus::Building);
            let started = Instant::now();
            match self.builder.build().await {
                Ok(index) => {
                    tracing::info!(
                        chunks = index.len(),
                        dimension = index.dimension(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Embedding index ready"
                    );
                    self.set_status(generation, IndexStatus::Ready);
                    Ok(Arc::new(index))
                }
                Err(err) => {
                    tracing::error!("Embedding index build failed: {}", err);
                    self.set_status(generation, IndexStatus::Failed);
                    Err(match err {
                        AssistantError::IndexBuild(_) => err,
                        other => AssistantError::IndexBuild(other.to_string()),
                    })
                }
            }
        })
        .await
        .cloned()
    }

    /// Drops the current index; the next `get` rebuilds from disk.
    pub async fn invalidate(&self) {
        let mut guard = self.cell.write().await;
        *guard = Arc::new(OnceCell::new());
        let mut slot = self.slot();
        slot.generation += 1;
        slot.status = IndexStatus::Idle;
        tracing::info!(generation = slot.generation, "Embedding index invalidated");
    }

    fn slot(&self) -> MutexGuard<'_, StatusSlot> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ignored when `generation` has been invalidated meanwhile.
    fn set_status(&self, generation: u64, status: IndexStatus) {
        let mut slot = self.slot();
        if slot.generation == generation {
            slot.status = status;
        } else {
            tracing::debug!(?status, generation, "Discarding status of a replaced index build");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::{CategoryTable, TitleExtractor};
    use crate::rag::chunker::ChunkerConfig;
    use crate::rag::test_support::{FailingEmbedder, HashEmbedder};
    use std::fs;
    use std::time::Duration;

    fn handle_for(dir: &std::path::Path, embedder: Arc<dyn EmbeddingProvider>) -> IndexHandle {
        let store = DocumentStore::new(
            dir,
            CategoryTable::default(),
            TitleExtractor::new("MindSet Design System"),
        );
        let chunker = MarkdownChunker::new(ChunkerConfig {
            min_chars: 0,
            max_chars: 1_000,
        });
        IndexHandle::new(IndexBuilder::new(
            store,
            chunker,
            embedder,
            BuildOptions {
                batch_size: 1,
                concurrency: 2,
            },
        ))
    }

    fn write_corpus(dir: &std::path::Path) {
        fs::write(
            dir.join("button.md"),
            "# MindSet Design System - Button\nIntro\n\n## Radius\nel radius de botones es 8px\n",
        )
        .unwrap();
        fs::write(dir.join("typography.md"), "# Typography\nInter everywhere\n").unwrap();
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_build() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());
        let embedder = Arc::new(HashEmbedder::new().with_delay(Duration::from_millis(50)));
        let handle = Arc::new(handle_for(dir.path(), embedder.clone()));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let handle = handle.clone();
                tokio::spawn(async move { handle.get().await.map(|i| i.len()) })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 3);
        }

        assert_eq!(embedder.embedded_texts(), 3);
        assert_eq!(handle.status(), IndexStatus::Ready);
    }

    #[tokio::test]
    async fn failed_build_reports_and_allows_retry() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());
        let handle = handle_for(dir.path(), Arc::new(FailingEmbedder::new("Inter")));

        let err = handle.get().await.unwrap_err();
        assert!(matches!(err, AssistantError::IndexBuild(_)));
        assert_eq!(handle.status(), IndexStatus::Failed);

        fs::write(dir.path().join("typography.md"), "# Typography\nfixed\n").unwrap();
        assert!(handle.get().await.is_ok());
        assert_eq!(handle.status(), IndexStatus::Ready);
    }

    #[tokio::test]
    async fn missing_corpus_is_index_build_failure() {
        let dir = tempfile::tempdir().unwrap();
        let handle = handle_for(&dir.path().join("nope"), Arc::new(HashEmbedder::new()));
        assert!(matches!(
            handle.get().await.unwrap_err(),
            AssistantError::IndexBuild(_)
        ));
    }

    #[tokio::test]
    async fn invalidate_triggers_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());
        let embedder = Arc::new(HashEmbedder::new());
        let handle = handle_for(dir.path(), embedder.clone());

        let first = handle.get().await.unwrap();
        let again = handle.get().await.unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(embedder.embedded_texts(), 3);

        handle.invalidate().await;
        assert_eq!(handle.status(), IndexStatus::Idle);
        let rebuilt = handle.get().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(embedder.embedded_texts(), 6);
    }

    #[tokio::test]
    async fn superseded_build_does_not_overwrite_status() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());
        let embedder = Arc::new(HashEmbedder::new().with_delay(Duration::from_millis(150)));
        let handle = Arc::new(handle_for(dir.path(), embedder));

        let stale = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.get().await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(handle.status(), IndexStatus::Building);

        handle.invalidate().await;
        assert!(stale.await.unwrap().is_ok());
        assert_eq!(handle.status(), IndexStatus::Idle);

        handle.get().await.unwrap();
        assert_eq!(handle.status(), IndexStatus::Ready);
    }
}
