use std::sync::Arc;
use std::time::Duration;

use crate::chat::ChatService;
use crate::core::config::{AppConfig, AppPaths};
use crate::docs::{CategoryTable, DocumentStore, TitleExtractor};
use crate::llm::{EmbeddingProvider, GeminiClient, LlmProvider, LlmService};
use crate::prompt::{BuildPromptComposer, QaPromptComposer};
use crate::rag::{
    BuildOptions, ChunkerConfig, DocsAssistant, IndexBuilder, IndexHandle, MarkdownChunker,
    Retriever,
};
use crate::storybook::StorybookCatalog;

pub mod error;

use error::InitializationError;

/// Shared state behind every route.
///
/// Holds the loaded configuration, the docs corpus, the lazily built index,
/// the Q&A/build pipeline, the raw chat session and the Storybook cache.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: Arc<AppConfig>,
    pub docs: DocumentStore,
    pub index: Arc<IndexHandle>,
    pub assistant: DocsAssistant,
    pub chat: Arc<ChatService>,
    pub storybook: Arc<StorybookCatalog>,
}

impl AppState {
    /// Wires the Gemini client into every service.
    pub fn initialize(
        paths: Arc<AppPaths>,
        config: AppConfig,
        api_key: &str,
    ) -> Result<Arc<Self>, InitializationError> {
        let gemini =
            Arc::new(GeminiClient::new(api_key, &config.gemini).map_err(InitializationError::Llm)?);
        Self::with_providers(paths, config, gemini.clone(), gemini)
    }

    /// Same wiring with caller-supplied backends.
    pub fn with_providers(
        paths: Arc<AppPaths>,
        config: AppConfig,
        llm_provider: Arc<dyn LlmProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Arc<Self>, InitializationError> {
        let docs = DocumentStore::new(
            paths.docs_dir.clone(),
            CategoryTable::from_config(&config.docs.categories),
            TitleExtractor::new(&config.docs.product_name),
        );

        let chunker = MarkdownChunker::new(ChunkerConfig {
            min_chars: config.rag.chunk_min_chars,
            max_chars: config.rag.chunk_max_chars,
        });
        let options = BuildOptions {
            batch_size: config.gemini.embed_batch_size,
            concurrency: config.gemini.embed_concurrency,
        };
        let index = Arc::new(IndexHandle::new(IndexBuilder::new(
            docs.clone(),
            chunker,
            embedder.clone(),
            options,
        )));

        let llm = LlmService::new(llm_provider, &config.gemini);
        let assistant = DocsAssistant::new(
            Retriever::new(index.clone(), embedder),
            llm.clone(),
            QaPromptComposer::new(config.docs.product_name.clone()),
            BuildPromptComposer::new(config.docs.product_name.clone(), &config.build),
            &config.rag,
        )
        .map_err(InitializationError::Assistant)?;

        let chat = Arc::new(ChatService::new(
            llm,
            Duration::from_secs(config.chat.cooldown_secs),
        ));
        let storybook = Arc::new(
            StorybookCatalog::new(&config.storybook).map_err(InitializationError::Storybook)?,
        );

        tracing::info!(
            docs_dir = %paths.docs_dir.display(),
            default_model = %config.gemini.default_model,
            embedding_model = %config.gemini.embedding_model,
            "Application state ready"
        );

        Ok(Arc::new(AppState {
            paths,
            config: Arc::new(config),
            docs,
            index,
            assistant,
            chat,
            storybook,
        }))
    }

    /// Starts the index build in the background so the first query finds
    /// it ready. Failures are logged; the next query retries.
    pub fn warm_up(self: &Arc<Self>) {
        let index = self.index.clone();
        tokio::spawn(async move {
            if let Err(err) = index.get().await {
                tracing::warn!("Index warm-up failed: {}", err);
            }
        });
    }
}
