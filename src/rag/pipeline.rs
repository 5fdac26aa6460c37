use std::collections::BTreeSet;
use std::time::Instant;

use serde::Serialize;

use super::retriever::Retriever;
use crate::core::config::settings::RagConfig;
use crate::core::errors::AssistantError;
use crate::llm::LlmService;
use crate::postprocess::{self, CodeSanitizer};
use crate::prompt::build::normalize_catalog;
use crate::prompt::{BuildPromptComposer, ComponentCatalogEntry, QaPromptComposer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildOutput {
    pub code: String,
    pub unknown_components: Vec<String>,
}

/// Question -> retrieval -> prompt -> generation -> post-processing.
#[derive(Clone)]
pub struct DocsAssistant {
    retriever: Retriever,
    llm: LlmService,
    qa_prompts: QaPromptComposer,
    build_prompts: BuildPromptComposer,
    sanitizer: CodeSanitizer,
    qa_top_k: usize,
    build_top_k: usize,
}

impl DocsAssistant {
    pub fn new(
        retriever: Retriever,
        llm: LlmService,
        qa_prompts: QaPromptComposer,
        build_prompts: BuildPromptComposer,
        rag: &RagConfig,
    ) -> Result<Self, AssistantError> {
        let sanitizer = CodeSanitizer::new(build_prompts.root_component())
            .map_err(|e| AssistantError::Config(format!("invalid sanitizer pattern: {}", e)))?;
        Ok(Self {
            retriever,
            llm,
            qa_prompts,
            build_prompts,
            sanitizer,
            qa_top_k: rag.qa_top_k,
            build_top_k: rag.build_top_k,
        })
    }

    pub fn llm(&self) -> &LlmService {
        &self.llm
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answers a documentation question with markdown.
    pub async fn answer(
        &self,
        question: &str,
        model: Option<&str>,
    ) -> Result<String, AssistantError> {
        let model_id = self.llm.resolve_model(model)?;
        let started = Instant::now();

        let index = self.retriever.index().get().await?;
        let passages = self.retriever.retrieve(question, self.qa_top_k).await?;
        let request = self
            .qa_prompts
            .compose(index.documents(), &passages, question);
        let text = self.llm.generate(request, &model_id).await?;

        tracing::info!(
            model = %model_id,
            passages = passages.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "answered question"
        );
        Ok(postprocess::pass_through(text))
    }

    /// Generates JSX restricted to `components`.
    pub async fn build_component(
        &self,
        prompt: &str,
        components: Vec<ComponentCatalogEntry>,
    ) -> Result<BuildOutput, AssistantError> {
        let model_id = self.llm.resolve_model(None)?;
        let catalog = normalize_catalog(components);

        let passages = self.retriever.retrieve(prompt, self.build_top_k).await?;
        let request = self.build_prompts.compose(&catalog, &passages, prompt);
        let raw = self.llm.generate(request, &model_id).await?;

        let code = self.sanitizer.sanitize(&raw);
        let allowed: BTreeSet<String> = catalog.iter().map(|entry| entry.name.clone()).collect();
        let unknown_components = self.sanitizer.unknown_components(&code, &allowed);
        if !unknown_components.is_empty() {
            tracing::warn!(?unknown_components, "generated code uses components outside the whitelist");
        }

        Ok(BuildOutput {
            code,
            unknown_components,
        })
    }
}
