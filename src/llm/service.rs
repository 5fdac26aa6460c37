use std::sync::Arc;
use std::time::Instant;

use crate::core::config::settings::GeminiConfig;
use crate::core::errors::AssistantError;
use crate::llm::provider::LlmProvider;
use crate::llm::types::GenerationRequest;

/// Generation entry point shared by the RAG and raw chat paths.
///
/// The model is chosen per call; the embedding index is not involved, so
/// switching models never triggers a rebuild.
#[derive(Clone)]
pub struct LlmService {
    provider: Arc<dyn LlmProvider>,
    available_models: Arc<Vec<String>>,
    default_model: String,
}

impl LlmService {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &GeminiConfig) -> Self {
        let mut models = config.available_models.clone();
        if !models.contains(&config.default_model) {
            models.insert(0, config.default_model.clone());
        }
        Self {
            provider,
            available_models: Arc::new(models),
            default_model: config.default_model.clone(),
        }
    }

    pub fn available_models(&self) -> &[String] {
        &self.available_models
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn is_known_model(&self, model_id: &str) -> bool {
        self.available_models.iter().any(|m| m == model_id)
    }

    /// Requested model if given and known, otherwise the default.
    pub fn resolve_model(&self, requested: Option<&str>) -> Result<String, AssistantError> {
        match requested.map(str::trim).filter(|m| !m.is_empty()) {
            None => Ok(self.default_model.clone()),
            Some(model) if self.is_known_model(model) => Ok(model.to_string()),
            Some(model) => Err(AssistantError::Config(format!("unknown model: {}", model))),
        }
    }

    pub async fn generate(
        &self,
        request: GenerationRequest,
        model_id: &str,
    ) -> Result<String, AssistantError> {
        let started = Instant::now();
        let result = self.provider.generate(request, model_id).await;
        match &result {
            Ok(text) => tracing::info!(
                provider = self.provider.name(),
                model = model_id,
                chars = text.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "generation finished"
            ),
            Err(err) => tracing::warn!(
                provider = self.provider.name(),
                model = model_id,
                "generation failed: {}",
                err
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoProvider;

    #[async_trait]
    impl LlmProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(
            &self,
            _request: GenerationRequest,
            model_id: &str,
        ) -> Result<String, AssistantError> {
            Ok(model_id.to_string())
        }
    }

    fn service() -> LlmService {
        LlmService::new(Arc::new(EchoProvider), &GeminiConfig::default())
    }

    #[test]
    fn resolve_defaults_when_absent_or_blank() {
        let svc = service();
        assert_eq!(svc.resolve_model(None).unwrap(), svc.default_model());
        assert_eq!(svc.resolve_model(Some("  ")).unwrap(), svc.default_model());
    }

    #[test]
    fn resolve_rejects_unknown_model() {
        assert!(service().resolve_model(Some("gpt-4")).is_err());
    }

    #[tokio::test]
    async fn model_is_passed_per_call() {
        let svc = service();
        let a = svc
            .generate(GenerationRequest::from_prompt("x"), "gemini-2.5-flash")
            .await
            .unwrap();
        let b = svc
            .generate(GenerationRequest::from_prompt("x"), "gemini-2.0-flash-001")
            .await
            .unwrap();
        assert_eq!(a, "gemini-2.5-flash");
        assert_eq!(b, "gemini-2.0-flash-001");
    }

    #[test]
    fn default_model_is_always_listed() {
        let config = GeminiConfig {
            default_model: "custom-model".to_string(),
            ..Default::default()
        };
        let svc = LlmService::new(Arc::new(EchoProvider), &config);
        assert!(svc.is_known_model("custom-model"));
    }
}
