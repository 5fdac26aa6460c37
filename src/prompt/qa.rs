use super::{compose, PromptSections, QA_TEMPERATURE};
use crate::docs::DocumentSummary;
use crate::llm::GenerationRequest;
use crate::rag::RetrievalResult;

/// Q&A prompts. Link targets are `/docs/<slug>`, one per known document.
#[derive(Debug, Clone)]
pub struct QaPromptComposer {
    product_name: String,
}

impl QaPromptComposer {
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
        }
    }

    fn preamble(&self) -> String {
        format!(
            "Eres el asistente de documentación de {product}.\n\
Responde en el idioma de la pregunta y únicamente con la información del CONTEXTO.\n\
Si el CONTEXTO no contiene la respuesta, dilo explícitamente: \"No encuentro esa información en la documentación.\" No inventes.\n\
Cuando menciones tokens, escribe su nombre y su valor literal tal como aparecen (por ejemplo `--radius-md: 8px`).\n\
Para enlazar un tema usa solo los enlaces de la lista ENLACES, en formato markdown, sin modificar la ruta.\n\
Responde en markdown breve.",
            product = self.product_name
        )
    }

    pub fn link_for(summary: &DocumentSummary) -> String {
        format!("[{}](/docs/{})", summary.title, summary.slug)
    }

    pub fn compose(
        &self,
        documents: &[DocumentSummary],
        passages: &[RetrievalResult],
        question: &str,
    ) -> GenerationRequest {
        let preamble = self.preamble();
        let prompt = compose(PromptSections {
            preamble: &preamble,
            whitelist_heading: "ENLACES:",
            whitelist: documents.iter().map(Self::link_for).collect(),
            passages,
            request_heading: "PREGUNTA:",
            request: question,
        });
        GenerationRequest::from_prompt(prompt).with_temperature(QA_TEMPERATURE)
    }
}
