//! Prompt composition.
//!
//! Both variants share one shape: preamble rules, an enumerated whitelist,
//! the retrieved passages labelled with their heading path, and finally the
//! user's text verbatim.

pub mod build;
pub mod qa;

pub use build::{BuildPromptComposer, ComponentCatalogEntry};
pub use qa::QaPromptComposer;

use crate::rag::RetrievalResult;

/// Sampling temperature for documentation answers.
pub const QA_TEMPERATURE: f64 = 0.2;
/// Code generation runs colder.
pub const BUILD_TEMPERATURE: f64 = 0.1;

pub(crate) struct PromptSections<'a> {
    pub preamble: &'a str,
    pub whitelist_heading: &'a str,
    pub whitelist: Vec<String>,
    pub passages: &'a [RetrievalResult],
    pub request_heading: &'a str,
    pub request: &'a str,
}

pub(crate) fn compose(sections: PromptSections<'_>) -> String {
    let mut prompt = String::new();
    prompt.push_str(sections.preamble.trim());
    prompt.push_str("\n\n");

    prompt.push_str(sections.whitelist_heading);
    prompt.push('\n');
    if sections.whitelist.is_empty() {
        prompt.push_str("(ninguno)\n");
    } else {
        for item in &sections.whitelist {
            prompt.push_str("- ");
            prompt.push_str(item);
            prompt.push('\n');
        }
    }
    prompt.push('\n');

    prompt.push_str("CONTEXTO:\n");
    prompt.push_str(&render_passages(sections.passages));
    prompt.push_str("\n\n");

    prompt.push_str(sections.request_heading);
    prompt.push('\n');
    prompt.push_str(sections.request);
    prompt
}

/// `[n] (fuente: slug · Heading > Path)` followed by the passage text.
pub fn render_passages(passages: &[RetrievalResult]) -> String {
    if passages.is_empty() {
        return "(sin resultados)".to_string();
    }

    let mut context = String::new();
    for (i, result) in passages.iter().enumerate() {
        let chunk = &result.chunk;
        match chunk.section_label() {
            Some(label) => context.push_str(&format!(
                "[{}] (fuente: {} · {})\n",
                i + 1,
                chunk.document_id,
                label
            )),
            None => context.push_str(&format!("[{}] (fuente: {})\n", i + 1, chunk.document_id)),
        }
        context.push_str(chunk.text.trim());
        context.push_str("\n\n");
    }
    context.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::Chunk;
    use std::sync::Arc;

    fn result(doc: &str, path: &[&str], text: &str) -> RetrievalResult {
        RetrievalResult {
            chunk: Arc::new(Chunk {
                document_id: doc.to_string(),
                sequence: 0,
                text: text.to_string(),
                heading_path: path.iter().map(|s| s.to_string()).collect(),
            }),
            score: 0.5,
        }
    }

    #[test]
    fn passages_are_labelled_with_heading_path() {
        let rendered = render_passages(&[
            result("button", &["Button", "Tokens"], "radius 8px"),
            result("intro", &[], "hola"),
        ]);
        assert!(rendered.starts_with("[1] (fuente: button · Button > Tokens)\nradius 8px"));
        assert!(rendered.contains("[2] (fuente: intro)\nhola"));
    }

    #[test]
    fn sections_appear_in_order() {
        let passages = [result("button", &["Button"], "texto")];
        let prompt = compose(PromptSections {
            preamble: "REGLAS",
            whitelist_heading: "LISTA:",
            whitelist: vec!["uno".to_string()],
            passages: &passages,
            request_heading: "PREGUNTA:",
            request: "¿qué?",
        });
        let rules = prompt.find("REGLAS").unwrap();
        let list = prompt.find("- uno").unwrap();
        let context = prompt.find("texto").unwrap();
        let question = prompt.find("¿qué?").unwrap();
        assert!(rules < list && list < context && context < question);
        assert!(prompt.ends_with("¿qué?"));
    }
}
