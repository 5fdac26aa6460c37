use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{compose, PromptSections, BUILD_TEMPERATURE};
use crate::core::config::settings::BuildConfig;
use crate::llm::GenerationRequest;
use crate::rag::RetrievalResult;

/// One component the build prompt may use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentCatalogEntry {
    pub name: String,
    #[serde(default)]
    pub variant_names: BTreeSet<String>,
}

impl ComponentCatalogEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variant_names: BTreeSet::new(),
        }
    }

    pub fn with_variants<I, S>(mut self, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variant_names.extend(variants.into_iter().map(Into::into));
        self
    }
}

/// JSX component names: a capital letter then letters or digits.
pub fn is_component_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_alphanumeric())
}

/// Merges duplicate names and drops entries that are not JSX identifiers.
pub fn normalize_catalog(entries: Vec<ComponentCatalogEntry>) -> Vec<ComponentCatalogEntry> {
    let mut merged: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for entry in entries {
        let name = entry.name.trim().to_string();
        if !is_component_name(&name) {
            tracing::warn!(name = %entry.name, "Ignoring invalid component name");
            continue;
        }
        merged
            .entry(name)
            .or_default()
            .extend(entry.variant_names.into_iter().filter(|v| !v.trim().is_empty()));
    }
    merged
        .into_iter()
        .map(|(name, variant_names)| ComponentCatalogEntry {
            name,
            variant_names,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct BuildPromptComposer {
    product_name: String,
    import_source: String,
    root_component: String,
}

impl BuildPromptComposer {
    pub fn new(product_name: impl Into<String>, config: &BuildConfig) -> Self {
        Self {
            product_name: product_name.into(),
            import_source: config.import_source.clone(),
            root_component: config.root_component.clone(),
        }
    }

    pub fn root_component(&self) -> &str {
        &self.root_component
    }

    fn preamble(&self) -> String {
        format!(
            "Eres un generador de interfaces con los componentes de {product}.\n\
Usa EXCLUSIVAMENTE los componentes de la lista COMPONENTES. Si la petición necesita un componente que no está en la lista, no lo uses; resuélvelo con elementos HTML nativos.\n\
Importa todos los componentes desde '{source}' con una sola sentencia import.\n\
El componente raíz debe llamarse {root} y exportarse por defecto.\n\
Usa las variantes indicadas para cada componente y las props documentadas en el CONTEXTO.\n\
Responde con exactamente un bloque de código ```jsx y nada más: sin explicaciones ni texto fuera del bloque.",
            product = self.product_name,
            source = self.import_source,
            root = self.root_component
        )
    }

    fn describe(entry: &ComponentCatalogEntry) -> String {
        if entry.variant_names.is_empty() {
            entry.name.clone()
        } else {
            let variants: Vec<&str> = entry.variant_names.iter().map(String::as_str).collect();
            format!("{} (variantes: {})", entry.name, variants.join(", "))
        }
    }

    /// `catalog` is expected to be normalised already.
    pub fn compose(
        &self,
        catalog: &[ComponentCatalogEntry],
        passages: &[RetrievalResult],
        request: &str,
    ) -> GenerationRequest {
        let preamble = self.preamble();
        let prompt = compose(PromptSections {
            preamble: &preamble,
            whitelist_heading: "COMPONENTES:",
            whitelist: catalog.iter().map(Self::describe).collect(),
            passages,
            request_heading: "PETICIÓN:",
            request,
        });
        GenerationRequest::from_prompt(prompt).with_temperature(BUILD_TEMPERATURE)
    }
}
