//! Markdown corpus loader.
//!
//! Every `*.md` file in the docs directory becomes one [`Document`]. The slug
//! is the file stem, the category comes from the [`CategoryTable`] and the
//! title from the first matching level-1 heading.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Serialize;

use super::catalog::{Category, CategoryTable};
use crate::core::errors::AssistantError;

pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub category: Category,
    pub title: String,
    pub raw_text: String,
}

/// Listing row for `GET /api/docs`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DocumentSummary {
    pub slug: String,
    pub title: String,
    pub category: Category,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            slug: doc.id.clone(),
            title: doc.title.clone(),
            category: doc.category,
        }
    }
}

/// Title lookup in fixed order: `# <product> - <title>`, then any `# heading`,
/// then [`UNTITLED`].
#[derive(Debug, Clone)]
pub struct TitleExtractor {
    product_heading: Option<Regex>,
    first_heading: Option<Regex>,
}

impl TitleExtractor {
    pub fn new(product_name: &str) -> Self {
        let product_heading = Regex::new(&format!(
            r"(?m)^#[ \t]+{}[ \t]+-[ \t]+(.+?)[ \t]*\r?$",
            regex::escape(product_name.trim())
        ))
        .ok();
        let first_heading = Regex::new(r"(?m)^#[ \t]+(.+?)[ \t]*\r?$").ok();
        Self {
            product_heading,
            first_heading,
        }
    }

    pub fn extract(&self, content: &str) -> String {
        let captured = |re: &Option<Regex>| {
            re.as_ref()
                .and_then(|re| re.captures(content))
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|title| !title.is_empty())
        };

        captured(&self.product_heading)
            .or_else(|| captured(&self.first_heading))
            .unwrap_or_else(|| UNTITLED.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
    categories: CategoryTable,
    titles: TitleExtractor,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>, categories: CategoryTable, titles: TitleExtractor) -> Self {
        Self {
            root: root.into(),
            categories,
            titles,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loads every eligible document, ordered by slug.
    pub async fn load_all(&self) -> Result<Vec<Document>, AssistantError> {
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            AssistantError::Io(format!(
                "cannot read docs directory {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let mut documents = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(AssistantError::io)? {
            let path = entry.path();
            let Some(slug) = markdown_slug(&path) else {
                continue;
            };
            let is_file = entry
                .file_type()
                .await
                .map(|ft| ft.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
                AssistantError::Io(format!("cannot read {}: {}", path.display(), e))
            })?;
            documents.push(self.build_document(slug, content));
        }

        if documents.is_empty() {
            return Err(AssistantError::Io(format!(
                "no markdown documents found in {}",
                self.root.display()
            )));
        }

        documents.sort_by(|a, b| a.id.cmp(&b.id));
        tracing::info!("Loaded {} documents", documents.len());
        Ok(documents)
    }

    /// Sorted listing: category order, then title.
    pub async fn list(&self) -> Result<Vec<DocumentSummary>, AssistantError> {
        let mut summaries: Vec<DocumentSummary> = self
            .load_all()
            .await?
            .iter()
            .map(DocumentSummary::from)
            .collect();
        summaries.sort_by(compare_summaries);
        Ok(summaries)
    }

    /// Reads one document by slug. `Ok(None)` when it does not exist.
    pub async fn get(&self, slug: &str) -> Result<Option<Document>, AssistantError> {
        if !is_valid_slug(slug) {
            return Ok(None);
        }
        let path = self.root.join(format!("{}.md", slug));
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(self.build_document(slug.to_string(), content))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(AssistantError::Io(format!(
                "cannot read {}: {}",
                path.display(),
                err
            ))),
        }
    }

    fn build_document(&self, slug: String, content: String) -> Document {
        Document {
            category: self.categories.category_for(&slug),
            title: self.titles.extract(&content),
            id: slug,
            raw_text: content,
        }
    }
}

fn markdown_slug(path: &Path) -> Option<String> {
    if path.extension().and_then(|ext| ext.to_str()) != Some("md") {
        return None;
    }
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}

fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn compare_summaries(a: &DocumentSummary, b: &DocumentSummary) -> Ordering {
    a.category
        .rank()
        .cmp(&b.category.rank())
        .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        .then_with(|| a.title.cmp(&b.title))
}
