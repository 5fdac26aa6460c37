//! Documentation corpus: loading, titles and categories.

pub mod catalog;
pub mod store;

pub use catalog::{Category, CategoryTable};
pub use store::{Document, DocumentStore, DocumentSummary, TitleExtractor};
