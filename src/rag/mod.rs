//! Retrieval-augmented generation over the documentation corpus.
//!
//! - `MarkdownChunker`: heading-aware chunking of documents
//! - `EmbeddingIndex`: in-memory vectors with cosine ranking
//! - `IndexHandle`: single-flight lazy build and invalidation
//! - `Retriever`: question to top-K passages
//! - `DocsAssistant`: Q&A and build pipelines on top of the above

pub mod chunker;
pub mod handle;
pub mod index;
pub mod pipeline;
pub mod retriever;

#[cfg(test)]
pub(crate) mod test_support;

pub use chunker::{Chunk, ChunkerConfig, MarkdownChunker};
pub use handle::{IndexBuilder, IndexHandle, IndexStatus};
pub use index::{BuildOptions, EmbeddingIndex, RetrievalResult};
pub use pipeline::{BuildOutput, DocsAssistant};
pub use retriever::Retriever;
