pub mod gemini;
pub mod provider;
pub mod service;
pub mod types;

pub use gemini::GeminiClient;
pub use provider::{EmbeddingProvider, LlmProvider};
pub use service::LlmService;
pub use types::{ChatMessage, EmbedTask, GenerationRequest, Role};
