pub mod chat;
pub mod core;
pub mod docs;
pub mod llm;
pub mod postprocess;
pub mod prompt;
pub mod rag;
pub mod server;
pub mod state;
pub mod storybook;
pub mod vector_math;
