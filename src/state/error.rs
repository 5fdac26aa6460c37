use thiserror::Error;

use crate::core::errors::AssistantError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to initialize Gemini client: {0}")]
    Llm(#[source] AssistantError),

    #[error("Failed to initialize docs assistant: {0}")]
    Assistant(#[source] AssistantError),

    #[error("Failed to initialize Storybook catalog: {0}")]
    Storybook(#[source] AssistantError),
}
