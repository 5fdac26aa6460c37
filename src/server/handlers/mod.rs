pub mod chat;
pub mod docs;
pub mod health;
pub mod query;
pub mod storybook;

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::core::errors::{ApiError, AssistantError};

/// Unwraps a JSON body, turning extractor rejections into a 400 with our
/// error shape.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// Trimmed, non-empty text or a 400 carrying `message`.
pub(crate) fn required_text(value: Option<String>, message: &str) -> Result<String, ApiError> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

/// An unknown model name is the caller's mistake, not ours.
pub(crate) fn model_error(err: AssistantError) -> ApiError {
    match err {
        AssistantError::Config(msg) => ApiError::BadRequest(msg),
        other => other.into(),
    }
}
