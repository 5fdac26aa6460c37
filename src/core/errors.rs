use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Failures of the retrieval and generation pipeline.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("io error: {0}")]
    Io(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("rate limited by backend")]
    RateLimit { retry_after: Option<Duration> },
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("index build failed: {0}")]
    IndexBuild(String),
}

impl AssistantError {
    pub fn io<E: std::fmt::Display>(err: E) -> Self {
        AssistantError::Io(err.to_string())
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, AssistantError::RateLimit { .. })
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rate limited")]
    RateLimited { retry_after_secs: u64 },
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Cooldown suggested to clients when the backend gives no `Retry-After`.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 15;

const RATE_LIMIT_MESSAGE: &str = "Rate limit alcanzado. Espera unos segundos.";
const GENERIC_FAILURE_MESSAGE: &str = "Error al procesar tu consulta";
const NOT_READY_MESSAGE: &str = "El índice de documentación no está disponible";

impl From<AssistantError> for ApiError {
    fn from(err: AssistantError) -> Self {
        match err {
            AssistantError::RateLimit { retry_after } => ApiError::RateLimited {
                retry_after_secs: retry_after
                    .map(ceil_secs)
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS),
            },
            AssistantError::IndexBuild(msg) => {
                tracing::error!("Index unavailable: {}", msg);
                ApiError::ServiceUnavailable(msg)
            }
            other => {
                tracing::error!("Request failed: {}", other);
                ApiError::Internal(other.to_string())
            }
        }
    }
}

/// Whole seconds, rounded up, never zero.
fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration
        .as_secs()
        .saturating_add(u64::from(duration.subsec_nanos() > 0));
    secs.max(1)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                [(axum::http::header::RETRY_AFTER, retry_after_secs.to_string())],
                Json(json!({
                    "error": RATE_LIMIT_MESSAGE,
                    "rate_limited": true,
                    "retry_after_secs": retry_after_secs,
                })),
            )
                .into_response(),
            // Details stay in the server log.
            ApiError::ServiceUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": NOT_READY_MESSAGE })),
            )
                .into_response(),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": GENERIC_FAILURE_MESSAGE })),
            )
                .into_response(),
        }
    }
}
