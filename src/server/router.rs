use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{chat, docs, health, query, storybook};
use crate::state::AppState;

/// Creates the application router.
///
/// Routes:
/// - `/health` and `/api/index/rebuild`
/// - docs listing and lookup
/// - grounded Q&A (`/api/query`) and component builds (`/api/build`)
/// - raw chat, its reset and model selection
/// - the cached Storybook catalog
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.config.server.cors_allowed_origins);
    Router::new()
        .route("/health", get(health::health))
        .route("/api/index/rebuild", post(health::rebuild_index))
        .route("/api/docs", get(docs::list_docs))
        .route("/api/docs/:slug", get(docs::get_doc))
        .route("/api/query", post(query::query))
        .route("/api/build", post(query::build))
        .route("/api/chat", post(chat::chat))
        .route("/api/clear", post(chat::clear))
        .route("/api/models", get(chat::list_models).post(chat::set_model))
        .route("/api/storybook/components", get(storybook::components))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(configured: &[String]) -> CorsLayer {
    let allowed_origins = resolve_allowed_origins(configured)
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(&origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn resolve_allowed_origins(configured: &[String]) -> Vec<String> {
    let origins = configured
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.trim_end_matches('/').to_string())
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return default_local_origins();
    }

    origins
}

fn default_local_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
        "http://localhost:6006".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:5173".to_string(),
        "http://127.0.0.1:6006".to_string(),
    ]
}
