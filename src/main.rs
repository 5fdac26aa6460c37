use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use mindset_docs::core::config::{require_api_key, AppPaths, ConfigService};
use mindset_docs::core::logging;
use mindset_docs::server;
use mindset_docs::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let config_service = ConfigService::new(paths.clone());
    let config = config_service
        .load_config()
        .context("Failed to load configuration")?;
    let effective = serde_json::to_value(&config).unwrap_or_default();
    tracing::debug!(
        config = %config_service.redact_sensitive_values(&effective),
        path = %config_service.config_path().display(),
        "Configuration loaded"
    );

    let api_key = match require_api_key(&config) {
        Ok(key) => key,
        Err(err) => {
            tracing::error!("{}", err);
            eprintln!("Error: {}", err);
            std::process::exit(1);
        }
    };

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::initialize(paths, config, &api_key)?;
    state.warm_up();

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on http://{}", addr);

    let app: Router = server::router::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
