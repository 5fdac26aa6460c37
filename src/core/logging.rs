//! Console plus daily rolling file output under `AppPaths::log_dir`.

use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::AppPaths;

pub const LOG_FILE_PREFIX: &str = "mindset-docs.log";
/// Checked before `RUST_LOG`.
pub const LOG_FILTER_ENV: &str = "MINDSET_LOG";
const DEFAULT_FILTER: &str = "info,tower_http=debug";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

pub fn init(paths: &AppPaths) {
    let filter = resolve_filter(
        std::env::var(LOG_FILTER_ENV).ok(),
        std::env::var("RUST_LOG").ok(),
    );
    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);

    let file_layer = match std::fs::create_dir_all(&paths.log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(&paths.log_dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = LOG_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(writer),
            )
        }
        Err(err) => {
            eprintln!(
                "Cannot create log directory {}: {}; logging to stdout only",
                paths.log_dir.display(),
                err
            );
            None
        }
    };

    // A second init keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init();
}

/// First parseable directive wins; otherwise [`DEFAULT_FILTER`].
fn resolve_filter(primary: Option<String>, fallback: Option<String>) -> EnvFilter {
    [primary, fallback]
        .into_iter()
        .flatten()
        .filter(|directives| !directives.trim().is_empty())
        .find_map(|directives| EnvFilter::try_new(directives.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}
