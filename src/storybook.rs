//! Cached view of the published Storybook's `index.json`.
//!
//! Stories are grouped into components by the last segment of their title
//! (`Components/Button` -> `Button`). The snapshot is kept for the configured
//! TTL; refreshes happen under a lock so an expiry triggers one fetch. If a
//! refresh fails the previous snapshot keeps being served for another TTL
//! before the next attempt.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::core::config::settings::StorybookConfig;
use crate::core::errors::AssistantError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorybookStory {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorybookComponent {
    pub name: String,
    pub stories: Vec<StorybookStory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogSnapshot {
    pub url: String,
    pub components: Vec<StorybookComponent>,
    /// Fetch time, milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// Storybook 7+ writes `entries`, older versions `stories`.
#[derive(Debug, Deserialize)]
struct IndexFile {
    #[serde(default)]
    entries: HashMap<String, IndexEntry>,
    #[serde(default)]
    stories: HashMap<String, IndexEntry>,
}

#[derive(Debug, Deserialize)]
struct IndexEntry {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type", default)]
    entry_type: Option<String>,
}

struct CachedSnapshot {
    fetched_at: Instant,
    snapshot: Arc<CatalogSnapshot>,
}

pub struct StorybookCatalog {
    client: Client,
    url: String,
    ttl: Duration,
    cache: Mutex<Option<CachedSnapshot>>,
}

impl StorybookCatalog {
    pub fn new(config: &StorybookConfig) -> Result<Self, AssistantError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AssistantError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            ttl: Duration::from_secs(config.cache_ttl_secs),
            cache: Mutex::new(None),
        })
    }

    pub async fn components(&self) -> Result<Arc<CatalogSnapshot>, AssistantError> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(cached.snapshot.clone());
            }
        }

        match self.fetch().await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                tracing::info!(
                    components = snapshot.components.len(),
                    "Storybook catalog refreshed"
                );
                *cache = Some(CachedSnapshot {
                    fetched_at: Instant::now(),
                    snapshot: snapshot.clone(),
                });
                Ok(snapshot)
            }
            Err(err) => match cache.as_mut() {
                Some(stale) => {
                    tracing::warn!("Storybook refresh failed, serving stale catalog: {}", err);
                    stale.fetched_at = Instant::now();
                    Ok(stale.snapshot.clone())
                }
                None => Err(err),
            },
        }
    }

    async fn fetch(&self) -> Result<CatalogSnapshot, AssistantError> {
        let index_url = format!("{}/index.json", self.url);
        let res = self
            .client
            .get(&index_url)
            .send()
            .await
            .map_err(|e| AssistantError::Io(format!("storybook request failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            return Err(AssistantError::Io(format!(
                "storybook returned {} for {}",
                status, index_url
            )));
        }

        let index: IndexFile = res
            .json()
            .await
            .map_err(|e| AssistantError::Io(format!("invalid storybook index: {}", e)))?;

        Ok(CatalogSnapshot {
            url: self.url.clone(),
            components: group_components(index),
            timestamp: chrono::Utc::now().timestamp_millis(),
        })
    }
}

fn group_components(index: IndexFile) -> Vec<StorybookComponent> {
    let IndexFile { entries, stories } = index;
    let mut grouped: BTreeMap<String, Vec<StorybookStory>> = BTreeMap::new();

    for entry in entries.into_values().chain(stories.into_values()) {
        if entry.entry_type.as_deref().is_some_and(|t| t != "story") {
            continue;
        }
        let Some(title) = entry.title.or(entry.kind) else {
            continue;
        };
        let Some(component) = title
            .rsplit('/')
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            continue;
        };
        let name = entry.name.unwrap_or_else(|| entry.id.clone());
        grouped
            .entry(component.to_string())
            .or_default()
            .push(StorybookStory { id: entry.id, name });
    }

    grouped
        .into_iter()
        .map(|(name, mut stories)| {
            stories.sort_by(|a, b| a.id.cmp(&b.id));
            stories.dedup_by(|a, b| a.id == b.id);
            StorybookComponent { name, stories }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn catalog_for(server: &MockServer, ttl_secs: u64) -> StorybookCatalog {
        StorybookCatalog::new(&StorybookConfig {
            url: format!("{}/", server.uri()),
            cache_ttl_secs: ttl_secs,
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn v5_index() -> serde_json::Value {
        json!({
            "v": 5,
            "entries": {
                "components-button--primary": {
                    "id": "components-button--primary", "title": "Components/Button",
                    "name": "Primary", "type": "story"
                },
                "components-button--ghost": {
                    "id": "components-button--ghost", "title": "Components/Button",
                    "name": "Ghost", "type": "story"
                },
                "components-button--docs": {
                    "id": "components-button--docs", "title": "Components/Button",
                    "name": "Docs", "type": "docs"
                },
                "components-avatar--default": {
                    "id": "components-avatar--default", "title": "Components/Avatar",
                    "name": "Default", "type": "story"
                }
            }
        })
    }

    #[tokio::test]
    async fn groups_stories_by_component() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(v5_index()))
            .mount(&server)
            .await;

        let snapshot = catalog_for(&server, 300).components().await.unwrap();
        let names: Vec<&str> = snapshot.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Avatar", "Button"]);
        let button = &snapshot.components[1];
        assert_eq!(
            button.stories,
            vec![
                StorybookStory {
                    id: "components-button--ghost".to_string(),
                    name: "Ghost".to_string()
                },
                StorybookStory {
                    id: "components-button--primary".to_string(),
                    name: "Primary".to_string()
                },
            ]
        );
        assert_eq!(snapshot.url, server.uri());
    }

    #[tokio::test]
    async fn reads_legacy_stories_format() {
        let server = MockServer::start().await;
        let body = json!({
            "v": 3,
            "stories": {
                "badge--dot": { "id": "badge--dot", "kind": "Components/Badge", "name": "Dot" }
            }
        });
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let snapshot = catalog_for(&server, 300).components().await.unwrap();
        assert_eq!(snapshot.components.len(), 1);
        assert_eq!(snapshot.components[0].name, "Badge");
    }

    #[tokio::test]
    async fn cache_serves_within_ttl() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(v5_index()))
            .expect(1)
            .mount(&server)
            .await;

        let catalog = Arc::new(catalog_for(&server, 300));
        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let catalog = catalog.clone();
                tokio::spawn(async move { catalog.components().await.map(|s| s.components.len()) })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 2);
        }
    }

    #[tokio::test]
    async fn failed_refresh_serves_stale_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(v5_index()))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let catalog = catalog_for(&server, 0);
        let first = catalog.components().await.unwrap();
        let second = catalog.components().await.unwrap();
        assert_eq!(first.timestamp, second.timestamp);
    }

    #[tokio::test]
    async fn failed_refresh_waits_a_full_ttl_before_retrying() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(v5_index()))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let catalog = catalog_for(&server, 1);
        let first = catalog.components().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1_100)).await;

        let second = catalog.components().await.unwrap();
        let third = catalog.components().await.unwrap();
        assert_eq!(first.timestamp, second.timestamp);
        assert_eq!(second.timestamp, third.timestamp);
    }

    #[tokio::test]
    async fn failure_without_cache_is_io_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = catalog_for(&server, 300).components().await.unwrap_err();
        assert!(matches!(err, AssistantError::Io(_)));
    }
}
