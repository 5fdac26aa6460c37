//! Typed view over the merged `config.yml` + `secrets.yaml` tree.

use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub gemini: GeminiConfig,
    pub docs: DocsConfig,
    pub rag: RagConfig,
    pub build: BuildConfig,
    pub chat: ChatConfig,
    pub storybook: StorybookConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub embedding_model: String,
    pub default_model: String,
    pub available_models: Vec<String>,
    pub timeout_secs: u64,
    /// Texts per `batchEmbedContents` call.
    pub embed_batch_size: usize,
    /// Batches in flight at once during an index build.
    pub embed_concurrency: usize,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: defaults::GEMINI_BASE_URL.to_string(),
            embedding_model: defaults::EMBEDDING_MODEL.to_string(),
            default_model: defaults::DEFAULT_CHAT_MODEL.to_string(),
            available_models: defaults::available_models(),
            timeout_secs: 60,
            embed_batch_size: 100,
            embed_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    /// Prefix of titles written as `# <product_name> - <Title>`.
    pub product_name: String,
    pub categories: CategoryConfig,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            product_name: defaults::PRODUCT_NAME.to_string(),
            categories: CategoryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    pub foundations: Vec<String>,
    pub components: Vec<String>,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            foundations: defaults::foundation_slugs(),
            components: defaults::component_slugs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub chunk_min_chars: usize,
    pub chunk_max_chars: usize,
    pub qa_top_k: usize,
    pub build_top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_min_chars: 200,
            chunk_max_chars: 2_000,
            qa_top_k: 5,
            build_top_k: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub import_source: String,
    pub root_component: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            import_source: defaults::IMPORT_SOURCE.to_string(),
            root_component: "App".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub cooldown_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { cooldown_secs: 15 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorybookConfig {
    pub url: String,
    pub cache_ttl_secs: u64,
    pub timeout_secs: u64,
}

impl Default for StorybookConfig {
    fn default() -> Self {
        Self {
            url: defaults::STORYBOOK_URL.to_string(),
            cache_ttl_secs: 300,
            timeout_secs: 10,
        }
    }
}
