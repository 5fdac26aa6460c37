use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::AppConfig;
use super::validation::validate_config;
use crate::core::errors::AssistantError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 6] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "credential",
    "bearer",
];

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("MINDSET_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Raw merged tree of `config.yml` and `secrets.yaml`.
    pub fn load_raw(&self) -> Value {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.secrets_path());
        deep_merge(&public_config, &secrets_config)
    }

    pub fn load_config(&self) -> Result<AppConfig, AssistantError> {
        let raw = self.load_raw();
        let config = parse_config(&raw)?;
        Ok(apply_env_overrides(config, |key| env::var(key).ok()))
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

pub fn parse_config(raw: &Value) -> Result<AppConfig, AssistantError> {
    validate_config(raw)?;
    serde_json::from_value(raw.clone())
        .map_err(|e| AssistantError::Config(format!("invalid configuration: {}", e)))
}

/// Environment wins over files for the credential, port and model.
pub fn apply_env_overrides<F>(mut config: AppConfig, lookup: F) -> AppConfig
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup(API_KEY_ENV).filter(|v| !v.trim().is_empty()) {
        config.gemini.api_key = Some(key.trim().to_string());
    }
    if let Some(port) = lookup("PORT").and_then(|v| v.parse::<u16>().ok()) {
        config.server.port = port;
    }
    if let Some(model) = lookup("GEMINI_MODEL").filter(|v| !v.trim().is_empty()) {
        config.gemini.default_model = model;
    }
    config
}

/// Returns the backend credential or the error that aborts startup.
pub fn require_api_key(config: &AppConfig) -> Result<String, AssistantError> {
    config
        .gemini
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AssistantError::Config(format!("{} no está configurada", API_KEY_ENV)))
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => Value::Object(Map::new()),
            Err(err) => {
                tracing::warn!("Ignoring malformed YAML in {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(_) => Value::Object(Map::new()),
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    SENSITIVE_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn secrets_override_public_values() {
        let public = json!({ "gemini": { "default_model": "a", "timeout_secs": 30 } });
        let secrets = json!({ "gemini": { "api_key": "k" } });
        let merged = deep_merge(&public, &secrets);
        assert_eq!(merged["gemini"]["default_model"], "a");
        assert_eq!(merged["gemini"]["api_key"], "k");
    }

    #[test]
    fn parse_fills_defaults() {
        let config = parse_config(&json!({ "rag": { "qa_top_k": 8 } })).unwrap();
        assert_eq!(config.rag.qa_top_k, 8);
        assert_eq!(config.rag.build_top_k, 3);
        assert_eq!(config.build.import_source, "@mindset/ui");
        assert!(config.docs.categories.components.contains(&"button".to_string()));
    }

    #[test]
    fn env_overrides_credential_and_port() {
        let config = apply_env_overrides(AppConfig::default(), |key| match key {
            API_KEY_ENV => Some(" secret ".to_string()),
            "PORT" => Some("8081".to_string()),
            _ => None,
        });
        assert_eq!(require_api_key(&config).unwrap(), "secret");
        assert_eq!(config.server.port, 8081);
    }

    #[test]
    fn missing_credential_is_config_error() {
        let err = require_api_key(&AppConfig::default()).unwrap_err();
        assert!(matches!(err, AssistantError::Config(_)));
    }

    #[test]
    fn redacts_api_key() {
        let redacted = redact_sensitive_values(&json!({ "gemini": { "api_key": "k", "timeout_secs": 3 } }));
        assert_eq!(redacted["gemini"]["api_key"], REDACT_PLACEHOLDER);
        assert_eq!(redacted["gemini"]["timeout_secs"], 3);
    }
}
