use serde_json::{Map, Value};

use crate::core::errors::AssistantError;

pub fn validate_config(config: &Value) -> Result<(), AssistantError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_u64_field(server, "server.port", "port", 0, 65_535)?;
        validate_string_array_field(server, "server.cors_allowed_origins", "cors_allowed_origins")?;
    }

    if let Some(gemini) = expect_optional_object(root, "gemini")? {
        validate_u64_field(gemini, "gemini.timeout_secs", "timeout_secs", 1, 600)?;
        validate_u64_field(gemini, "gemini.embed_batch_size", "embed_batch_size", 1, 100)?;
        validate_u64_field(gemini, "gemini.embed_concurrency", "embed_concurrency", 1, 32)?;
        validate_string_array_field(gemini, "gemini.available_models", "available_models")?;
    }

    if let Some(docs) = expect_optional_object(root, "docs")? {
        if let Some(categories) = expect_optional_object(docs, "categories")? {
            validate_string_array_field(categories, "docs.categories.foundations", "foundations")?;
            validate_string_array_field(categories, "docs.categories.components", "components")?;
        }
    }

    if let Some(rag) = expect_optional_object(root, "rag")? {
        validate_u64_field(rag, "rag.chunk_min_chars", "chunk_min_chars", 0, 100_000)?;
        validate_u64_field(rag, "rag.chunk_max_chars", "chunk_max_chars", 64, 1_000_000)?;
        validate_u64_field(rag, "rag.qa_top_k", "qa_top_k", 1, 100)?;
        validate_u64_field(rag, "rag.build_top_k", "build_top_k", 1, 100)?;

        let min = rag.get("chunk_min_chars").and_then(Value::as_u64);
        let max = rag.get("chunk_max_chars").and_then(Value::as_u64);
        if let (Some(min), Some(max)) = (min, max) {
            if min >= max {
                return Err(AssistantError::Config(
                    "rag.chunk_min_chars must be smaller than rag.chunk_max_chars".to_string(),
                ));
            }
        }
    }

    if let Some(chat) = expect_optional_object(root, "chat")? {
        validate_u64_field(chat, "chat.cooldown_secs", "cooldown_secs", 0, 3_600)?;
    }

    if let Some(storybook) = expect_optional_object(root, "storybook")? {
        validate_u64_field(storybook, "storybook.cache_ttl_secs", "cache_ttl_secs", 0, 86_400)?;
        validate_u64_field(storybook, "storybook.timeout_secs", "timeout_secs", 1, 600)?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    map: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, AssistantError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(obj)) => Ok(Some(obj)),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_u64_field(
    map: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), AssistantError> {
    let Some(value) = map.get(key) else {
        return Ok(());
    };
    let number = value
        .as_u64()
        .ok_or_else(|| config_type_error(path, "non-negative integer"))?;
    if number < min || number > max {
        return Err(AssistantError::Config(format!(
            "{} must be between {} and {} (got {})",
            path, min, max, number
        )));
    }
    Ok(())
}

fn validate_string_array_field(
    map: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), AssistantError> {
    let Some(value) = map.get(key) else {
        return Ok(());
    };
    let items = value
        .as_array()
        .ok_or_else(|| config_type_error(path, "array of strings"))?;
    if items.iter().any(|item| !item.is_string()) {
        return Err(config_type_error(path, "array of strings"));
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> AssistantError {
    AssistantError::Config(format!("{} must be a {}", path, expected))
}
