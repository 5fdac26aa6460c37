pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const EMBEDDING_MODEL: &str = "text-embedding-004";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.0-flash-001";
pub const PRODUCT_NAME: &str = "MindSet Design System";
pub const IMPORT_SOURCE: &str = "@mindset/ui";
pub const STORYBOOK_URL: &str = "https://sirlund.github.io/mindset-design-system";

pub fn available_models() -> Vec<String> {
    [
        "gemini-2.0-flash-001",
        "gemini-2.0-flash-lite-001",
        "gemini-2.5-flash",
        "gemini-2.5-pro",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

pub fn foundation_slugs() -> Vec<String> {
    ["design-tokens", "typography", "shadows", "icons"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn component_slugs() -> Vec<String> {
    ["avatar", "badge", "banner", "button", "thumbnail"]
        .into_iter()
        .map(str::to_string)
        .collect()
}
