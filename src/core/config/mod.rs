pub mod defaults;
pub mod paths;
pub mod service;
pub mod settings;
pub mod validation;

pub use paths::AppPaths;
pub use service::{require_api_key, ConfigService};
pub use settings::AppConfig;
