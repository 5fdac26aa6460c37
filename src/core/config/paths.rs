use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub docs_dir: PathBuf,
    pub log_dir: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        Self::from_root(project_root)
    }

    /// Lays out all paths relative to `project_root`, honouring env overrides.
    pub fn from_root(project_root: PathBuf) -> Self {
        let docs_dir = discover_docs_dir(&project_root);
        let log_dir = env::var("MINDSET_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| project_root.join("logs"));
        let secrets_path = project_root.join("secrets.yaml");

        let _ = fs::create_dir_all(&log_dir);

        AppPaths {
            project_root,
            docs_dir,
            log_dir,
            secrets_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("MINDSET_ROOT") {
        return PathBuf::from(root);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").exists() || manifest_dir.join("docs").is_dir() {
        return manifest_dir;
    }

    env::current_dir().unwrap_or(manifest_dir)
}

fn discover_docs_dir(project_root: &Path) -> PathBuf {
    if let Ok(dir) = env::var("MINDSET_DOCS_DIR") {
        return PathBuf::from(dir);
    }
    project_root.join("docs")
}
