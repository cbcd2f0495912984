//! Data directory layout

use std::path::PathBuf;

/// Root data directory (~/.chameleon), or ./.chameleon without a home
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".chameleon"))
        .unwrap_or_else(|| PathBuf::from(".chameleon"))
}

/// Config file location
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Audit records of finished runs
pub fn runs_dir() -> PathBuf {
    data_dir().join("runs")
}

/// Local knowledge store
pub fn knowledge_dir() -> PathBuf {
    data_dir().join("knowledge")
}

/// Expand a leading `~` against the home directory
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Ensure directory exists
pub async fn ensure_dir(path: &PathBuf) -> std::io::Result<()> {
    tokio::fs::create_dir_all(path).await
}
