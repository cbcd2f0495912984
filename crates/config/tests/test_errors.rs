//! Tests for config error paths

use chameleon_config::{Config, ConfigError};
use std::collections::HashMap;
use tempfile::TempDir;

/// A section with a wrongly typed field fails the whole load
#[tokio::test]
async fn test_load_rejects_mistyped_section_value() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("config.json");
    tokio::fs::write(&path, r#"{"agent": {"max_iterations": "ten"}}"#)
        .await
        .unwrap();

    let err = Config::load_from(&path).await.unwrap_err();

    assert!(matches!(err, ConfigError::Json(_)));
    let display = err.to_string();
    assert!(display.starts_with("CONFIG PARSE ERROR"));
    assert!(display.contains("line 1"));
}

/// A truncated document reports end of input
#[tokio::test]
async fn test_load_rejects_unterminated_document() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("config.json");
    tokio::fs::write(&path, r#"{"cluster": {"namespace": "shop""#)
        .await
        .unwrap();

    match Config::load_from(&path).await {
        Err(ConfigError::Json(e)) => assert!(e.is_eof()),
        other => panic!("Expected Json error, got {:?}", other),
    }
}

/// A directory in place of the config file surfaces as an I/O error
#[tokio::test]
async fn test_load_from_directory_is_io_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let err = Config::load_from(temp_dir.path()).await.unwrap_err();

    assert!(matches!(err, ConfigError::Io(_)));
    assert!(err.to_string().starts_with("CONFIG I/O ERROR"));
}

/// An unparsable MAX_ITERATIONS is skipped while valid keys still apply
#[test]
fn test_apply_env_skips_unparsable_iterations() {
    let vars: HashMap<&str, &str> = [
        ("MAX_ITERATIONS", "-3"),
        ("K8S_NAMESPACE", "payments"),
        ("ALLOW_DESTRUCTIVE_COMMANDS", "true"),
    ]
    .into_iter()
    .collect();

    let mut config = Config::default();
    config.agent.max_iterations = 7;
    config.apply_env_with(|key| vars.get(key).map(|v| v.to_string()));

    assert_eq!(config.agent.max_iterations, 7);
    assert_eq!(config.cluster.namespace, "payments");
    assert!(config.cluster.allow_destructive_commands);
}

/// Saving beneath a path that is a regular file cannot create the parent
#[tokio::test]
async fn test_save_to_fails_when_parent_is_a_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let blocker = temp_dir.path().join("not-a-dir");
    tokio::fs::write(&blocker, "occupied").await.unwrap();

    let err = Config::default()
        .save_to(&blocker.join("config.json"))
        .await
        .unwrap_err();

    assert!(matches!(err, ConfigError::Io(_)));
    assert_eq!(tokio::fs::read_to_string(&blocker).await.unwrap(), "occupied");
}

/// Saving into a read-only directory fails with an I/O error
#[cfg(unix)]
#[tokio::test]
async fn test_save_to_fails_under_read_only_parent() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let locked = temp_dir.path().join("locked");
    std::fs::create_dir(&locked).unwrap();
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

    // Root ignores directory permissions
    let writable = std::fs::write(locked.join(".check"), "").is_ok();
    let result = Config::default().save_to(&locked.join("config.json")).await;
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

    if !writable {
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
