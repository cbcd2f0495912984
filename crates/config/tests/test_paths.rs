//! Tests for path utilities

use chameleon_config::paths::{ensure_dir, expand_home};

use tempfile::TempDir;

/// Helper to create a temporary directory
fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_expand_home_with_tilde_prefix() {
    let home = dirs::home_dir().expect("home dir");
    assert_eq!(expand_home("~/runs"), home.join("runs"));
}

#[test]
fn test_expand_home_bare_tilde() {
    let home = dirs::home_dir().expect("home dir");
    assert_eq!(expand_home("~"), home);
}

#[test]
fn test_expand_home_leaves_absolute_and_relative_paths() {
    assert_eq!(
        expand_home("/var/lib/chameleon"),
        std::path::PathBuf::from("/var/lib/chameleon")
    );
    assert_eq!(expand_home("data/store.json"), std::path::PathBuf::from("data/store.json"));
    assert_eq!(expand_home("~user/x"), std::path::PathBuf::from("~user/x"));
}

#[tokio::test]
async fn test_ensure_dir_creates_nested() {
    let tmp = temp_dir();
    let nested = tmp.path().join("a").join("b").join("c");

    ensure_dir(&nested).await.expect("create");
    assert!(nested.is_dir());

    // Second call is a no-op
    ensure_dir(&nested).await.expect("create again");
}

#[test]
fn test_all_dirs_under_data_dir() {
    use chameleon_config::paths::*;

    let root = data_dir();
    assert!(root.ends_with(".chameleon"));
    assert!(config_path().starts_with(&root));
    assert!(runs_dir().starts_with(&root));
    assert!(knowledge_dir().starts_with(&root));
    assert_eq!(config_path().file_name().unwrap(), "config.json");
}
