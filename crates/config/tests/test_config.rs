//! Tests for Config serialization, deserialization, and core functionality

use chameleon_config::{
    AgentConfig, AlertConfig, AuditConfig, ClusterConfig, Config, InferenceConfig,
    KnowledgeConfig,
};
use tempfile::TempDir;

/// Helper to create a temporary directory for tests
fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Test that default Config has expected values
#[test]
fn test_config_defaults() {
    let config = Config::default();

    assert_eq!(config.inference.host, "http://localhost:11434");
    assert_eq!(config.inference.model, "llama3.2:3b");
    assert_eq!(config.inference.temperature, 0.1);
    assert_eq!(config.inference.max_tokens, 2048);
    assert_eq!(config.inference.timeout_secs, 120);

    assert_eq!(config.agent.max_iterations, 10);
    assert_eq!(config.agent.max_consecutive_errors, 5);
    assert_eq!(
        config.agent.completion_keywords,
        vec!["complete", "done", "finished", "resolved"]
    );
    assert_eq!(config.agent.knowledge_context_entries, 2);

    assert_eq!(config.cluster.kubectl_path, "kubectl");
    assert_eq!(config.cluster.namespace, "default");
    assert_eq!(config.cluster.command_timeout_secs, 30);
    assert_eq!(config.cluster.max_output_lines, 50);
    assert!(!config.cluster.allow_destructive_commands);
    assert!(!config.cluster.dry_run);
    assert_eq!(
        config.cluster.destructive_verbs,
        vec!["delete", "drain", "cordon", "taint"]
    );

    assert_eq!(config.knowledge.top_k, 3);
    assert_eq!(config.knowledge.min_relevance, 0.0);
    assert_eq!(config.knowledge.max_context_length, 2000);
    assert_eq!(config.knowledge.query_timeout_ms, 2000);

    assert!(config.alerts.enabled);
    assert!(config.audit.enabled);
}

/// Section defaults agree with the root defaults
#[test]
fn test_section_defaults_match_root() {
    let config = Config::default();
    assert_eq!(
        InferenceConfig::default().model,
        config.inference.model
    );
    assert_eq!(
        AgentConfig::default().max_iterations,
        config.agent.max_iterations
    );
    assert_eq!(
        ClusterConfig::default().namespace,
        config.cluster.namespace
    );
    assert_eq!(KnowledgeConfig::default().top_k, config.knowledge.top_k);
    assert_eq!(AlertConfig::default().enabled, config.alerts.enabled);
    assert_eq!(AuditConfig::default().dir, config.audit.dir);
}

/// Empty JSON yields all defaults
#[test]
fn test_config_deserialization_empty_object() {
    let config: Config = serde_json::from_str("{}").expect("parse");
    assert_eq!(config.agent.max_iterations, 10);
    assert_eq!(config.cluster.namespace, "default");
}

/// Partial sections keep defaults for the missing fields
#[test]
fn test_config_deserialization_partial() {
    let json = r#"{
        "cluster": { "namespace": "production", "dry_run": true },
        "agent": { "max_iterations": 3 }
    }"#;

    let config: Config = serde_json::from_str(json).expect("parse");

    assert_eq!(config.cluster.namespace, "production");
    assert!(config.cluster.dry_run);
    assert_eq!(config.cluster.command_timeout_secs, 30);
    assert_eq!(config.agent.max_iterations, 3);
    assert_eq!(config.agent.max_consecutive_errors, 5);
    assert_eq!(config.inference.model, "llama3.2:3b");
}

#[test]
fn test_config_roundtrip() {
    let mut config = Config::default();
    config.inference.model = "qwen2.5:7b".to_string();
    config.cluster.allow_destructive_commands = true;
    config.knowledge.min_relevance = 0.4;

    let json = serde_json::to_string(&config).expect("serialize");
    let back: Config = serde_json::from_str(&json).expect("deserialize");

    assert_eq!(back.inference.model, "qwen2.5:7b");
    assert!(back.cluster.allow_destructive_commands);
    assert_eq!(back.knowledge.min_relevance, 0.4);
}

#[tokio::test]
async fn test_config_save_load_roundtrip() {
    let tmp = temp_dir();
    let config_path = tmp.path().join("config.json");

    let mut config = Config::default();
    config.cluster.namespace = "payments".to_string();
    config.agent.max_consecutive_errors = 2;

    config.save_to(&config_path).await.expect("Failed to save");
    let loaded = Config::load_from(&config_path)
        .await
        .expect("Failed to load");

    assert_eq!(loaded.cluster.namespace, "payments");
    assert_eq!(loaded.agent.max_consecutive_errors, 2);
}

#[tokio::test]
async fn test_config_load_nonexistent_returns_default() {
    let tmp = temp_dir();
    let config_path = tmp.path().join("missing.json");

    let config = Config::load_from(&config_path)
        .await
        .expect("Should return default");

    assert_eq!(config.inference.host, "http://localhost:11434");
}

#[tokio::test]
async fn test_config_save_creates_directories() {
    let tmp = temp_dir();
    let config_path = tmp.path().join("nested").join("dir").join("config.json");

    Config::default()
        .save_to(&config_path)
        .await
        .expect("Failed to save");

    assert!(config_path.exists());
}

#[tokio::test]
async fn test_config_save_pretty_json() {
    let tmp = temp_dir();
    let config_path = tmp.path().join("config.json");

    Config::default().save_to(&config_path).await.expect("save");
    let content = tokio::fs::read_to_string(&config_path).await.expect("read");

    assert!(content.contains('\n'));
    assert!(content.contains("\"max_iterations\": 10"));
}

#[test]
fn test_resolved_paths_expand_home() {
    let home = dirs::home_dir().expect("home dir");
    let config = Config::default();

    assert_eq!(
        config.store_path(),
        home.join(".chameleon/knowledge/store.json")
    );
    assert_eq!(config.audit_dir(), home.join(".chameleon/runs"));
}
