//! Configuration management for Chameleon
//!
//! One immutable [`Config`] is loaded per process and handed to every
//! component explicitly. Nothing in the workspace reads settings from globals.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod paths;

pub use paths::{config_path, data_dir, expand_home, knowledge_dir, runs_dir};

/// Errors in configuration handling
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("CONFIG I/O ERROR: {0}")]
    Io(#[from] std::io::Error),

    #[error("CONFIG PARSE ERROR: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Inference collaborator (Ollama) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_inference_timeout")]
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_inference_timeout(),
        }
    }
}

fn default_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_inference_timeout() -> u64 {
    120
}

/// Control loop bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: usize,
    #[serde(default = "default_completion_keywords")]
    pub completion_keywords: Vec<String>,
    /// How many of the most recent knowledge entries go into each prompt
    #[serde(default = "default_knowledge_context_entries")]
    pub knowledge_context_entries: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_consecutive_errors: default_max_consecutive_errors(),
            completion_keywords: default_completion_keywords(),
            knowledge_context_entries: default_knowledge_context_entries(),
        }
    }
}

fn default_max_iterations() -> u32 {
    10
}

fn default_max_consecutive_errors() -> usize {
    5
}

fn default_completion_keywords() -> Vec<String> {
    ["complete", "done", "finished", "resolved"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_knowledge_context_entries() -> usize {
    2
}

/// Cluster client and safety settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    #[serde(default = "default_kubectl_path")]
    pub kubectl_path: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
    #[serde(default = "default_max_output_lines")]
    pub max_output_lines: usize,
    #[serde(default)]
    pub allow_destructive_commands: bool,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_destructive_verbs")]
    pub destructive_verbs: Vec<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            kubectl_path: default_kubectl_path(),
            namespace: default_namespace(),
            command_timeout_secs: default_command_timeout(),
            max_output_lines: default_max_output_lines(),
            allow_destructive_commands: false,
            dry_run: false,
            destructive_verbs: default_destructive_verbs(),
        }
    }
}

fn default_kubectl_path() -> String {
    "kubectl".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_command_timeout() -> u64 {
    30
}

fn default_max_output_lines() -> usize {
    50
}

fn default_destructive_verbs() -> Vec<String> {
    ["delete", "drain", "cordon", "taint"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Knowledge retrieval settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default = "default_store_path")]
    pub store_path: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub min_relevance: f32,
    #[serde(default = "default_max_context_length")]
    pub max_context_length: usize,
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            top_k: default_top_k(),
            min_relevance: 0.0,
            max_context_length: default_max_context_length(),
            query_timeout_ms: default_query_timeout_ms(),
        }
    }
}

fn default_store_path() -> String {
    "~/.chameleon/knowledge/store.json".to_string()
}

fn default_top_k() -> usize {
    3
}

fn default_max_context_length() -> usize {
    2000
}

fn default_query_timeout_ms() -> u64 {
    2000
}

/// Operator alert settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Run audit trail settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_audit_dir")]
    pub dir: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_audit_dir(),
        }
    }
}

fn default_audit_dir() -> String {
    "~/.chameleon/runs".to_string()
}

fn default_true() -> bool {
    true
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

impl Config {
    /// Load from the default location
    pub async fn load() -> Result<Self> {
        let path = config_path();
        Self::load_from(&path).await
    }

    /// Load from a specific location; a missing file yields defaults
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("◆ NO CONFIG FOUND AT {:?}, USING DEFAULTS", path);
            return Ok(Config::default());
        }

        debug!("◆ LOADING CONFIG FROM {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save to the default location
    pub async fn save(&self) -> Result<()> {
        let path = config_path();
        self.save_to(&path).await
    }

    /// Save to a specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("◆ WRITING CONFIG TO {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Overlay environment variables on top of file settings
    pub fn apply_env(mut self) -> Self {
        self.apply_env_with(|key| std::env::var(key).ok());
        self
    }

    /// Overlay values from an arbitrary lookup (the environment in production)
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("OLLAMA_HOST") {
            self.inference.host = host;
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            self.inference.model = model;
        }
        if let Some(ns) = lookup("K8S_NAMESPACE") {
            self.cluster.namespace = ns;
        }
        if let Some(v) = parse_var(&lookup, "MAX_ITERATIONS") {
            self.agent.max_iterations = v;
        }
        if let Some(v) = parse_var(&lookup, "ALLOW_DESTRUCTIVE_COMMANDS") {
            self.cluster.allow_destructive_commands = v;
        }
        if let Some(v) = parse_var(&lookup, "DRY_RUN_MODE") {
            self.cluster.dry_run = v;
        }
    }

    /// Resolved knowledge store file
    pub fn store_path(&self) -> PathBuf {
        expand_home(&self.knowledge.store_path)
    }

    /// Resolved audit directory
    pub fn audit_dir(&self) -> PathBuf {
        expand_home(&self.audit.dir)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().to_lowercase().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("◆ IGNORING UNPARSABLE {}={:?}", key, raw);
            None
        }
    }
}

/// Write a default config if none exists and create the data directories
pub async fn init() -> Result<Config> {
    let config_path = config_path();

    if config_path.exists() {
        warn!("◆ CONFIG ALREADY PRESENT AT {:?}", config_path);
    } else {
        let config = Config::default();
        config.save().await?;
        info!("◆ CONFIG WRITTEN TO {:?}", config_path);
    }

    tokio::fs::create_dir_all(runs_dir()).await?;
    tokio::fs::create_dir_all(knowledge_dir()).await?;
    info!("◆ DATA DIRECTORIES READY UNDER {:?}", data_dir());

    Config::load().await
}
