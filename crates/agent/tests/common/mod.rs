//! Shared mocks and builders for agent integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use mockall::mock;
use std::sync::Arc;
use std::time::Duration;

use chameleon_agent::{
    ClusterClient, ClusterError, CommandExecutor, CommandOutput, Notifier, NotifyAck,
    NotifyError, Severity, ToolDispatcher,
};
use chameleon_config::Config;
use chameleon_knowledge::{KnowledgeRetriever, Metadata, QueryHit, StoreError, VectorStore};
use chameleon_provider::{ChatParams, ChatResponse, Provider, ProviderError};

mock! {
    pub Cluster {}

    #[async_trait]
    impl ClusterClient for Cluster {
        async fn run(&self, command: &str, timeout_secs: u64) -> Result<CommandOutput, ClusterError>;
    }
}

mock! {
    pub Provider {}

    #[async_trait]
    impl Provider for Provider {
        async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError>;
        fn default_model(&self) -> String;
        fn is_configured(&self) -> bool;
    }
}

mock! {
    pub Store {}

    #[async_trait]
    impl VectorStore for Store {
        async fn query(&self, text: &str, n: usize) -> Result<Vec<QueryHit>, StoreError>;
        async fn add(
            &self,
            documents: Vec<String>,
            metadatas: Vec<Metadata>,
            ids: Vec<String>,
        ) -> Result<(), StoreError>;
        async fn count(&self) -> Result<usize, StoreError>;
    }
}

mock! {
    pub Notifier {}

    #[async_trait]
    impl Notifier for Notifier {
        async fn notify(&self, message: &str, severity: Severity) -> Result<NotifyAck, NotifyError>;
    }
}

/// Cluster client that answers every command successfully
pub struct HealthyCluster;

#[async_trait]
impl ClusterClient for HealthyCluster {
    async fn run(&self, command: &str, _timeout_secs: u64) -> Result<CommandOutput, ClusterError> {
        Ok(CommandOutput::success(format!("ran: {}", command)))
    }
}

/// Store with nothing in it
pub struct EmptyStore;

#[async_trait]
impl VectorStore for EmptyStore {
    async fn query(&self, _text: &str, _n: usize) -> Result<Vec<QueryHit>, StoreError> {
        Ok(Vec::new())
    }

    async fn add(
        &self,
        _documents: Vec<String>,
        _metadatas: Vec<Metadata>,
        _ids: Vec<String>,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(0)
    }
}

/// Defaults with side effects switched off
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.audit.enabled = false;
    config.alerts.enabled = false;
    config
}

pub fn hit(topic: &str, source: &str, document: &str, distance: f32) -> QueryHit {
    let mut metadata = Metadata::new();
    metadata.insert("topic".to_string(), topic.to_string());
    metadata.insert("source".to_string(), source.to_string());
    QueryHit {
        document: document.to_string(),
        metadata,
        distance,
    }
}

pub fn dispatcher(
    config: &Config,
    client: Arc<dyn ClusterClient>,
    store: Arc<dyn VectorStore>,
    notifier: Arc<dyn Notifier>,
) -> ToolDispatcher {
    let executor = CommandExecutor::from_config(&config.cluster, client);
    let retriever = KnowledgeRetriever::new(
        store,
        Duration::from_millis(config.knowledge.query_timeout_ms),
    );
    ToolDispatcher::new(executor, retriever, notifier, config.knowledge.clone())
}
