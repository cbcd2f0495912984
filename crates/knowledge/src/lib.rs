//! Knowledge retrieval for troubleshooting context
//!
//! A [`VectorStore`] answers nearest-neighbour queries; the
//! [`KnowledgeRetriever`] turns hits into scored documents and renders them
//! into a bounded context block for the reasoning step.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub mod corpus;
pub mod local;
pub mod retriever;

pub use corpus::{builtin_documents, ingest, CorpusDocument};
pub use local::LocalStore;
pub use retriever::{
    fallback_checklist, fallback_context, format_context, relevance, KnowledgeRetriever,
    RetrievedDocument, Retrieval, NO_DOCUMENTS,
};

/// Vector store failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("STORE I/O ERROR: {0}")]
    Io(#[from] std::io::Error),

    #[error("STORE PARSE ERROR: {0}")]
    Json(#[from] serde_json::Error),

    #[error("STORE UNAVAILABLE: {0}")]
    Unavailable(String),

    #[error("BATCH MISMATCH: {documents} documents, {metadatas} metadatas, {ids} ids")]
    BatchMismatch {
        documents: usize,
        metadatas: usize,
        ids: usize,
    },

    #[error("DUPLICATE DOCUMENT ID: {0}")]
    DuplicateId(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Per-document metadata
pub type Metadata = BTreeMap<String, String>;

/// One nearest-neighbour result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHit {
    pub document: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub distance: f32,
}

/// Nearest-neighbour document store
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Up to `n` hits ordered by ascending distance
    async fn query(&self, text: &str, n: usize) -> Result<Vec<QueryHit>>;

    /// Add a batch; the three vectors must have equal length
    async fn add(&self, documents: Vec<String>, metadatas: Vec<Metadata>, ids: Vec<String>)
        -> Result<()>;

    async fn count(&self) -> Result<usize>;
}
