//! File-backed local vector store
//!
//! Documents live in memory and are written to a single JSON file on every
//! change. Distance is `1 - cosine` over lowercase term-frequency vectors.

use crate::{Metadata, QueryHit, Result, StoreError, VectorStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDocument {
    id: String,
    document: String,
    #[serde(default)]
    metadata: Metadata,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    documents: Vec<StoredDocument>,
}

/// Local document store
pub struct LocalStore {
    path: Option<PathBuf>,
    documents: RwLock<Vec<StoredDocument>>,
}

impl LocalStore {
    /// Store with no backing file
    pub fn in_memory() -> Self {
        Self {
            path: None,
            documents: RwLock::new(Vec::new()),
        }
    }

    /// Open the store at `path`; a missing file opens empty
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let documents = if path.exists() {
            let content = tokio::fs::read_to_string(&path).await?;
            let file: StoreFile = serde_json::from_str(&content)?;
            debug!("◆ LOADED {} DOCUMENTS FROM {}", file.documents.len(), path.display());
            file.documents
        } else {
            info!("◆ NO STORE AT {}, STARTING EMPTY", path.display());
            Vec::new()
        };

        Ok(Self {
            path: Some(path),
            documents: RwLock::new(documents),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.documents.read().await.iter().any(|d| d.id == id)
    }

    /// Remove every document
    pub async fn reset(&self) -> Result<()> {
        let mut documents = self.documents.write().await;
        documents.clear();
        self.persist(&documents).await?;
        info!("◆ STORE RESET");
        Ok(())
    }

    async fn persist(&self, documents: &[StoredDocument]) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = StoreFile {
            documents: documents.to_vec(),
        };
        tokio::fs::write(path, serde_json::to_string_pretty(&file)?).await?;
        Ok(())
    }
}

#[async_trait]
impl VectorStore for LocalStore {
    async fn query(&self, text: &str, n: usize) -> Result<Vec<QueryHit>> {
        let query = term_frequencies(text);
        let documents = self.documents.read().await;

        let mut scored: Vec<(f32, &StoredDocument)> = documents
            .iter()
            .map(|doc| (cosine_distance(&query, &term_frequencies(&doc.document)), doc))
            .collect();

        scored.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.id.cmp(&b.1.id))
        });

        Ok(scored
            .into_iter()
            .take(n)
            .map(|(distance, doc)| QueryHit {
                document: doc.document.clone(),
                metadata: doc.metadata.clone(),
                distance,
            })
            .collect())
    }

    async fn add(
        &self,
        documents: Vec<String>,
        metadatas: Vec<Metadata>,
        ids: Vec<String>,
    ) -> Result<()> {
        if documents.len() != metadatas.len() || documents.len() != ids.len() {
            return Err(StoreError::BatchMismatch {
                documents: documents.len(),
                metadatas: metadatas.len(),
                ids: ids.len(),
            });
        }

        let mut stored = self.documents.write().await;

        let mut seen: HashSet<&str> = stored.iter().map(|d| d.id.as_str()).collect();
        for id in &ids {
            if !seen.insert(id.as_str()) {
                return Err(StoreError::DuplicateId(id.clone()));
            }
        }

        let added = ids.len();
        stored.extend(
            ids.into_iter()
                .zip(documents)
                .zip(metadatas)
                .map(|((id, document), metadata)| StoredDocument {
                    id,
                    document,
                    metadata,
                }),
        );
        self.persist(&stored).await?;

        debug!("◆ ADDED {} DOCUMENTS ({} TOTAL)", added, stored.len());
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.documents.read().await.len())
    }
}

fn term_frequencies(text: &str) -> HashMap<String, f32> {
    let mut terms = HashMap::new();
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        *terms.entry(token.to_lowercase()).or_insert(0.0) += 1.0;
    }
    terms
}

fn cosine_distance(a: &HashMap<String, f32>, b: &HashMap<String, f32>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 1.0;
    }

    let dot: f32 = a
        .iter()
        .filter_map(|(term, x)| b.get(term).map(|y| x * y))
        .sum();
    let na: f32 = a.values().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.values().map(|x| x * x).sum::<f32>().sqrt();

    let similarity = (dot / (na * nb)).clamp(0.0, 1.0);
    1.0 - similarity
}
