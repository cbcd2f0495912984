//! Scoring, filtering and rendering of retrieved documents

use crate::VectorStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Rendered when there is nothing to show
pub const NO_DOCUMENTS: &str = "No relevant documentation found.";

const HEADER: &str = "Relevant Documentation:\n";

const CHECKLIST: &[&str] = &[
    "Check pod status: kubectl get pods -n <namespace>",
    "Describe the failing pod and read its Events: kubectl describe pod <pod>",
    "Read recent logs, including the previous container: kubectl logs <pod> --previous",
    "List recent events: kubectl get events --sort-by=.lastTimestamp",
    "Check node health and capacity: kubectl get nodes and kubectl top nodes",
    "Compare resource requests and limits with actual usage: kubectl top pods",
    "Confirm referenced ConfigMaps, Secrets and PVCs exist in the namespace",
];

/// `1 / (1 + distance)`, with negative or NaN distances treated as 0
pub fn relevance(distance: f32) -> f32 {
    let distance = if distance.is_nan() || distance < 0.0 {
        0.0
    } else {
        distance
    };
    1.0 / (1.0 + distance)
}

/// A scored knowledge-base entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub content: String,
    pub source_id: String,
    pub topic: String,
    pub distance: f32,
}

impl RetrievedDocument {
    pub fn relevance(&self) -> f32 {
        relevance(self.distance)
    }
}

/// Result of one retrieval
#[derive(Debug, Clone, Default)]
pub struct Retrieval {
    pub documents: Vec<RetrievedDocument>,
    /// The store could not be queried
    pub degraded: bool,
}

impl Retrieval {
    fn unavailable() -> Self {
        Self {
            documents: Vec::new(),
            degraded: true,
        }
    }
}

/// Queries the store and keeps the hits that clear the relevance bar
pub struct KnowledgeRetriever {
    store: Arc<dyn VectorStore>,
    query_timeout: Duration,
}

impl KnowledgeRetriever {
    pub fn new(store: Arc<dyn VectorStore>, query_timeout: Duration) -> Self {
        Self {
            store,
            query_timeout,
        }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Never fails; an unreachable store yields an empty, degraded result.
    ///
    /// With `min_relevance == 0` every hit is kept, otherwise hits need
    /// `relevance >= 1 - min_relevance`. Store order is preserved.
    pub async fn retrieve(&self, query: &str, top_k: usize, min_relevance: f32) -> Retrieval {
        if top_k == 0 {
            return Retrieval::default();
        }

        let hits = match tokio::time::timeout(self.query_timeout, self.store.query(query, top_k))
            .await
        {
            Ok(Ok(hits)) => hits,
            Ok(Err(e)) => {
                warn!("◆ KNOWLEDGE STORE ERROR: {}", e);
                return Retrieval::unavailable();
            }
            Err(_) => {
                warn!(
                    "◆ KNOWLEDGE QUERY TIMED OUT AFTER {}ms",
                    self.query_timeout.as_millis()
                );
                return Retrieval::unavailable();
            }
        };

        let threshold = 1.0 - min_relevance;
        let documents: Vec<RetrievedDocument> = hits
            .into_iter()
            .take(top_k)
            .map(|hit| RetrievedDocument {
                topic: hit
                    .metadata
                    .get("topic")
                    .cloned()
                    .unwrap_or_else(|| "General".to_string()),
                source_id: hit
                    .metadata
                    .get("source")
                    .cloned()
                    .unwrap_or_else(|| "Unknown".to_string()),
                content: hit.document,
                distance: hit.distance,
            })
            .filter(|doc| min_relevance <= 0.0 || doc.relevance() >= threshold)
            .collect();

        debug!("◆ RETRIEVED {} DOCUMENTS FOR {:?}", documents.len(), query);

        Retrieval {
            documents,
            degraded: false,
        }
    }
}

/// Render documents in order, stopping before `max_length` characters
/// would be exceeded and noting how many were left out.
pub fn format_context(docs: &[RetrievedDocument], max_length: usize) -> String {
    if docs.is_empty() {
        return NO_DOCUMENTS.to_string();
    }

    let mut out = String::new();
    let mut used = 0;

    let header_len = HEADER.chars().count();
    if header_len <= max_length {
        out.push_str(HEADER);
        used = header_len;
    }

    for (i, doc) in docs.iter().enumerate() {
        let entry = format!(
            "\n{}. {} (Source: {})\n{}\n",
            i + 1,
            doc.topic,
            doc.source_id,
            doc.content
        );
        let len = entry.chars().count();

        if used + len > max_length {
            out.push_str(&format!(
                "\n... (truncated, {} more results)",
                docs.len() - i
            ));
            break;
        }

        out.push_str(&entry);
        used += len;
    }

    out
}

/// Generic diagnostic steps used when the store is unreachable
pub fn fallback_checklist() -> &'static [&'static str] {
    CHECKLIST
}

/// The checklist as an observation body
pub fn fallback_context() -> String {
    let mut out = String::from("Knowledge base unavailable. Generic troubleshooting checklist:\n");
    for (i, step) in CHECKLIST.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, step));
    }
    out
}
