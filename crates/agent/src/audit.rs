//! Audit trail of finished runs, one JSON file per run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::state::{ConversationTurn, KnowledgeEntry, RunOutcome, TerminationReason};
use crate::{AgentError, Result};

/// Persisted form of a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub request: String,
    pub namespace: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub reason: TerminationReason,
    pub iteration: u32,
    pub task_complete: bool,
    pub answer: String,
    pub error_log: Vec<String>,
    #[serde(default)]
    pub knowledge_context: Vec<KnowledgeEntry>,
    pub turns: Vec<ConversationTurn>,
}

impl RunRecord {
    pub fn from_outcome(outcome: &RunOutcome) -> Self {
        let state = &outcome.state;
        Self {
            run_id: state.run_id(),
            request: state.request().to_string(),
            namespace: state.namespace().to_string(),
            started_at: state.started_at(),
            finished_at: Utc::now(),
            reason: outcome.reason,
            iteration: state.iteration(),
            task_complete: state.task_complete(),
            answer: outcome.answer.clone(),
            error_log: state.error_log().to_vec(),
            knowledge_context: state.knowledge_context().to_vec(),
            turns: state.turns().to_vec(),
        }
    }
}

/// Directory of run records
#[derive(Debug, Clone)]
pub struct AuditStore {
    dir: PathBuf,
}

impl AuditStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", run_id))
    }

    /// Write a record, returning its path
    pub async fn save(&self, record: &RunRecord) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.record_path(&record.run_id.to_string());
        let content = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&path, content).await?;
        debug!("◆ SAVED RUN RECORD: {}", path.display());
        Ok(path)
    }

    pub async fn load(&self, run_id: &str) -> Result<RunRecord> {
        let path = self.record_path(run_id);
        if !path.exists() {
            return Err(AgentError::RunNotFound(run_id.to_string()));
        }
        let content = tokio::fs::read_to_string(&path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Run ids on disk, oldest first
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut records = Vec::new();

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(run_id) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            match self.load(run_id).await {
                Ok(record) => records.push((record.started_at, run_id.to_string())),
                Err(e) => warn!("◆ SKIPPING UNREADABLE RUN RECORD {}: {}", run_id, e),
            }
        }

        records.sort();
        Ok(records.into_iter().map(|(_, id)| id).collect())
    }
}
