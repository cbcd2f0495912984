//! Agent core: safety gate, command executor, tool dispatcher and the
//! THINK / ACT control loop.

use thiserror::Error;

pub mod audit;
pub mod context;
pub mod executor;
pub mod kubectl;
pub mod loop_agent;
pub mod notify;
pub mod parse;
pub mod safety;
pub mod state;
pub mod tools;

pub use audit::{AuditStore, RunRecord};
pub use context::ContextBuilder;
pub use executor::{CommandExecutor, ExecutorSettings};
pub use kubectl::{ClusterClient, ClusterError, CommandOutput, KubectlClient};
pub use loop_agent::{AgentLoop, LoopSettings};
pub use notify::{Alert, ChannelNotifier, ConsoleNotifier, Notifier, NotifyAck, NotifyError, Severity};
pub use safety::{BlockReason, SafetyGate, Verdict};
pub use state::{
    ActionRequest, AgentState, ConversationTurn, ErrorKind, KnowledgeEntry, Observation, Role,
    RunOutcome, TerminationReason,
};
pub use tools::{ToolDispatcher, ToolKind};

/// Bookkeeping failures; tool and inference failures are observations
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("◆ DATA LINK ERROR: {0}")]
    Io(#[from] std::io::Error),

    #[error("◆ RECORD ENCODING ERROR: {0}")]
    Json(#[from] serde_json::Error),

    #[error("◆ RUN NOT FOUND: {0}")]
    RunNotFound(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;
