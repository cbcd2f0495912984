//! Run state: turns, observations and the per-run memory of the loop

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use chameleon_provider::ToolCall;

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Failure taxonomy carried by observations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    BlockedCommand,
    ExecutionFailed,
    Timeout,
    UnknownTool,
    RetrievalUnavailable,
    InvalidArguments,
    Cancelled,
}

impl ErrorKind {
    /// Whether the reasoning step can usefully try again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::ExecutionFailed
                | ErrorKind::Timeout
                | ErrorKind::RetrievalUnavailable
                | ErrorKind::InvalidArguments
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BlockedCommand => "BlockedCommand",
            ErrorKind::ExecutionFailed => "ExecutionFailed",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::UnknownTool => "UnknownTool",
            ErrorKind::RetrievalUnavailable => "RetrievalUnavailable",
            ErrorKind::InvalidArguments => "InvalidArguments",
            ErrorKind::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub tool_name: String,
    #[serde(default)]
    pub arguments: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

impl ActionRequest {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments: BTreeMap::new(),
            call_id: None,
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = Some(call_id.into());
        self
    }

    /// Build from a JSON argument object; `None` without a tool name
    pub fn from_json(tool_name: &str, arguments: &Value, call_id: Option<String>) -> Option<Self> {
        let tool_name = tool_name.trim();
        if tool_name.is_empty() {
            return None;
        }

        let mut normalized = BTreeMap::new();
        if let Some(object) = arguments.as_object() {
            for (key, value) in object {
                let text = match value {
                    Value::Null => continue,
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                normalized.insert(key.clone(), text);
            }
        }

        Some(Self {
            tool_name: tool_name.to_string(),
            arguments: normalized,
            call_id,
        })
    }

    pub fn from_tool_call(call: &ToolCall) -> Option<Self> {
        let call_id = Some(call.id.clone()).filter(|id| !id.is_empty());
        Self::from_json(&call.name, &call.arguments, call_id)
    }

    /// Argument value, ignoring blank strings
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.arguments
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Arguments as a JSON object of strings
    pub fn arguments_json(&self) -> Value {
        Value::Object(
            self.arguments
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }
}

/// Result of one dispatched action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub success: bool,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl Observation {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error_kind: None,
        }
    }

    pub fn failure(kind: ErrorKind, output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            error_kind: Some(kind),
        }
    }
}

/// One appended exchange unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            actions: Vec::new(),
            call_id: None,
            tool_name: None,
            error_kind: None,
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>, actions: Vec<ActionRequest>) -> Self {
        Self {
            actions,
            ..Self::with_role(Role::Assistant, content)
        }
    }

    pub fn observation(action: Option<&ActionRequest>, observation: &Observation) -> Self {
        Self {
            call_id: action.and_then(|a| a.call_id.clone()),
            tool_name: action.map(|a| a.tool_name.clone()),
            error_kind: observation.error_kind,
            ..Self::with_role(Role::Tool, observation.output.clone())
        }
    }
}

/// Rendered retrieval kept for later prompts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub query: String,
    pub content: String,
}

/// Memory of a single run.
///
/// Every sequence is append-only and `task_complete` cannot be cleared.
/// Mutation is restricted to this crate.
#[derive(Debug, Clone, Serialize)]
pub struct AgentState {
    run_id: Uuid,
    request: String,
    namespace: String,
    started_at: DateTime<Utc>,
    turns: Vec<ConversationTurn>,
    iteration: u32,
    error_log: Vec<String>,
    last_observation: String,
    task_complete: bool,
    knowledge_context: Vec<KnowledgeEntry>,
}

impl AgentState {
    /// Fresh state seeded with the user request
    pub fn new(request: impl Into<String>, namespace: impl Into<String>) -> Self {
        let request = request.into();
        Self {
            run_id: Uuid::new_v4(),
            turns: vec![ConversationTurn::user(request.clone())],
            request,
            namespace: namespace.into(),
            started_at: Utc::now(),
            iteration: 0,
            error_log: Vec::new(),
            last_observation: String::new(),
            task_complete: false,
            knowledge_context: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn request(&self) -> &str {
        &self.request
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn error_log(&self) -> &[String] {
        &self.error_log
    }

    pub fn last_observation(&self) -> &str {
        &self.last_observation
    }

    pub fn task_complete(&self) -> bool {
        self.task_complete
    }

    pub fn knowledge_context(&self) -> &[KnowledgeEntry] {
        &self.knowledge_context
    }

    /// The `n` most recent knowledge entries, oldest first
    pub fn recent_knowledge(&self, n: usize) -> &[KnowledgeEntry] {
        let start = self.knowledge_context.len().saturating_sub(n);
        &self.knowledge_context[start..]
    }

    pub(crate) fn append_turn(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub(crate) fn append_observation(
        &mut self,
        action: Option<&ActionRequest>,
        observation: &Observation,
    ) {
        self.last_observation = observation.output.clone();
        self.turns
            .push(ConversationTurn::observation(action, observation));
    }

    pub(crate) fn append_error(&mut self, description: impl Into<String>) {
        self.error_log.push(description.into());
    }

    pub(crate) fn append_knowledge(&mut self, query: impl Into<String>, content: impl Into<String>) {
        self.knowledge_context.push(KnowledgeEntry {
            query: query.into(),
            content: content.into(),
        });
    }

    pub(crate) fn increment_iteration(&mut self) {
        self.iteration += 1;
    }

    pub(crate) fn mark_complete(&mut self) {
        self.task_complete = true;
    }
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Plain answer without a completion keyword
    Answered,
    /// Completion keyword seen
    Completed,
    IterationLimit,
    ErrorThreshold,
    Cancelled,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TerminationReason::Answered => "answered",
            TerminationReason::Completed => "completed",
            TerminationReason::IterationLimit => "iteration limit reached",
            TerminationReason::ErrorThreshold => "error threshold reached",
            TerminationReason::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// What the caller gets back from a run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub answer: String,
    pub reason: TerminationReason,
    pub state: AgentState,
}

impl RunOutcome {
    /// Finished on its own terms rather than by a limit or cancellation
    pub fn is_success(&self) -> bool {
        matches!(
            self.reason,
            TerminationReason::Answered | TerminationReason::Completed
        )
    }
}
