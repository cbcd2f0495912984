//! Tool registry and dispatcher
//!
//! The tool set is closed: [`ToolKind`] names every capability, and
//! [`ToolDispatcher::dispatch`] routes an [`ActionRequest`] to the executor,
//! the retriever or the notifier.

pub mod alert;
pub mod cluster;
pub mod knowledge;

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use chameleon_config::KnowledgeConfig;
use chameleon_knowledge::KnowledgeRetriever;
use chameleon_provider::Tool;

use crate::executor::CommandExecutor;
use crate::notify::Notifier;
use crate::state::{ActionRequest, AgentState, ErrorKind, Observation};

/// Every capability the model may call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    ExecuteCommand,
    ReadLogs,
    DescribeResource,
    RestartDeployment,
    SearchKnowledge,
    Notify,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::ExecuteCommand,
        ToolKind::ReadLogs,
        ToolKind::DescribeResource,
        ToolKind::RestartDeployment,
        ToolKind::SearchKnowledge,
        ToolKind::Notify,
    ];

    /// Wire name advertised to the model
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::ExecuteCommand => "execute_k8s_command",
            ToolKind::ReadLogs => "get_pod_logs",
            ToolKind::DescribeResource => "describe_resource",
            ToolKind::RestartDeployment => "restart_deployment",
            ToolKind::SearchKnowledge => "read_rag_docs",
            ToolKind::Notify => "system_voice_alert",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name.trim())
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::ExecuteCommand => {
                "Run a kubectl command against the cluster, e.g. 'get pods' or 'top nodes'. \
                 Omit the kubectl prefix. Destructive commands are blocked."
            }
            ToolKind::ReadLogs => "Read recent log lines from a pod.",
            ToolKind::DescribeResource => {
                "Describe a cluster resource to see its configuration, status and events."
            }
            ToolKind::RestartDeployment => {
                "Trigger a rolling restart of a deployment. Use only after diagnosing the issue."
            }
            ToolKind::SearchKnowledge => {
                "Search the troubleshooting knowledge base for causes and fixes of an error."
            }
            ToolKind::Notify => "Send an alert to the human operator.",
        }
    }

    pub fn parameters(&self) -> Value {
        let namespace = json!({
            "type": "string",
            "description": "Namespace (defaults to the run's namespace)"
        });

        match self {
            ToolKind::ExecuteCommand => json!({
                "type": "object",
                "properties": {
                    "command": { "type": "string", "description": "kubectl arguments, e.g. 'get pods'" },
                    "namespace": namespace
                },
                "required": ["command"]
            }),
            ToolKind::ReadLogs => json!({
                "type": "object",
                "properties": {
                    "pod_name": { "type": "string", "description": "Pod to read" },
                    "namespace": namespace,
                    "tail": { "type": "integer", "description": "Number of lines (default 100)" },
                    "container": { "type": "string", "description": "Container in a multi-container pod" }
                },
                "required": ["pod_name"]
            }),
            ToolKind::DescribeResource => json!({
                "type": "object",
                "properties": {
                    "resource_type": { "type": "string", "description": "Kind, e.g. pod, deployment, service" },
                    "name": { "type": "string", "description": "Resource name" },
                    "namespace": namespace
                },
                "required": ["resource_type", "name"]
            }),
            ToolKind::RestartDeployment => json!({
                "type": "object",
                "properties": {
                    "deployment_name": { "type": "string", "description": "Deployment to restart" },
                    "namespace": namespace
                },
                "required": ["deployment_name"]
            }),
            ToolKind::SearchKnowledge => json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Error or symptom to look up" },
                    "top_k": { "type": "integer", "description": "Number of documents" }
                },
                "required": ["query"]
            }),
            ToolKind::Notify => json!({
                "type": "object",
                "properties": {
                    "message": { "type": "string", "description": "Alert text" },
                    "severity": {
                        "type": "string",
                        "enum": ["info", "warning", "critical"],
                        "description": "Alert severity (default warning)"
                    }
                },
                "required": ["message"]
            }),
        }
    }

    pub fn definition(&self) -> Tool {
        Tool::new(self.name(), self.description(), self.parameters())
    }
}

/// Wire names of every tool, comma separated
pub fn tool_names() -> String {
    ToolKind::ALL
        .iter()
        .map(|k| k.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Routes actions and records one observation turn per dispatch
pub struct ToolDispatcher {
    executor: CommandExecutor,
    retriever: KnowledgeRetriever,
    notifier: Arc<dyn Notifier>,
    knowledge: KnowledgeConfig,
}

impl ToolDispatcher {
    pub fn new(
        executor: CommandExecutor,
        retriever: KnowledgeRetriever,
        notifier: Arc<dyn Notifier>,
        knowledge: KnowledgeConfig,
    ) -> Self {
        Self {
            executor,
            retriever,
            notifier,
            knowledge,
        }
    }

    pub fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    pub fn retriever(&self) -> &KnowledgeRetriever {
        &self.retriever
    }

    pub fn definitions(&self) -> Vec<Tool> {
        ToolKind::ALL.iter().map(|k| k.definition()).collect()
    }

    pub async fn dispatch(&self, action: &ActionRequest, state: &mut AgentState) -> Observation {
        let observation = match ToolKind::from_name(&action.tool_name) {
            Some(kind) => {
                debug!("◆ DISPATCH {} {:?}", kind.name(), action.arguments);
                self.route(kind, action, state).await
            }
            None => {
                warn!("◆ UNKNOWN TOOL: {}", action.tool_name);
                Observation::failure(
                    ErrorKind::UnknownTool,
                    format!(
                        "Unknown tool '{}'. Available tools: {}",
                        action.tool_name,
                        tool_names()
                    ),
                )
            }
        };

        state.append_observation(Some(action), &observation);
        observation
    }

    async fn route(
        &self,
        kind: ToolKind,
        action: &ActionRequest,
        state: &mut AgentState,
    ) -> Observation {
        match kind {
            ToolKind::ExecuteCommand
            | ToolKind::ReadLogs
            | ToolKind::DescribeResource
            | ToolKind::RestartDeployment => {
                match cluster::build_command(kind, action, state.namespace()) {
                    Ok(command) => {
                        self.executor
                            .execute(&command.fragment, Some(&command.namespace))
                            .await
                    }
                    Err(message) => Observation::failure(ErrorKind::InvalidArguments, message),
                }
            }
            ToolKind::SearchKnowledge => {
                knowledge::search(&self.retriever, &self.knowledge, action, state).await
            }
            ToolKind::Notify => alert::send(self.notifier.as_ref(), action).await,
        }
    }
}

/// Required argument or an InvalidArguments message
pub(crate) fn required<'a>(action: &'a ActionRequest, key: &str) -> Result<&'a str, String> {
    action
        .arg(key)
        .ok_or_else(|| format!("Missing required argument '{}' for {}", key, action.tool_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("exec"), None);
    }

    #[test]
    fn test_definitions_declare_required_fields() {
        for kind in ToolKind::ALL {
            let definition = kind.definition();
            assert_eq!(definition.tool_type, "function");
            assert_eq!(definition.function.name, kind.name());
            assert!(!definition.function.parameters["required"]
                .as_array()
                .unwrap()
                .is_empty());
        }
    }
}
