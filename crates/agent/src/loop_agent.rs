//! Agent loop - THINK / ACT state machine
//!
//! Each run owns a fresh [`AgentState`]. The guard at the top of THINK
//! bounds the run by iterations, accumulated errors and cancellation.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use chameleon_config::Config;
use chameleon_knowledge::{KnowledgeRetriever, VectorStore};
use chameleon_provider::{ChatParams, ChatResponse, Provider, ProviderError};

use crate::audit::{AuditStore, RunRecord};
use crate::context::ContextBuilder;
use crate::executor::CommandExecutor;
use crate::kubectl::ClusterClient;
use crate::notify::Notifier;
use crate::parse::{parse_actions, strip_action_syntax};
use crate::state::{
    ActionRequest, AgentState, ConversationTurn, ErrorKind, Observation, Role, RunOutcome,
    TerminationReason,
};
use crate::tools::ToolDispatcher;

/// Loop limits and inference parameters
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_iterations: u32,
    pub max_consecutive_errors: usize,
    pub completion_keywords: Vec<String>,
    pub inference_timeout: Duration,
}

impl From<&Config> for LoopSettings {
    fn from(config: &Config) -> Self {
        Self {
            model: config.inference.model.clone(),
            temperature: config.inference.temperature,
            max_tokens: config.inference.max_tokens,
            max_iterations: config.agent.max_iterations,
            max_consecutive_errors: config.agent.max_consecutive_errors,
            completion_keywords: config
                .agent
                .completion_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            inference_timeout: Duration::from_secs(config.inference.timeout_secs),
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Opening of the assistant turn recorded when inference fails
const THINK_FAILURE_PREFIX: &str = "I encountered an error while thinking";

enum Phase {
    Think,
    Act(Vec<ActionRequest>),
    Terminated(TerminationReason),
}

/// The agent loop drives one run per call to [`AgentLoop::run`]
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    dispatcher: ToolDispatcher,
    context: ContextBuilder,
    settings: LoopSettings,
    audit: Option<AuditStore>,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        dispatcher: ToolDispatcher,
        context: ContextBuilder,
        settings: LoopSettings,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            context,
            settings,
            audit: None,
        }
    }

    /// Wire every component from configuration
    pub fn with_config(
        config: &Config,
        provider: Arc<dyn Provider>,
        client: Arc<dyn ClusterClient>,
        store: Arc<dyn VectorStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let executor = CommandExecutor::from_config(&config.cluster, client);
        let retriever = KnowledgeRetriever::new(
            store,
            Duration::from_millis(config.knowledge.query_timeout_ms),
        );
        let dispatcher =
            ToolDispatcher::new(executor, retriever, notifier, config.knowledge.clone());
        let context = ContextBuilder::new(config.agent.knowledge_context_entries).with_policy(
            config.cluster.allow_destructive_commands,
            config.cluster.dry_run,
        );

        let agent = Self::new(provider, dispatcher, context, LoopSettings::from(config));
        if config.audit.enabled {
            agent.with_audit(AuditStore::new(config.audit_dir()))
        } else {
            agent
        }
    }

    pub fn with_audit(mut self, audit: AuditStore) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    /// Run to completion without external cancellation
    pub async fn process_direct(&self, request: &str, namespace: &str) -> RunOutcome {
        self.run(request, namespace, &CancellationToken::new()).await
    }

    pub async fn run(
        &self,
        request: &str,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        let mut state = AgentState::new(request, namespace);
        info!("◆ RUN {} STARTED IN {}", state.run_id(), namespace);

        let mut phase = Phase::Think;
        let reason = loop {
            phase = match phase {
                Phase::Think => match self.guard(&mut state, cancel) {
                    Some(reason) => Phase::Terminated(reason),
                    None => self.think(&mut state, cancel).await,
                },
                Phase::Act(actions) => self.act(&mut state, actions, cancel).await,
                Phase::Terminated(reason) => break reason,
            };
        };

        let answer = final_answer(&state, reason, &self.settings);
        info!(
            "◆ RUN {} TERMINATED: {} AFTER {} ITERATIONS",
            state.run_id(),
            reason,
            state.iteration()
        );

        let outcome = RunOutcome {
            answer,
            reason,
            state,
        };
        self.record(&outcome).await;
        outcome
    }

    /// Termination checks made before every THINK
    fn guard(&self, state: &mut AgentState, cancel: &CancellationToken) -> Option<TerminationReason> {
        if cancel.is_cancelled() {
            let observation = Observation::failure(ErrorKind::Cancelled, "Run cancelled by caller");
            state.append_observation(None, &observation);
            state.append_error(format!("{}: run cancelled by caller", ErrorKind::Cancelled));
            return Some(TerminationReason::Cancelled);
        }
        if state.error_log().len() >= self.settings.max_consecutive_errors {
            warn!("◆ ERROR THRESHOLD REACHED: {}", state.error_log().len());
            return Some(TerminationReason::ErrorThreshold);
        }
        if state.task_complete() {
            return Some(TerminationReason::Completed);
        }
        if state.iteration() >= self.settings.max_iterations {
            warn!("◆ ITERATION LIMIT REACHED: {}", state.iteration());
            return Some(TerminationReason::IterationLimit);
        }
        None
    }

    async fn think(&self, state: &mut AgentState, cancel: &CancellationToken) -> Phase {
        let messages = self.context.build_messages(state);
        debug!(
            "◆ PROMPT: {} MESSAGES, {} CHARS",
            messages.len(),
            messages
                .iter()
                .map(|m| m.content.as_deref().map(str::len).unwrap_or(0))
                .sum::<usize>()
        );

        let params = ChatParams {
            model: self.settings.model.clone(),
            messages,
            tools: self.dispatcher.definitions(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        state.increment_iteration();
        info!(
            "◆ THINK {}/{}",
            state.iteration(),
            self.settings.max_iterations
        );

        let timeout = self.settings.inference_timeout;
        let result = tokio::select! {
            _ = cancel.cancelled() => return Phase::Think,
            result = tokio::time::timeout(timeout, self.provider.chat(params)) => match result {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(timeout.as_secs())),
            },
        };

        match result {
            Ok(response) => self.route_response(state, response),
            Err(e) => {
                warn!("◆ INFERENCE FAILED: {}", e);
                let kind = if matches!(e, ProviderError::Timeout(_)) {
                    ErrorKind::Timeout
                } else {
                    ErrorKind::ExecutionFailed
                };
                state.append_error(format!("{}: inference failed: {}", kind, e));
                state.append_turn(ConversationTurn::assistant(
                    format!(
                        "{}: {}. Let me try a different approach.",
                        THINK_FAILURE_PREFIX, e
                    ),
                    Vec::new(),
                ));
                Phase::Think
            }
        }
    }

    fn route_response(&self, state: &mut AgentState, response: ChatResponse) -> Phase {
        let actions: Vec<ActionRequest> = parse_actions(&response)
            .into_iter()
            .enumerate()
            .map(|(i, action)| match action.call_id {
                Some(_) => action,
                None => action.with_call_id(format!("call_{}_{}", state.iteration(), i)),
            })
            .collect();
        let content = response.content.unwrap_or_default();

        state.append_turn(ConversationTurn::assistant(content.clone(), actions.clone()));

        if !actions.is_empty() {
            return Phase::Act(actions);
        }

        let lowered = content.to_lowercase();
        if self
            .settings
            .completion_keywords
            .iter()
            .any(|k| !k.is_empty() && lowered.contains(k.as_str()))
        {
            state.mark_complete();
            Phase::Terminated(TerminationReason::Completed)
        } else {
            Phase::Terminated(TerminationReason::Answered)
        }
    }

    async fn act(
        &self,
        state: &mut AgentState,
        actions: Vec<ActionRequest>,
        cancel: &CancellationToken,
    ) -> Phase {
        for action in actions {
            if cancel.is_cancelled() {
                break;
            }
            info!("◆ ACT: {}", action.tool_name);

            let observation = tokio::select! {
                _ = cancel.cancelled() => break,
                observation = self.dispatcher.dispatch(&action, state) => observation,
            };

            if let Some(kind) = observation.error_kind {
                let summary = observation.output.lines().next().unwrap_or("");
                state.append_error(format!("{} ({}): {}", kind, action.tool_name, summary));
            }
        }
        Phase::Think
    }

    async fn record(&self, outcome: &RunOutcome) {
        let Some(audit) = &self.audit else {
            return;
        };
        if let Err(e) = audit.save(&RunRecord::from_outcome(outcome)).await {
            warn!("◆ FAILED TO SAVE RUN RECORD: {}", e);
        }
    }
}

/// Last model-authored assistant text with action syntax removed. Runs
/// stopped by a limit or cancellation get the reason appended; the reason
/// alone is returned when the model left no text.
fn final_answer(state: &AgentState, reason: TerminationReason, settings: &LoopSettings) -> String {
    let answer = state
        .turns()
        .iter()
        .rev()
        .find(|t| t.role == Role::Assistant && !t.content.starts_with(THINK_FAILURE_PREFIX))
        .map(|t| strip_action_syntax(&t.content))
        .unwrap_or_default();

    let stopped = match reason {
        TerminationReason::Answered | TerminationReason::Completed => None,
        TerminationReason::IterationLimit => Some(format!(
            "Stopped after reaching the limit of {} iterations without a final answer.",
            settings.max_iterations
        )),
        TerminationReason::ErrorThreshold => Some(format!(
            "Stopped after {} errors. Last error: {}",
            state.error_log().len(),
            state.error_log().last().map(String::as_str).unwrap_or("none")
        )),
        TerminationReason::Cancelled => {
            Some("Run cancelled before an answer was produced.".to_string())
        }
    };

    match (answer.is_empty(), stopped) {
        (false, None) => answer,
        (true, None) => "Task completed.".to_string(),
        (false, Some(stopped)) => format!("{}\n\n{}", answer, stopped),
        (true, Some(stopped)) => stopped,
    }
}
