//! Context builder for assembling agent prompts

use chrono::Local;

use chameleon_provider::{Message, ToolCall};

use crate::state::{ActionRequest, AgentState, Role};
use crate::tools::ToolKind;

/// Builds the system prompt and message list for one THINK step
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    knowledge_entries: usize,
    allow_destructive: bool,
    dry_run: bool,
}

impl ContextBuilder {
    pub fn new(knowledge_entries: usize) -> Self {
        Self {
            knowledge_entries,
            allow_destructive: false,
            dry_run: false,
        }
    }

    /// Mention the command policy in the prompt
    pub fn with_policy(mut self, allow_destructive: bool, dry_run: bool) -> Self {
        self.allow_destructive = allow_destructive;
        self.dry_run = dry_run;
        self
    }

    pub fn build_system_prompt(&self, state: &AgentState) -> String {
        let mut parts = vec![self.identity(state)];

        let knowledge = state.recent_knowledge(self.knowledge_entries);
        if !knowledge.is_empty() {
            let entries: Vec<String> = knowledge
                .iter()
                .map(|entry| format!("### {}\n\n{}", entry.query, entry.content))
                .collect();
            parts.push(format!("# Knowledge Context\n\n{}", entries.join("\n\n")));
        }

        parts.join("\n\n---\n\n")
    }

    fn identity(&self, state: &AgentState) -> String {
        let now = Local::now().format("%Y-%m-%d %H:%M (%A)");
        let tools: Vec<String> = ToolKind::ALL
            .iter()
            .map(|k| format!("- {}: {}", k.name(), k.description()))
            .collect();

        let policy = if self.allow_destructive {
            "Destructive commands are enabled. Namespace and bulk deletion are still refused."
        } else {
            "Destructive commands (delete, drain, cordon, taint) are blocked. \
             Namespace and bulk deletion are always refused."
        };
        let mode = if self.dry_run {
            "\nDry-run mode is on: commands are reported, not executed."
        } else {
            ""
        };

        format!(
            r#"# Chameleon

You are Chameleon, an autonomous Site Reliability Engineer for a Kubernetes cluster.
You diagnose and fix issues by running tools, reading their results, and deciding the next step.

## Current Time
{}

## Scope
Namespace: {}

## Tools
{}

## Policy
{}{}
Shell pipes, chaining and substitution are not available.

## How to Work
1. Gather evidence with read-only commands first (get, describe, logs, top, events).
2. Search the knowledge base when you meet an unfamiliar error state.
3. Make a change only when the evidence supports it, and explain why.
4. Alert the operator when human action is needed.
5. When you are finished, reply in plain text with the root cause and what was done, and call no tool."#,
            now,
            state.namespace(),
            tools.join("\n"),
            policy,
            mode
        )
    }

    /// System prompt followed by every turn of the run
    pub fn build_messages(&self, state: &AgentState) -> Vec<Message> {
        let mut messages = vec![Message::system(self.build_system_prompt(state))];

        for turn in state.turns() {
            match turn.role {
                Role::System => messages.push(Message::system(&turn.content)),
                Role::User => messages.push(Message::user(&turn.content)),
                Role::Assistant => {
                    Self::add_assistant_message(&mut messages, &turn.content, &turn.actions)
                }
                Role::Tool => Self::add_tool_result(
                    &mut messages,
                    turn.call_id.as_deref().unwrap_or(""),
                    turn.tool_name.as_deref().unwrap_or(""),
                    &turn.content,
                ),
            }
        }

        messages
    }

    /// Add a tool result to messages
    pub fn add_tool_result(messages: &mut Vec<Message>, tool_call_id: &str, name: &str, result: &str) {
        messages.push(Message::tool(tool_call_id, name, result));
    }

    /// Add an assistant message with its tool calls
    pub fn add_assistant_message(
        messages: &mut Vec<Message>,
        content: &str,
        actions: &[ActionRequest],
    ) {
        let mut msg = Message::assistant(content);
        if !actions.is_empty() {
            let calls = actions
                .iter()
                .enumerate()
                .map(|(i, action)| {
                    ToolCall::new(
                        action
                            .call_id
                            .clone()
                            .unwrap_or_else(|| format!("call_{}", i)),
                        &action.tool_name,
                        action.arguments_json(),
                    )
                })
                .collect();
            msg.tool_calls = Some(calls);
        }
        messages.push(msg);
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(2)
    }
}
