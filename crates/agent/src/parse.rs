//! Reading actions out of model replies
//!
//! Small local models often write a tool call as JSON in the reply text
//! instead of using the structured tool-call field.

use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

use chameleon_provider::ChatResponse;

use crate::state::ActionRequest;
use crate::tools::ToolKind;

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("json fence pattern")
});

/// Structured calls first, then tool-call JSON embedded in the text
pub fn parse_actions(response: &ChatResponse) -> Vec<ActionRequest> {
    if response.has_tool_calls() {
        return response
            .tool_calls
            .iter()
            .filter_map(ActionRequest::from_tool_call)
            .collect();
    }

    response
        .content
        .as_deref()
        .map(parse_text_actions)
        .unwrap_or_default()
}

/// Tool calls written as `{"name": ..., "arguments": {...}}` naming a known tool
pub fn parse_text_actions(content: &str) -> Vec<ActionRequest> {
    json_objects(content)
        .into_iter()
        .filter_map(|(start, end)| action_from_json(&content[start..end]))
        .collect()
}

/// Reply text with tool calls removed, fenced or bare; other JSON is kept
pub fn strip_action_syntax(content: &str) -> String {
    let without_fences = JSON_FENCE.replace_all(content, |caps: &Captures| {
        if action_from_json(&caps[1]).is_some() {
            String::new()
        } else {
            caps[0].to_string()
        }
    });

    let mut out = String::with_capacity(without_fences.len());
    let mut cursor = 0;
    for (start, end) in json_objects(&without_fences) {
        if action_from_json(&without_fences[start..end]).is_some() {
            out.push_str(&without_fences[cursor..start]);
            cursor = end;
        }
    }
    out.push_str(&without_fences[cursor..]);

    out.trim().to_string()
}

fn action_from_json(text: &str) -> Option<ActionRequest> {
    let value: Value = serde_json::from_str(text).ok()?;
    let name = value.get("name")?.as_str()?;
    ToolKind::from_name(name)?;

    let arguments = value
        .get("arguments")
        .or_else(|| value.get("parameters"))
        .cloned()
        .unwrap_or(Value::Null);

    // Some models double-encode the arguments object
    let arguments = match arguments {
        Value::String(s) => serde_json::from_str(&s).unwrap_or(Value::Null),
        other => other,
    };

    ActionRequest::from_json(name, &arguments, None)
}

/// Byte spans of top-level `{...}` objects, ignoring braces inside strings
fn json_objects(content: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in content.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        spans.push((s, i + 1));
                    }
                }
            }
            _ => {}
        }
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use chameleon_provider::ToolCall;
    use serde_json::json;

    #[test]
    fn test_structured_calls_win() {
        let response = ChatResponse::with_tool_calls(
            Some(r#"{"name": "get_pod_logs", "arguments": {"pod_name": "x"}}"#.to_string()),
            vec![
                ToolCall::new("call_0", "execute_k8s_command", json!({"command": "get pods"})),
                ToolCall::new("call_1", "", json!({})),
            ],
        );
        let actions = parse_actions(&response);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].tool_name, "execute_k8s_command");
        assert_eq!(actions[0].call_id.as_deref(), Some("call_0"));
    }

    #[test]
    fn test_structured_unknown_tool_is_kept() {
        let response = ChatResponse::with_tool_calls(
            None,
            vec![ToolCall::new("call_0", "rm_rf", json!({}))],
        );
        assert_eq!(parse_actions(&response)[0].tool_name, "rm_rf");
    }

    #[test]
    fn test_text_action_with_arguments_or_parameters() {
        let text = r#"Let me look. {"name": "get_pod_logs", "arguments": {"pod_name": "web-1", "tail": 50}}
and then {"name": "read_rag_docs", "parameters": {"query": "CrashLoopBackOff {restart}"}}"#;
        let actions = parse_text_actions(text);

        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].arg("tail"), Some("50"));
        assert_eq!(actions[1].arg("query"), Some("CrashLoopBackOff {restart}"));
    }

    #[test]
    fn test_text_json_for_unknown_tool_is_ignored() {
        assert!(parse_text_actions(r#"{"name": "exec", "arguments": {"command": "ls"}}"#).is_empty());
        assert!(parse_text_actions(r#"{"status": "ok"}"#).is_empty());
        assert!(parse_text_actions("all pods } are { healthy").is_empty());
    }

    #[test]
    fn test_string_encoded_arguments() {
        let actions = parse_text_actions(
            r#"{"name": "execute_k8s_command", "arguments": "{\"command\": \"get nodes\"}"}"#,
        );
        assert_eq!(actions[0].arg("command"), Some("get nodes"));
    }

    #[test]
    fn test_strip_action_syntax() {
        let text = "The pod was OOMKilled.\n```json\n{\"name\": \"get_pod_logs\"}\n```\n\
                    {\"name\": \"read_rag_docs\", \"arguments\": {\"query\": \"oom\"}} Raise the limit.";
        assert_eq!(
            strip_action_syntax(text),
            "The pod was OOMKilled.\n\n Raise the limit."
        );
        assert_eq!(strip_action_syntax(r#"Labels: {"app": "web"}"#), r#"Labels: {"app": "web"}"#);
    }

    #[test]
    fn test_strip_keeps_quoted_data_fences() {
        let text = "Set the selector to:\n```json\n{\"matchLabels\": {\"app\": \"web\"}}\n```\nthen roll out.";
        assert_eq!(strip_action_syntax(text), text);

        let mixed = "Patch:\n```json\n{\"spec\": {\"replicas\": 2}}\n```\n\
                     ```json\n{\"name\": \"restart_deployment\", \"arguments\": {\"deployment_name\": \"web\"}}\n```";
        assert_eq!(
            strip_action_syntax(mixed),
            "Patch:\n```json\n{\"spec\": {\"replicas\": 2}}\n```"
        );
    }
}
