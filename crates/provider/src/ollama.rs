//! Ollama chat node
//!
//! Talks to a local Ollama server over `/api/chat` with tool calling.

use crate::*;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, trace};

/// Ollama `/api/chat` client
pub struct OllamaProvider {
    client: Client,
    host: String,
    default_model: String,
}

impl OllamaProvider {
    pub fn new(host: impl Into<String>, default_model: impl Into<String>) -> Self {
        let host = host.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            host,
            default_model: default_model.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Check that the server answers `/api/tags`
    pub async fn ping(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.host);
        let response = self.client.get(&url).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::Api(format!("status {}", response.status())))
        }
    }

    fn build_request(&self, params: &ChatParams) -> serde_json::Value {
        let model = if params.model.is_empty() {
            self.default_model.clone()
        } else {
            params.model.clone()
        };

        let messages: Vec<serde_json::Value> = params
            .messages
            .iter()
            .map(|m| {
                let mut obj = json!({
                    "role": &m.role,
                    "content": m.content.as_deref().unwrap_or(""),
                });
                if let Some(tool_calls) = &m.tool_calls {
                    let calls: Vec<serde_json::Value> = tool_calls
                        .iter()
                        .map(|tc| {
                            json!({
                                "function": {
                                    "name": &tc.name,
                                    "arguments": &tc.arguments
                                }
                            })
                        })
                        .collect();
                    obj["tool_calls"] = json!(calls);
                }
                if m.role == "tool" {
                    if let Some(name) = &m.name {
                        obj["tool_name"] = json!(name);
                    }
                }
                obj
            })
            .collect();

        let mut body = json!({
            "model": model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": params.temperature,
                "num_predict": params.max_tokens,
            }
        });

        if !params.tools.is_empty() {
            body["tools"] = json!(params.tools);
        }

        body
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<ChatResponse> {
        let message = json
            .get("message")
            .filter(|m| m.is_object())
            .ok_or(ProviderError::InvalidResponse)?;

        let content = message["content"]
            .as_str()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        let mut tool_calls = Vec::new();
        if let Some(calls) = message["tool_calls"].as_array() {
            for (i, call) in calls.iter().enumerate() {
                let function = &call["function"];
                let name = function["name"].as_str().unwrap_or("").to_string();
                if name.is_empty() {
                    continue;
                }
                // Some models send arguments as an encoded string
                let arguments = function["arguments"]
                    .as_str()
                    .and_then(|s| serde_json::from_str(s).ok())
                    .unwrap_or_else(|| function["arguments"].clone());
                let id = call["id"]
                    .as_str()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("call_{}", i));

                tool_calls.push(ToolCall {
                    id,
                    name,
                    arguments,
                });
            }
        }

        let finish_reason = if tool_calls.is_empty() {
            json["done_reason"].as_str().unwrap_or("stop").to_string()
        } else {
            "tool_calls".to_string()
        };

        let usage = Usage {
            prompt_tokens: json["prompt_eval_count"].as_u64().unwrap_or(0) as u32,
            completion_tokens: json["eval_count"].as_u64().unwrap_or(0) as u32,
        };

        Ok(ChatResponse {
            content,
            tool_calls,
            finish_reason,
            usage,
        })
    }
}

#[async_trait::async_trait]
impl Provider for OllamaProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse> {
        trace!("◆ INFERENCE REQUEST TO {}", self.host);

        let url = format!("{}/api/chat", self.host);
        let body = self.build_request(&params);

        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }
            let error = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["error"].as_str().map(|s| s.to_string()))
                .unwrap_or_else(|| format!("status {}", status));
            return Err(ProviderError::Api(error));
        }

        if text.trim().is_empty() {
            return Err(ProviderError::InvalidResponse);
        }

        let json: serde_json::Value = serde_json::from_str(&text)?;
        let parsed = self.parse_response(json)?;

        debug!(
            "◆ INFERENCE RESPONSE: {} TOOL CALLS",
            parsed.tool_calls.len()
        );

        Ok(parsed)
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    fn is_configured(&self) -> bool {
        !self.host.is_empty() && !self.default_model.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> OllamaProvider {
        OllamaProvider::new("http://localhost:11434/", "llama3.2:3b")
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        assert_eq!(provider().host(), "http://localhost:11434");
        assert!(provider().is_configured());
        assert!(!OllamaProvider::new("", "").is_configured());
    }

    #[test]
    fn test_build_request_uses_default_model_when_empty() {
        let request = provider().build_request(&ChatParams {
            messages: vec![Message::user("get pods")],
            ..Default::default()
        });

        assert_eq!(request["model"], "llama3.2:3b");
        assert_eq!(request["stream"], false);
        assert_eq!(request["options"]["num_predict"], 2048);
        assert!(request.get("tools").is_none());
        assert_eq!(request["messages"][0]["role"], "user");
        assert_eq!(request["messages"][0]["content"], "get pods");
    }

    #[test]
    fn test_build_request_with_tools_and_history() {
        let mut assistant = Message::assistant("");
        assistant.tool_calls = Some(vec![ToolCall::new(
            "call_0",
            "execute_k8s_command",
            json!({"command": "get pods"}),
        )]);

        let request = provider().build_request(&ChatParams {
            model: "qwen2.5:7b".to_string(),
            messages: vec![
                assistant,
                Message::tool("call_0", "execute_k8s_command", "NAME READY"),
            ],
            tools: vec![Tool::new(
                "execute_k8s_command",
                "Run kubectl",
                json!({
                    "type": "object",
                    "properties": {"command": {"type": "string"}},
                    "required": ["command"]
                }),
            )],
            ..Default::default()
        });

        assert_eq!(request["model"], "qwen2.5:7b");
        let messages = request["messages"].as_array().unwrap();
        assert_eq!(
            messages[0]["tool_calls"][0]["function"]["name"],
            "execute_k8s_command"
        );
        assert_eq!(
            messages[0]["tool_calls"][0]["function"]["arguments"]["command"],
            "get pods"
        );
        assert_eq!(messages[1]["role"], "tool");
        assert_eq!(messages[1]["tool_name"], "execute_k8s_command");
        assert_eq!(request["tools"][0]["function"]["name"], "execute_k8s_command");
    }

    #[test]
    fn test_parse_response_text_only() {
        let response = provider()
            .parse_response(json!({
                "message": {"role": "assistant", "content": "All pods are running."},
                "done": true,
                "done_reason": "stop",
                "prompt_eval_count": 40,
                "eval_count": 7
            }))
            .unwrap();

        assert_eq!(response.content.as_deref(), Some("All pods are running."));
        assert!(!response.has_tool_calls());
        assert_eq!(response.usage.prompt_tokens, 40);
        assert_eq!(response.usage.completion_tokens, 7);
    }

    #[test]
    fn test_parse_response_tool_calls_object_and_string_args() {
        let response = provider()
            .parse_response(json!({
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [
                        {"function": {"name": "get_pod_logs", "arguments": {"pod_name": "web-1"}}},
                        {"function": {"name": "read_rag_docs", "arguments": "{\"query\": \"OOMKilled\"}"}},
                        {"function": {"name": "", "arguments": {}}}
                    ]
                },
                "done": true
            }))
            .unwrap();

        assert!(response.content.is_none());
        assert_eq!(response.tool_calls.len(), 2);
        assert_eq!(response.tool_calls[0].id, "call_0");
        assert_eq!(response.tool_calls[0].arguments["pod_name"], "web-1");
        assert_eq!(response.tool_calls[1].id, "call_1");
        assert_eq!(response.tool_calls[1].arguments["query"], "OOMKilled");
        assert_eq!(response.finish_reason, "tool_calls");
    }

    #[test]
    fn test_parse_response_missing_message() {
        let result = provider().parse_response(json!({"done": true}));
        assert!(matches!(result, Err(ProviderError::InvalidResponse)));
    }
}
