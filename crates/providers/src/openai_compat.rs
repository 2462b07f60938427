//! OpenAI-compatible chat completions.
//!
//! Works with OpenAI, OpenRouter, GitHub Models, Ollama, vLLM and any
//! endpoint exposing `/chat/completions` with function calling. Responses
//! are non-streaming: one request per loop round.

use async_trait::async_trait;
use prdigest_core::error::ProviderError;
use prdigest_core::message::{Message, MessageToolCall, Role};
use prdigest_core::provider::{
    Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage,
};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// A reasoning service reached over the OpenAI chat completions API.
pub struct OpenAiCompatProvider {
    name: String,
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let base_url = base_url.into();
        Self {
            name: name.into(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let body = ChatRequest::from(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Requesting completion"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_secs(response.headers());
            let text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %text, "Completion request rejected");
            return Err(status_error(status, retry_after, text, &request.model));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: status.as_u16(),
            message: format!("Failed to parse response: {e}"),
        })?;

        Ok(parsed.into())
    }
}

fn retry_after_secs(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

/// Map a non-success status onto the provider error taxonomy.
fn status_error(status: StatusCode, retry_after: u64, body: String, model: &str) -> ProviderError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited {
            retry_after_secs: retry_after,
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        StatusCode::NOT_FOUND => ProviderError::ModelNotFound(model.to_string()),
        _ => ProviderError::ApiError {
            status_code: status.as_u16(),
            message: body,
        },
    }
}

// --- Wire types ---

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

impl<'a> From<&'a ProviderRequest> for ChatRequest<'a> {
    fn from(request: &'a ProviderRequest) -> Self {
        let tools: Vec<WireTool<'a>> = request.tools.iter().map(WireTool::from).collect();
        Self {
            model: &request.model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
            temperature: request.temperature,
            stream: false,
            max_tokens: request.max_tokens,
            // tool_choice is only meaningful alongside declared tools.
            tool_choice: (!tools.is_empty()).then(|| request.tool_choice.as_str()),
            tools,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        let role = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        // Assistant turns that only call tools carry a null content.
        let content = (!(message.role == Role::Assistant
            && message.has_tool_calls()
            && message.content.is_empty()))
        .then(|| message.content.clone());

        Self {
            role: role.to_string(),
            content,
            tool_calls: message
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    kind: "function".into(),
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect(),
            tool_call_id: message.tool_call_id.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunctionCall,
}

fn function_kind() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    // Some services omit arguments for zero-parameter calls.
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireToolSpec<'a>,
}

#[derive(Debug, Serialize)]
struct WireToolSpec<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

impl<'a> From<&'a ToolDefinition> for WireTool<'a> {
    fn from(tool: &'a ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: WireToolSpec {
                name: &tool.name,
                description: &tool.description,
                parameters: &tool.parameters,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

impl From<ChatResponse> for ProviderResponse {
    fn from(response: ChatResponse) -> Self {
        // Only the first choice is used; no choices at all means no message.
        let message = response.choices.into_iter().next().map(|choice| {
            let calls = choice
                .message
                .tool_calls
                .into_iter()
                .map(|call| MessageToolCall {
                    id: call.id,
                    name: call.function.name,
                    arguments: call.function.arguments,
                })
                .collect();
            Message::assistant_with_tools(choice.message.content.unwrap_or_default(), calls)
        });

        ProviderResponse {
            message,
            usage: response.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model: response.model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prdigest_core::provider::ToolChoice;
    use serde_json::json;

    fn request(tools: Vec<ToolDefinition>, messages: Vec<Message>) -> ProviderRequest {
        ProviderRequest {
            model: "gpt-4o-mini".into(),
            messages,
            temperature: 0.2,
            max_tokens: None,
            tools,
            tool_choice: ToolChoice::Auto,
        }
    }

    fn body(request: &ProviderRequest) -> serde_json::Value {
        serde_json::to_value(ChatRequest::from(request)).unwrap()
    }

    #[test]
    fn endpoint_is_derived_from_base_url() {
        let provider = OpenAiCompatProvider::new("github", "https://models.github.ai/inference/", "k");
        assert_eq!(provider.endpoint(), "https://models.github.ai/inference/chat/completions");
        assert_eq!(provider.name(), "github");
    }

    #[test]
    fn roles_and_tool_replies_are_converted() {
        let req = request(
            vec![],
            vec![
                Message::system("You summarize repos"),
                Message::user("acme/api"),
                Message::tool_result("call_1", "[]"),
            ],
        );
        let body = body(&req);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][2]["role"], "tool");
        assert_eq!(body["messages"][2]["tool_call_id"], "call_1");
        assert!(body["messages"][1].get("tool_calls").is_none());
    }

    #[test]
    fn tool_only_assistant_turn_has_null_content() {
        let msg = Message::assistant_with_tools(
            "",
            vec![MessageToolCall {
                id: "call_1".into(),
                name: "list_pull_requests".into(),
                arguments: r#"{"owner":"acme"}"#.into(),
            }],
        );
        let body = body(&request(vec![], vec![msg]));
        let wire = &body["messages"][0];
        assert!(wire.get("content").is_none());
        assert_eq!(wire["tool_calls"][0]["type"], "function");
        assert_eq!(wire["tool_calls"][0]["function"]["name"], "list_pull_requests");
    }

    #[test]
    fn declared_tools_come_with_auto_choice() {
        let mut req = request(
            vec![ToolDefinition {
                name: "get_pull_request".into(),
                description: "Fetch one PR".into(),
                parameters: json!({"type": "object"}),
            }],
            vec![Message::user("hi")],
        );
        req.max_tokens = Some(512);

        let body = body(&req);
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "get_pull_request");
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn no_tools_means_no_tool_choice() {
        let body = body(&request(vec![], vec![]));
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn tool_call_response_becomes_assistant_message() {
        let parsed: ChatResponse = serde_json::from_value(json!({
            "model": "gpt-4o-mini",
            "choices": [{"message": {"role": "assistant", "content": null, "tool_calls": [
                {"id": "call_abc", "type": "function",
                 "function": {"name": "list_pull_requests", "arguments": "{\"owner\":\"acme\"}"}}
            ]}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }))
        .unwrap();

        let response = ProviderResponse::from(parsed);
        let message = response.message.unwrap();
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.tool_calls.len(), 1);
        assert_eq!(message.tool_calls[0].id, "call_abc");
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn response_without_choices_has_no_message() {
        let parsed: ChatResponse =
            serde_json::from_value(json!({"model": "gpt-4o-mini", "choices": []})).unwrap();
        assert!(ProviderResponse::from(parsed).message.is_none());
    }

    #[test]
    fn statuses_map_to_error_kinds() {
        let limited = status_error(StatusCode::TOO_MANY_REQUESTS, 30, String::new(), "m");
        assert!(matches!(limited, ProviderError::RateLimited { retry_after_secs: 30 }));

        let denied = status_error(StatusCode::FORBIDDEN, 5, String::new(), "m");
        assert!(matches!(denied, ProviderError::AuthenticationFailed(_)));

        let missing = status_error(StatusCode::NOT_FOUND, 5, String::new(), "gpt-x");
        assert!(matches!(missing, ProviderError::ModelNotFound(ref m) if m == "gpt-x"));

        let other = status_error(StatusCode::BAD_GATEWAY, 5, "upstream".into(), "m");
        assert!(matches!(
            other,
            ProviderError::ApiError { status_code: 502, ref message } if message == "upstream"
        ));
    }

    #[test]
    fn retry_after_falls_back_to_default() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after_secs(&headers), DEFAULT_RETRY_AFTER_SECS);
        headers.insert(RETRY_AFTER, "12".parse().unwrap());
        assert_eq!(retry_after_secs(&headers), 12);
    }
}
