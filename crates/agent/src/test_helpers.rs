//! Shared test doubles for the agent crate.

use async_trait::async_trait;
use prdigest_core::error::ProviderError;
use prdigest_core::message::{Message, MessageToolCall};
use prdigest_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use prdigest_core::tool::{ToolHost, ToolResult};
use serde_json::Value;
use std::sync::Mutex;

/// A provider that replays scripted responses in order and records every
/// request it receives.
///
/// Panics when asked for more responses than scripted, unless built with
/// [`ScriptedProvider::forever`].
pub struct ScriptedProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    repeat_last: bool,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    pub fn with_results(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
            repeat_last: false,
        }
    }

    /// Answers every request with `response`.
    pub fn forever(response: ProviderResponse) -> Self {
        Self {
            responses: Mutex::new(vec![Ok(response)]),
            requests: Mutex::new(Vec::new()),
            repeat_last: true,
        }
    }

    pub fn text(text: &str) -> Self {
        Self::new(vec![text_response(text)])
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let call = requests.len();
        requests.push(request);

        let mut responses = self.responses.lock().unwrap();
        if self.repeat_last {
            return responses[0].clone();
        }
        if responses.is_empty() {
            panic!("ScriptedProvider: no response scripted for call #{call}");
        }
        responses.remove(0)
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

/// A final answer with no tool calls.
pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Some(Message::assistant(text)),
        usage: usage(),
        model: "mock-model".into(),
    }
}

pub fn tool_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    ProviderResponse {
        message: Some(Message::assistant_with_tools("", tool_calls)),
        usage: usage(),
        model: "mock-model".into(),
    }
}

/// A response with no message at all.
pub fn empty_response() -> ProviderResponse {
    ProviderResponse {
        message: None,
        usage: None,
        model: "mock-model".into(),
    }
}

pub fn tool_call(id: &str, name: &str, args: Value) -> MessageToolCall {
    MessageToolCall {
        id: id.into(),
        name: name.into(),
        arguments: args.to_string(),
    }
}

/// A raw tool call whose argument payload is passed through as-is.
pub fn raw_tool_call(id: &str, name: &str, arguments: &str) -> MessageToolCall {
    MessageToolCall {
        id: id.into(),
        name: name.into(),
        arguments: arguments.into(),
    }
}

type Handler = Box<dyn Fn(&str, &Value) -> ToolResult + Send + Sync>;

/// A tool host answering through a closure and recording every call.
pub struct MockHost {
    handler: Handler,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockHost {
    pub fn new(handler: impl Fn(&str, &Value) -> ToolResult + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answers every call with the same text.
    pub fn fixed(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_, _| ToolResult::success(text.clone()))
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| n == name)
            .count()
    }
}

#[async_trait]
impl ToolHost for MockHost {
    async fn invoke(&self, name: &str, arguments: Value) -> ToolResult {
        let result = (self.handler)(name, &arguments);
        self.calls.lock().unwrap().push((name.to_string(), arguments));
        result
    }
}
