//! Tool host trait: the abstraction over the capability host.
//!
//! The agent never talks to the host directly. It hands an abstract tool name
//! and a JSON argument bag to a [`ToolHost`] and always gets a [`ToolResult`]
//! back; failures are data, not errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A parsed request to execute a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Abstract name of the tool to execute
    pub name: String,

    /// Arguments as a JSON object
    pub arguments: serde_json::Value,
}

/// One content segment of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Content kind as reported by the host ("text", "image", "resource", ...)
    pub kind: String,

    /// Extractable text, if this segment carries any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Segment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".into(),
            text: Some(text.into()),
        }
    }
}

/// The uniform result envelope produced by a tool host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Ordered content segments
    pub segments: Vec<Segment>,

    /// Whether the invocation failed
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    /// A successful single-segment text result.
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::text(text)],
            is_error: false,
        }
    }

    /// An error result carrying a human-readable message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::text(message)],
            is_error: true,
        }
    }

    /// Join the text of every text-bearing segment with newlines.
    pub fn joined_text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|s| s.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The core ToolHost trait.
///
/// `invoke` must never fail: connection loss, host-side errors and malformed
/// responses are reported as `ToolResult { is_error: true, .. }`.
#[async_trait]
pub trait ToolHost: Send + Sync {
    /// Execute the abstract tool `name` with `arguments`.
    async fn invoke(&self, name: &str, arguments: serde_json::Value) -> ToolResult;
}
