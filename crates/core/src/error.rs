//! Error types for the prdigest domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all prdigest operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Reasoning service errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Capability host errors ---
    #[error("Tool host error: {0}")]
    ToolHost(#[from] ToolHostError),

    // --- Agent loop errors ---
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolHostError {
    #[error("Could not connect to tool host at {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },

    #[error("Tool host is not connected")]
    NotConnected,

    #[error("Tool host returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Tool host error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("Malformed tool host response: {0}")]
    Protocol(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool map is incomplete: no binding for {}", missing.join(", "))]
    UnboundTools { missing: Vec<String> },
}

#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error("Reasoning service returned no message in round {round}")]
    EmptyResponse { round: u32 },

    #[error("Tool-calling loop exhausted after {rounds} rounds without a final answer")]
    Exhausted { rounds: u32 },

    #[error("Conversation has unanswered tool calls: {}", ids.join(", "))]
    UnansweredToolCalls { ids: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn exhausted_error_mentions_rounds() {
        let err = Error::from(AgentError::Exhausted { rounds: 20 });
        assert!(err.to_string().contains("20 rounds"));
    }

    #[test]
    fn unbound_tools_lists_names() {
        let err = ToolHostError::UnboundTools {
            missing: vec!["get_pull_request".into(), "list_pull_requests".into()],
        };
        assert!(err.to_string().contains("get_pull_request, list_pull_requests"));
    }
}
