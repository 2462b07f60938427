//! MCP client over streamable HTTP.
//!
//! Uses the official `rmcp` SDK for the handshake, session handling and
//! event-stream framing. This module only maps its model types onto the
//! small surface the adapter needs.

use async_trait::async_trait;
use prdigest_core::error::ToolHostError;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use rmcp::model::{
    CallToolRequestParam, ClientCapabilities, ClientInfo, Content, Implementation, LoggingLevel,
    LoggingMessageNotificationParam, ProtocolVersion, RawContent,
};
use rmcp::service::{NotificationContext, RunningService, ServiceError};
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::{ClientHandler, RoleClient};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// A tool as advertised by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Option<Value>,
}

/// One content item of a `tools/call` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostContent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub resource: Option<Value>,
}

impl HostContent {
    /// The text carried by this item, looking inside embedded resources too.
    pub fn extract_text(&self) -> Option<String> {
        if let Some(text) = &self.text {
            return Some(text.clone());
        }
        self.resource
            .as_ref()
            .and_then(|r| r.get("text"))
            .and_then(Value::as_str)
            .map(String::from)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<HostContent>,
    #[serde(default)]
    pub is_error: bool,
}

/// Low-level protocol client for a capability host.
///
/// The adapter owns one of these; tests substitute an in-memory version.
#[async_trait]
pub trait HostClient: Send + Sync {
    /// Where this client connects, for diagnostics.
    fn endpoint(&self) -> &str;

    /// Open a session (handshake included).
    async fn connect(&mut self) -> Result<(), ToolHostError>;

    async fn list_tools(&self) -> Result<Vec<HostTool>, ToolHostError>;

    async fn call_tool(&self, name: &str, arguments: Value)
    -> Result<CallToolResult, ToolHostError>;

    /// Release the session. Safe to call when not connected.
    async fn close(&mut self) -> Result<(), ToolHostError>;
}

/// Client-side handler: announces who we are and forwards server log
/// notifications into our own log.
#[derive(Clone)]
struct DigestClientHandler {
    info: ClientInfo,
}

impl ClientHandler for DigestClientHandler {
    fn get_info(&self) -> ClientInfo {
        self.info.clone()
    }

    async fn on_logging_message(
        &self,
        params: LoggingMessageNotificationParam,
        _context: NotificationContext<RoleClient>,
    ) {
        let LoggingMessageNotificationParam { level, logger, data } = params;
        let logger = logger.as_deref();
        match level {
            LoggingLevel::Critical | LoggingLevel::Error => {
                error!(?logger, %data, "Tool host log");
            }
            LoggingLevel::Warning => warn!(?logger, %data, "Tool host log"),
            LoggingLevel::Debug => debug!(?logger, %data, "Tool host log"),
            _ => info!(?logger, %data, "Tool host log"),
        }
    }
}

type HostSession = RunningService<RoleClient, DigestClientHandler>;

/// Streamable-HTTP MCP client backed by `rmcp` and reqwest.
pub struct McpHttpClient {
    endpoint: String,
    token: Option<String>,
    request_timeout: Duration,
    session: Option<HostSession>,
}

impl McpHttpClient {
    pub fn new(endpoint: impl Into<String>, token: Option<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            token,
            request_timeout: timeout,
            session: None,
        }
    }

    fn http_client(&self) -> reqwest::Client {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("prdigest/", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(token) = &self.token {
            match HeaderValue::from_str(&format!("Bearer {}", token.trim())) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("Tool host token is not a valid header value; sending no credentials"),
            }
        }

        reqwest::Client::builder()
            .connect_timeout(self.request_timeout)
            .default_headers(headers)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to create HTTP client, using default config: {e}");
                reqwest::Client::new()
            })
    }

    fn session(&self) -> Result<&HostSession, ToolHostError> {
        self.session.as_ref().ok_or(ToolHostError::NotConnected)
    }

    fn client_info() -> ClientInfo {
        ClientInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                title: None,
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
        }
    }

    /// Bound a request future by the configured timeout.
    async fn timed<T>(
        &self,
        method: &str,
        fut: impl Future<Output = Result<T, ServiceError>>,
    ) -> Result<T, ToolHostError> {
        tokio::time::timeout(self.request_timeout, fut)
            .await
            .map_err(|_| {
                ToolHostError::Protocol(format!(
                    "{method} timed out after {:?}",
                    self.request_timeout
                ))
            })?
            .map_err(map_service_error)
    }
}

#[async_trait]
impl HostClient for McpHttpClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn connect(&mut self) -> Result<(), ToolHostError> {
        if self.session.is_some() {
            return Ok(());
        }

        let transport = StreamableHttpClientTransport::with_client(
            self.http_client(),
            StreamableHttpClientTransportConfig::with_uri(self.endpoint.clone()),
        );
        let handler = DigestClientHandler {
            info: Self::client_info(),
        };

        let connection_error = |reason: String| ToolHostError::Connection {
            endpoint: self.endpoint.clone(),
            reason,
        };
        let session = tokio::time::timeout(
            self.request_timeout,
            rmcp::serve_client(handler, transport),
        )
        .await
        .map_err(|_| connection_error(format!("handshake timed out after {:?}", self.request_timeout)))?
        .map_err(|e| connection_error(format!("handshake failed: {e}")))?;

        let server = session
            .peer()
            .peer_info()
            .map(|info| info.server_info.name.clone())
            .unwrap_or_else(|| "unknown".to_string());
        debug!(server, endpoint = %self.endpoint, "MCP session initialized");

        self.session = Some(session);
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<HostTool>, ToolHostError> {
        let session = self.session()?;
        // Follows `nextCursor` until the host runs out of pages.
        let tools = self
            .timed("tools/list", session.peer().list_all_tools())
            .await?;
        Ok(tools.into_iter().map(map_tool).collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<CallToolResult, ToolHostError> {
        let session = self.session()?;
        let arguments = match arguments {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                return Err(ToolHostError::InvalidArguments(format!(
                    "arguments must be an object, got {other}"
                )));
            }
        };

        let result = self
            .timed(
                "tools/call",
                session.peer().call_tool(CallToolRequestParam {
                    name: name.to_string().into(),
                    arguments,
                }),
            )
            .await?;
        Ok(map_tool_result(result))
    }

    async fn close(&mut self) -> Result<(), ToolHostError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        // The transport releases the session (DELETE) as it shuts down.
        let reason = session
            .cancel()
            .await
            .map_err(|e| ToolHostError::Protocol(format!("session shutdown failed: {e}")))?;
        debug!(?reason, endpoint = %self.endpoint, "MCP session closed");
        Ok(())
    }
}

fn map_service_error(error: ServiceError) -> ToolHostError {
    match error {
        ServiceError::McpError(data) => ToolHostError::Remote {
            code: i64::from(data.code.0),
            message: data.message.to_string(),
        },
        other => ToolHostError::Protocol(other.to_string()),
    }
}

fn map_tool(tool: rmcp::model::Tool) -> HostTool {
    HostTool {
        name: tool.name.to_string(),
        description: tool.description.map(|d| d.to_string()),
        input_schema: Some(Value::Object((*tool.input_schema).clone())),
    }
}

fn map_tool_result(result: rmcp::model::CallToolResult) -> CallToolResult {
    let mut content: Vec<HostContent> = result.content.into_iter().map(map_content).collect();

    if content.is_empty()
        && let Some(value) = result.structured_content
    {
        content.push(HostContent {
            kind: "text".to_string(),
            text: Some(value.to_string()),
            resource: None,
        });
    }

    CallToolResult {
        content,
        is_error: result.is_error.unwrap_or(false),
    }
}

fn map_content(content: Content) -> HostContent {
    let (kind, text, resource) = match content.raw {
        RawContent::Text(text) => ("text", Some(text.text), None),
        RawContent::Resource(embedded) => (
            "resource",
            None,
            serde_json::to_value(&embedded.resource).ok(),
        ),
        RawContent::Image(_) => ("image", None, None),
        RawContent::Audio(_) => ("audio", None, None),
        RawContent::ResourceLink(_) => ("resource_link", None, None),
    };
    HostContent {
        kind: kind.to_string(),
        text,
        resource,
    }
}
