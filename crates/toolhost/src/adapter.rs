//! The adapter the rest of the program talks to.
//!
//! Wraps a [`HostClient`] and a [`ToolMap`] behind the [`ToolHost`] trait:
//! abstract name in, normalized [`ToolResult`] out, never an `Err`.

use crate::client::{CallToolResult, HostClient, HostTool, McpHttpClient};
use crate::mapping::ToolMap;
use async_trait::async_trait;
use prdigest_config::ToolHostConfig;
use prdigest_core::error::ToolHostError;
use prdigest_core::tool::{Segment, ToolHost, ToolResult};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

pub struct ToolHostAdapter {
    client: Box<dyn HostClient>,
    tools: ToolMap,
    connected: bool,
}

impl ToolHostAdapter {
    pub fn new(client: Box<dyn HostClient>, tools: ToolMap) -> Self {
        Self {
            client,
            tools,
            connected: false,
        }
    }

    /// An MCP-over-HTTP adapter with the configured binding table.
    pub fn from_config(config: &ToolHostConfig) -> Self {
        let client = McpHttpClient::new(
            config.url.clone(),
            config.token.clone(),
            Duration::from_secs(config.timeout_secs),
        );
        Self::new(Box::new(client), ToolMap::from_config(config))
    }

    pub fn tool_map(&self) -> &ToolMap {
        &self.tools
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub async fn connect(&mut self) -> Result<(), ToolHostError> {
        if self.connected {
            return Ok(());
        }
        let endpoint = self.client.endpoint().to_string();
        self.client.connect().await.map_err(|e| match e {
            ToolHostError::Connection { .. } => e,
            other => ToolHostError::Connection {
                endpoint: endpoint.clone(),
                reason: other.to_string(),
            },
        })?;
        self.connected = true;
        info!(endpoint = %endpoint, schema = ?self.tools.schema(), "Connected to tool host");
        Ok(())
    }

    /// Close the session. Idempotent; teardown failures are only logged.
    pub async fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        match self.client.close().await {
            Ok(()) => info!(endpoint = %self.client.endpoint(), "Disconnected from tool host"),
            Err(e) => warn!(error = %e, "Tool host session teardown failed"),
        }
    }

    /// Tools advertised by the host. Diagnostic only: failures yield an empty list.
    pub async fn list_tools(&self) -> Vec<HostTool> {
        if !self.connected {
            warn!("list_tools called before connect");
            return Vec::new();
        }
        match self.client.list_tools().await {
            Ok(tools) => tools,
            Err(e) => {
                warn!(error = %e, "Could not list tool host tools");
                Vec::new()
            }
        }
    }

    /// Concrete tool names the binding table needs but the host does not offer.
    pub async fn check_host_surface(&self) -> Vec<String> {
        let offered = self.list_tools().await;
        if offered.is_empty() {
            return Vec::new();
        }
        let missing: Vec<String> = self
            .tools
            .concrete_names()
            .into_iter()
            .filter(|needed| !offered.iter().any(|t| t.name == *needed))
            .map(String::from)
            .collect();
        if !missing.is_empty() {
            warn!(missing = ?missing, "Tool host does not advertise some bound tools");
        }
        missing
    }

    async fn try_invoke(&self, name: &str, arguments: Value) -> Result<ToolResult, ToolHostError> {
        if !self.connected {
            return Err(ToolHostError::NotConnected);
        }
        let (concrete, shaped) = self.tools.resolve(name, arguments)?;
        info!(tool = name, concrete = %concrete, arguments = %shaped, "Invoking host tool");

        let result = self.client.call_tool(&concrete, shaped).await?;
        Ok(normalize(result))
    }
}

fn normalize(result: CallToolResult) -> ToolResult {
    let segments = result
        .content
        .iter()
        .map(|item| Segment {
            kind: item.kind.clone(),
            text: item.extract_text(),
        })
        .collect();
    ToolResult {
        segments,
        is_error: result.is_error,
    }
}

#[async_trait]
impl ToolHost for ToolHostAdapter {
    async fn invoke(&self, name: &str, arguments: Value) -> ToolResult {
        match self.try_invoke(name, arguments).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = name, error = %e, "Host tool invocation failed");
                ToolResult::error(e.to_string())
            }
        }
    }
}
