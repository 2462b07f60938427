//! Capability host access for prdigest.
//!
//! - [`catalog`]: abstract tool names and the declarations shown to the model
//! - [`mapping`]: per-host-version binding table
//! - [`client`]: MCP over streamable HTTP
//! - [`adapter`]: [`ToolHostAdapter`], the `ToolHost` implementation

pub mod adapter;
pub mod catalog;
pub mod client;
pub mod mapping;

pub use adapter::ToolHostAdapter;
pub use catalog::{ALL_TOOLS, summarizer_tools};
pub use client::{CallToolResult, HostClient, HostContent, HostTool, McpHttpClient};
pub use mapping::{ToolBinding, ToolMap};
