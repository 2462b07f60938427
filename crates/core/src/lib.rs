//! # prdigest Core
//!
//! Domain types, traits, and error definitions for prdigest.
//! This crate has **no transport dependencies**: it defines the domain model
//! that the provider, tool host, agent, and report crates implement against.
//!
//! ## Design Philosophy
//!
//! Every remote collaborator is a trait here:
//! - [`Provider`]: the reasoning service that drives the conversation
//! - [`ToolHost`]: the capability host that executes tool calls
//!
//! Implementations live in their respective crates, so the agent loop can be
//! exercised end-to-end against scripted stubs.

pub mod error;
pub mod message;
pub mod provider;
pub mod summary;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{AgentError, Error, ProviderError, Result, ToolHostError};
pub use message::{Conversation, ConversationId, Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolChoice, ToolDefinition};
pub use summary::{BreakingChange, PullRequestSummary, RepoActivity, RepoSummary, TimeWindow};
pub use tool::{Segment, ToolCall, ToolHost, ToolResult};
