//! Configuration loading, validation, and management for prdigest.
//!
//! Loads configuration from a TOML file (default `./prdigest.toml`, or the
//! path in `PRDIGEST_CONFIG`) with environment variable overrides, resolves
//! `secret:<name>` references, and validates all settings at startup.

pub mod secrets;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use secrets::{EnvSecretResolver, SecretResolver};

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// GitHub organization whose repositories are digested
    #[serde(default)]
    pub organization: String,

    /// Length of the reporting window, ending now
    #[serde(default = "default_time_window_days")]
    pub time_window_days: u32,

    /// Where the Markdown report is written
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Reasoning service settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Capability host settings
    #[serde(default)]
    pub tool_host: ToolHostConfig,

    /// Tool-calling loop limits
    #[serde(default)]
    pub agent: AgentConfig,

    /// Self-imposed rate limiting
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Team definitions
    #[serde(default)]
    pub teams: Vec<TeamConfig>,
}

fn default_time_window_days() -> u32 {
    7
}
fn default_output() -> PathBuf {
    PathBuf::from("pr-digest.md")
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("organization", &self.organization)
            .field("time_window_days", &self.time_window_days)
            .field("output", &self.output)
            .field("model", &self.model)
            .field("tool_host", &self.tool_host)
            .field("agent", &self.agent)
            .field("pacing", &self.pacing)
            .field("teams", &self.teams)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider name ("openrouter", "openai", "github", "ollama", ...)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier sent to the provider
    #[serde(default = "default_model")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    4096
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            name: default_model(),
            api_key: None,
            api_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl ModelConfig {
    /// Local providers do not need an API key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self.provider.as_str(), "ollama" | "vllm" | "llamacpp")
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("name", &self.name)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Tool surface version of the capability host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostSchema {
    /// The original reference server: one tool per operation, snake_case arguments
    Legacy,
    /// The current GitHub server: camelCase arguments, pull-request reads
    /// folded into `pull_request_read`
    #[default]
    Consolidated,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ToolHostConfig {
    /// Streamable-HTTP endpoint of the MCP server
    #[serde(default = "default_tool_host_url")]
    pub url: String,

    /// Bearer token sent to the host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default)]
    pub schema: HostSchema,

    #[serde(default = "default_tool_host_timeout")]
    pub timeout_secs: u64,

    /// Per-tool overrides of the built-in binding table
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bindings: BTreeMap<String, BindingConfig>,
}

fn default_tool_host_url() -> String {
    "https://api.githubcopilot.com/mcp/".into()
}
fn default_tool_host_timeout() -> u64 {
    60
}

impl Default for ToolHostConfig {
    fn default() -> Self {
        Self {
            url: default_tool_host_url(),
            token: None,
            schema: HostSchema::default(),
            timeout_secs: default_tool_host_timeout(),
            bindings: BTreeMap::new(),
        }
    }
}

impl std::fmt::Debug for ToolHostConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolHostConfig")
            .field("url", &self.url)
            .field("token", &redact(&self.token))
            .field("schema", &self.schema)
            .field("timeout_secs", &self.timeout_secs)
            .field("bindings", &self.bindings)
            .finish()
    }
}

/// Override for one abstract tool: which host tool to call and how to reshape
/// the arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Concrete tool name on the host
    pub concrete: String,

    /// Abstract argument name → host argument name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub renames: BTreeMap<String, String>,

    /// Constant arguments added to every call
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub inject: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Hard cap on model round trips per repository
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// Messages kept (besides the system prompt) when history is pruned
    #[serde(default = "default_keep_recent")]
    pub keep_recent: usize,

    /// Estimated conversation size that triggers pruning
    #[serde(default = "default_context_ceiling")]
    pub context_ceiling_tokens: usize,

    /// Per-result budget for ordinary tool output
    #[serde(default = "default_tool_result_tokens")]
    pub tool_result_tokens: usize,

    /// Per-result budget for diff and file-listing output
    #[serde(default = "default_bulk_result_tokens")]
    pub bulk_result_tokens: usize,
}

fn default_max_rounds() -> u32 {
    20
}
fn default_keep_recent() -> usize {
    5
}
fn default_context_ceiling() -> usize {
    60_000
}
fn default_tool_result_tokens() -> usize {
    6_000
}
fn default_bulk_result_tokens() -> usize {
    2_000
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            keep_recent: default_keep_recent(),
            context_ceiling_tokens: default_context_ceiling(),
            tool_result_tokens: default_tool_result_tokens(),
            bulk_result_tokens: default_bulk_result_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Pause between paginated host requests and between repository checks
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Pause between repository summaries
    #[serde(default = "default_repo_delay_ms")]
    pub repo_delay_ms: u64,
}

fn default_request_delay_ms() -> u64 {
    500
}
fn default_repo_delay_ms() -> u64 {
    2_000
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            repo_delay_ms: default_repo_delay_ms(),
        }
    }
}

/// A team and the repositories it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamConfig {
    pub name: String,

    /// Explicit repository names
    #[serde(default)]
    pub repos: Vec<String>,

    /// Repository name prefixes, expanded by search
    #[serde(default)]
    pub prefixes: Vec<String>,
}

impl TeamConfig {
    /// Whether `owner/repo` belongs to this team.
    ///
    /// A bare entry in `repos` names a repository of `organization`; an
    /// `owner/repo` entry names exactly that repository. Prefixes only match
    /// inside the organization, since that is where they are searched.
    pub fn owns(&self, organization: &str, owner: &str, repo: &str) -> bool {
        let in_org = owner.eq_ignore_ascii_case(organization);
        let listed = self.repos.iter().any(|entry| match entry.split_once('/') {
            Some((o, r)) => o.eq_ignore_ascii_case(owner) && r.eq_ignore_ascii_case(repo),
            None => in_org && entry.eq_ignore_ascii_case(repo),
        });
        listed
            || (in_org
                && self
                    .prefixes
                    .iter()
                    .any(|p| repo.to_ascii_lowercase().starts_with(&p.to_ascii_lowercase())))
    }
}

impl AppConfig {
    /// Resolve the config file path: `PRDIGEST_CONFIG` or `./prdigest.toml`.
    pub fn default_path() -> PathBuf {
        std::env::var("PRDIGEST_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("prdigest.toml"))
    }

    /// Load, override, resolve and validate configuration from `path`.
    ///
    /// Environment overrides:
    /// - `PRDIGEST_ORG`, `PRDIGEST_PROVIDER`, `PRDIGEST_MODEL`
    /// - `PRDIGEST_API_KEY` / `OPENROUTER_API_KEY` / `OPENAI_API_KEY` when no key is configured
    /// - `GITHUB_TOKEN` / `GITHUB_PERSONAL_ACCESS_TOKEN` when no host token is configured
    pub fn load(path: &Path, resolver: &dyn SecretResolver) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides();
        config.resolve_secrets(resolver)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a specific file path without resolving secrets.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config = Self::from_toml(&content).map_err(|e| match e {
            ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;

        tracing::debug!(path = %path.display(), teams = config.teams.len(), "Loaded config file");
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::new(),
            reason: e.to_string(),
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(org) = std::env::var("PRDIGEST_ORG") {
            self.organization = org;
        }
        if let Ok(provider) = std::env::var("PRDIGEST_PROVIDER") {
            self.model.provider = provider;
        }
        if let Ok(model) = std::env::var("PRDIGEST_MODEL") {
            self.model.name = model;
        }

        if self.model.api_key.is_none() {
            self.model.api_key = std::env::var("PRDIGEST_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if self.tool_host.token.is_none() {
            self.tool_host.token = std::env::var("GITHUB_TOKEN")
                .ok()
                .or_else(|| std::env::var("GITHUB_PERSONAL_ACCESS_TOKEN").ok());
        }
    }

    /// Replace every `secret:<name>` value with the resolved secret.
    ///
    /// Any reference that cannot be resolved is fatal.
    pub fn resolve_secrets(&mut self, resolver: &dyn SecretResolver) -> Result<(), ConfigError> {
        resolve_field(&mut self.organization, "organization", resolver)?;
        resolve_field(&mut self.model.name, "model.name", resolver)?;
        resolve_optional(&mut self.model.api_key, "model.api_key", resolver)?;
        resolve_optional(&mut self.model.api_url, "model.api_url", resolver)?;
        resolve_field(&mut self.tool_host.url, "tool_host.url", resolver)?;
        resolve_optional(&mut self.tool_host.token, "tool_host.token", resolver)?;
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.organization.trim().is_empty() {
            return Err(ConfigError::MissingValue("organization".into()));
        }

        if self.time_window_days == 0 {
            return Err(ConfigError::ValidationError(
                "time_window_days must be at least 1".into(),
            ));
        }

        if self.model.temperature < 0.0 || self.model.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "model.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_rounds must be at least 1".into(),
            ));
        }

        if self.agent.keep_recent == 0 {
            return Err(ConfigError::ValidationError(
                "agent.keep_recent must be at least 1".into(),
            ));
        }

        if self.agent.bulk_result_tokens == 0 || self.agent.tool_result_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "agent tool result budgets must be greater than 0".into(),
            ));
        }

        if self.teams.is_empty() {
            return Err(ConfigError::MissingValue("teams".into()));
        }

        for team in &self.teams {
            if team.repos.is_empty() && team.prefixes.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "team '{}' needs at least one repo or prefix",
                    team.name
                )));
            }
        }

        Ok(())
    }

    /// Check that the credentials needed to reach both remote services are present.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        if self.model.requires_api_key() && self.model.api_key.is_none() {
            return Err(ConfigError::MissingValue("model.api_key".into()));
        }
        if self.tool_host.token.is_none() {
            return Err(ConfigError::MissingValue("tool_host.token".into()));
        }
        Ok(())
    }

    /// Generate an example config TOML string.
    pub fn example_toml() -> String {
        let config = Self {
            organization: "my-org".into(),
            teams: vec![TeamConfig {
                name: "Platform".into(),
                repos: vec!["infra-core".into()],
                prefixes: vec!["platform-".into()],
            }],
            model: ModelConfig {
                api_key: Some("secret:openrouter-api-key".into()),
                ..ModelConfig::default()
            },
            tool_host: ToolHostConfig {
                token: Some("secret:github-token".into()),
                ..ToolHostConfig::default()
            },
            ..Self::default()
        };
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn resolve_field(
    value: &mut String,
    field: &str,
    resolver: &dyn SecretResolver,
) -> Result<(), ConfigError> {
    if let Some(name) = secrets::secret_name(value) {
        let resolved = resolver
            .resolve(name)
            .ok_or_else(|| ConfigError::SecretUnresolved {
                field: field.to_string(),
                name: name.to_string(),
            })?;
        tracing::debug!(field, secret = name, "Resolved secret reference");
        *value = resolved;
    }
    Ok(())
}

fn resolve_optional(
    value: &mut Option<String>,
    field: &str,
    resolver: &dyn SecretResolver,
) -> Result<(), ConfigError> {
    match value {
        Some(v) => resolve_field(v, field, resolver),
        None => Ok(()),
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            organization: String::new(),
            time_window_days: default_time_window_days(),
            output: default_output(),
            model: ModelConfig::default(),
            tool_host: ToolHostConfig::default(),
            agent: AgentConfig::default(),
            pacing: PacingConfig::default(),
            teams: vec![],
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found at {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Required setting '{0}' is missing")]
    MissingValue(String),

    #[error("Secret '{name}' referenced by '{field}' could not be resolved")]
    SecretUnresolved { field: String, name: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
