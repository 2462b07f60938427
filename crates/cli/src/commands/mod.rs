pub mod config_cmd;
pub mod discover;
pub mod run;
pub mod tools;

use anyhow::Context;
use chrono::Utc;
use prdigest_config::{AppConfig, EnvSecretResolver};
use prdigest_core::summary::TimeWindow;
use prdigest_toolhost::{ALL_TOOLS, ToolHostAdapter};
use std::path::Path;

/// Load, resolve and validate the config file.
pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    AppConfig::load(path, &EnvSecretResolver)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// The reporting window ending now.
pub fn window(config: &AppConfig, days: Option<u32>) -> TimeWindow {
    TimeWindow::last_days(days.unwrap_or(config.time_window_days), Utc::now())
}

/// Build the tool host adapter, check its binding table, and connect.
///
/// The caller owns the returned adapter and must `disconnect` it.
pub async fn connect_host(config: &AppConfig) -> anyhow::Result<ToolHostAdapter> {
    let mut host = ToolHostAdapter::from_config(&config.tool_host);
    host.tool_map()
        .validate(ALL_TOOLS.iter().copied())
        .context("Tool binding table is incomplete")?;
    host.connect()
        .await
        .context("Could not connect to the tool host")?;
    Ok(host)
}
