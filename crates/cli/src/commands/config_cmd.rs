//! `prdigest config`: Show the effective configuration.

use super::load_config;
use anyhow::Context;
use prdigest_config::AppConfig;
use std::path::Path;

const REDACTED: &str = "********";

pub fn run(config_path: &Path, example: bool) -> anyhow::Result<()> {
    if example {
        print!("{}", AppConfig::example_toml());
        return Ok(());
    }

    println!("🔍 Validating {}...", config_path.display());
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("   ❌ {e:#}");
            return Err(e);
        }
    };
    println!("   ✅ Config parsed and validated");

    let mut warnings = Vec::new();
    if let Err(e) = config.require_credentials() {
        warnings.push(e.to_string());
    }
    for (name, binding) in &config.tool_host.bindings {
        if binding.concrete.trim().is_empty() {
            warnings.push(format!("binding '{name}' has an empty concrete tool name"));
        }
    }
    for w in &warnings {
        println!("   ⚠️  {w}");
    }

    println!();
    println!("{}", redacted_toml(&config)?);
    Ok(())
}

/// The config as TOML with credentials masked.
fn redacted_toml(config: &AppConfig) -> anyhow::Result<String> {
    let mut shown = config.clone();
    if shown.model.api_key.is_some() {
        shown.model.api_key = Some(REDACTED.into());
    }
    if shown.tool_host.token.is_some() {
        shown.tool_host.token = Some(REDACTED.into());
    }
    toml::to_string_pretty(&shown).context("Failed to render config as TOML")
}
