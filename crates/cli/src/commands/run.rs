//! `prdigest run`: Discover, summarize, render, write.

use super::{connect_host, load_config, window};
use anyhow::Context;
use prdigest_agent::{DigestRunner, DiscoveryOptions, RepoDiscovery, SummaryAgent};
use prdigest_config::AppConfig;
use prdigest_core::summary::TimeWindow;
use prdigest_report::{group_by_team, render_markdown, render_skipped};
use prdigest_toolhost::ToolHostAdapter;
use std::path::{Path, PathBuf};
use tracing::info;

pub async fn run(config_path: &Path, output: Option<PathBuf>, days: Option<u32>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    config
        .require_credentials()
        .context("Missing credentials")?;

    let provider = prdigest_providers::build_provider(&config);
    let agent = SummaryAgent::from_config(provider, &config);

    let window = window(&config, days);
    let output = output.unwrap_or_else(|| config.output.clone());

    let mut host = connect_host(&config).await?;
    let result = digest(&config, &host, agent, &window, &output).await;
    host.disconnect().await;
    result
}

async fn digest(
    config: &AppConfig,
    host: &ToolHostAdapter,
    agent: SummaryAgent,
    window: &TimeWindow,
    output: &Path,
) -> anyhow::Result<()> {
    host.check_host_surface().await;

    let active = RepoDiscovery::new(host, &config.organization)
        .with_options(DiscoveryOptions::from(&config.pacing))
        .discover(&config.teams, window)
        .await;

    if active.is_empty() {
        println!(
            "No repositories in {} had merged pull requests in {window}.",
            config.organization
        );
        return Ok(());
    }

    println!("📋 {} active repositories, summarizing...", active.len());
    let outcome = DigestRunner::new(agent)
        .with_pacing(&config.pacing)
        .run(host, &active, window)
        .await;

    if outcome.summaries.is_empty() {
        println!(
            "No summaries were produced ({} repositories failed). See the log for details.",
            outcome.skipped.len()
        );
        return Ok(());
    }

    let groups = group_by_team(outcome.summaries, &config.teams, &config.organization);
    let mut markdown = render_markdown(&groups, window, &config.organization);
    render_skipped(&mut markdown, &outcome.skipped);

    std::fs::write(output, &markdown)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    info!(path = %output.display(), teams = groups.len(), "Report written");
    println!("✅ Digest written to {}", output.display());
    if !outcome.skipped.is_empty() {
        println!("   ⚠️  {} repositories could not be summarized", outcome.skipped.len());
    }
    Ok(())
}
