//! `prdigest discover`: List repositories with activity in the window.

use super::{connect_host, load_config, window};
use prdigest_agent::{DiscoveryOptions, RepoDiscovery};
use std::path::Path;

pub async fn run(config_path: &Path, days: Option<u32>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let window = window(&config, days);

    let mut host = connect_host(&config).await?;
    let active = RepoDiscovery::new(&host, &config.organization)
        .with_options(DiscoveryOptions::from(&config.pacing))
        .discover(&config.teams, &window)
        .await;
    host.disconnect().await;

    println!("🔎 {} ({window})", config.organization);
    println!();
    if active.is_empty() {
        println!("  No repositories with merged pull requests.");
        return Ok(());
    }

    let width = active
        .iter()
        .map(|a| a.full_name().len())
        .max()
        .unwrap_or(0);
    for activity in &active {
        println!(
            "  {:<width$}  {:>3} PR(s)",
            activity.full_name(),
            activity.pr_count
        );
    }
    println!();
    println!("  {} active repositories", active.len());
    Ok(())
}
