//! `prdigest tools`: Inspect the tool host and the binding table.

use super::{connect_host, load_config};
use std::path::Path;

pub async fn run(config_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let mut host = connect_host(&config).await?;
    let offered = host.list_tools().await;
    let missing = host.check_host_surface().await;
    host.disconnect().await;

    println!("🧰 Tool host: {}", config.tool_host.url);
    println!("   Schema:    {:?}", host.tool_map().schema());
    println!();

    if offered.is_empty() {
        println!("  The host did not list any tools.");
    } else {
        println!("  Advertised tools ({}):", offered.len());
        for tool in &offered {
            let description = tool
                .description
                .as_deref()
                .and_then(|d| d.lines().next())
                .unwrap_or("");
            println!("    {:<32} {description}", tool.name);
        }
    }

    println!();
    println!("  Bindings:");
    for (name, binding) in host.tool_map().iter() {
        let mark = if missing.contains(&binding.concrete) { "❌" } else { "✅" };
        let mut detail = String::new();
        if !binding.renames.is_empty() {
            let renames: Vec<_> = binding
                .renames
                .iter()
                .map(|(from, to)| format!("{from}→{to}"))
                .collect();
            detail.push_str(&format!(" renames [{}]", renames.join(", ")));
        }
        if !binding.inject.is_empty() {
            let injected: Vec<_> = binding
                .inject
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            detail.push_str(&format!(" inject [{}]", injected.join(", ")));
        }
        println!("    {mark} {name:<24} → {}{detail}", binding.concrete);
    }

    if !missing.is_empty() {
        println!();
        println!(
            "  ⚠️  {} bound tool(s) not advertised by the host; check tool_host.schema",
            missing.len()
        );
    }
    Ok(())
}
