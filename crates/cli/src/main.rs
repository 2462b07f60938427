//! prdigest CLI: the main entry point.
//!
//! Commands:
//! - `run`      - Discover active repositories, summarize them, write the digest
//! - `discover` - List repositories with merged pull requests in the window
//! - `tools`    - Show the tool host's tools and the binding table
//! - `config`   - Show the effective configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "prdigest",
    about = "prdigest: pull request digests summarized by an LLM agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true, env = "PRDIGEST_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize every active repository and write the Markdown digest
    Run {
        /// Override the output path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the window length in days
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        days: Option<u32>,
    },

    /// List active repositories without summarizing them
    Discover {
        /// Override the window length in days
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        days: Option<u32>,
    },

    /// Connect to the tool host and list its tools
    Tools,

    /// Show the effective configuration
    Config {
        /// Print an example config file instead
        #[arg(long)]
        example: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for command output.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli
        .config
        .unwrap_or_else(prdigest_config::AppConfig::default_path);

    match cli.command {
        Commands::Run { output, days } => commands::run::run(&config_path, output, days).await?,
        Commands::Discover { days } => commands::discover::run(&config_path, days).await?,
        Commands::Tools => commands::tools::run(&config_path).await?,
        Commands::Config { example } => commands::config_cmd::run(&config_path, example)?,
    }

    Ok(())
}
