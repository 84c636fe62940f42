use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use weft_core::PluginHostConfig;

mod commands;

#[derive(Parser)]
#[command(name = "weft", about = "Resolve and run capability-wired plugins")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Host config file (default: ~/.config/weft/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage plugins
    Plugin(commands::plugin::PluginArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = cli
        .config
        .unwrap_or_else(|| weft_paths::config_dir().join("config.toml"));
    let config = PluginHostConfig::load(&config_path)?;

    match cli.command {
        Commands::Plugin(args) => commands::plugin::run(args, &config).await,
    }
}
