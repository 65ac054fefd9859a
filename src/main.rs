//! Trellis CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Module resolution and cross-file linking for machine definitions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Workspace root path (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Load documents and report every diagnostic
    Check {
        /// Entry document; omit to check every document under the root
        entry: Option<String>,
    },
    /// Print the dependency-safe processing order for an entry document
    Order {
        /// Entry document
        entry: String,
    },
    /// Flatten an entry machine and its imports into one merged output
    Merge {
        /// Entry document
        entry: String,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "trellis={}",
            log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Trellis v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Workspace root: {}", cli.root.display());

    match cli.command {
        Commands::Check { entry } => commands::check(cli.root, entry).await,
        Commands::Order { entry } => commands::order(cli.root, entry).await,
        Commands::Merge { entry } => commands::merge(cli.root, entry).await,
        Commands::Version => {
            println!("Trellis v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
