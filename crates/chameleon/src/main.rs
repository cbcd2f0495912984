//! Chameleon - autonomous SRE agent for Kubernetes

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{
    ask_command, chat_command, ingest_command, init_command, search_command, status_command,
};

/// Chameleon - diagnose and fix cluster issues from your terminal
#[derive(Parser)]
#[command(name = "chameleon")]
#[command(about = "◆ An autonomous SRE agent for Kubernetes clusters")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Config file (defaults to ~/.chameleon/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config and data directories
    Init,
    /// Run the agent once on a request
    Ask {
        /// What to investigate or fix
        query: String,
        /// Namespace to work in
        #[arg(short, long)]
        namespace: Option<String>,
    },
    /// Interactive session, one run per line
    Chat {
        /// Namespace to work in
        #[arg(short, long)]
        namespace: Option<String>,
    },
    /// Load the built-in troubleshooting corpus into the knowledge store
    Ingest {
        /// Clear the store first
        #[arg(long)]
        reset: bool,
    },
    /// Search the knowledge store
    Search {
        query: String,
        /// Number of documents
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Show inference, cluster and knowledge store status
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .with_writer(std::io::stderr)
            .init();
    }

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Init => init_command(config).await,
        Commands::Ask { query, namespace } => ask_command(config, query, namespace).await,
        Commands::Chat { namespace } => chat_command(config, namespace).await,
        Commands::Ingest { reset } => ingest_command(config, reset).await,
        Commands::Search { query, top_k } => search_command(config, query, top_k).await,
        Commands::Status => status_command(config).await,
    };

    if let Err(e) = result {
        error!("◆ {:#}", e);
        std::process::exit(1);
    }
}
