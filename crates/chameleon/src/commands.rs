//! Chameleon command implementations

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use chameleon_agent::{AgentLoop, AuditStore, ClusterClient, ConsoleNotifier, KubectlClient, RunOutcome};
use chameleon_config::{self, paths, Config};
use chameleon_knowledge::{
    fallback_context, format_context, ingest, KnowledgeRetriever, LocalStore, VectorStore,
};
use chameleon_provider::{OllamaProvider, Provider};

const EXAMPLE_REQUESTS: &[&str] = &[
    "Why is the web deployment not ready?",
    "Check for pods in CrashLoopBackOff and find the cause",
    "A pod is stuck in ImagePullBackOff, fix it",
    "Which nodes are under memory pressure?",
];

/// Load config from `path` or the default location, then overlay the environment
async fn load_config(path: Option<&Path>) -> Result<Arc<Config>> {
    let config = match path {
        Some(path) => Config::load_from(path).await,
        None => Config::load().await,
    }
    .context("loading config")?;
    Ok(Arc::new(config.apply_env()))
}

async fn open_store(config: &Config) -> Result<LocalStore> {
    let path = config.store_path();
    LocalStore::open(&path)
        .await
        .with_context(|| format!("opening knowledge store at {}", path.display()))
}

/// Wire the production collaborators into one loop
async fn build_agent(config: &Config) -> Result<AgentLoop> {
    let store = open_store(config).await?;
    if store.count().await? == 0 {
        warn!("◆ KNOWLEDGE STORE IS EMPTY, RUN `chameleon ingest` TO LOAD THE CORPUS");
    }

    let provider = OllamaProvider::new(&config.inference.host, &config.inference.model);
    if !provider.is_configured() {
        warn!("◆ INFERENCE HOST OR MODEL IS EMPTY, CHECK OLLAMA_HOST AND OLLAMA_MODEL");
    }
    info!(
        "◆ INFERENCE: {} AT {}",
        provider.default_model(),
        provider.host()
    );

    Ok(AgentLoop::with_config(
        config,
        Arc::new(provider),
        Arc::new(KubectlClient::new()),
        Arc::new(store),
        Arc::new(ConsoleNotifier::new(config.alerts.enabled)),
    ))
}

/// One run, cancelled by Ctrl-C
async fn run_once(agent: &AgentLoop, request: &str, namespace: &str) -> RunOutcome {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("◆ INTERRUPT RECEIVED, CANCELLING RUN");
            trigger.cancel();
        }
    });

    let outcome = agent.run(request, namespace, &cancel).await;
    watcher.abort();
    outcome
}

fn print_outcome(outcome: &RunOutcome) {
    println!("\n◆ {}", outcome.answer);
    println!(
        "\n◆ Run {}: {} after {} iterations",
        outcome.state.run_id(),
        outcome.reason,
        outcome.state.iteration()
    );

    let errors = outcome.state.error_log();
    if !errors.is_empty() {
        println!("◆ Errors ({}):", errors.len());
        for e in errors {
            println!("  - {}", e);
        }
    }
}

/// Write a default config and create the data directories
pub async fn init_command(config_path: Option<&Path>) -> Result<()> {
    println!("◆ Initializing Chameleon...");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let (config, written_to) = match config_path {
        None => (chameleon_config::init().await?, chameleon_config::config_path()),
        Some(path) => {
            if path.exists() {
                warn!("◆ CONFIG ALREADY PRESENT AT {:?}", path);
            } else {
                Config::default().save_to(path).await?;
            }
            let config = Config::load_from(path).await?;
            (config, path.to_path_buf())
        }
    };

    paths::ensure_dir(&config.audit_dir()).await?;
    if let Some(parent) = config.store_path().parent() {
        paths::ensure_dir(&parent.to_path_buf()).await?;
    }

    println!("Config:    {}", written_to.display());
    println!("Knowledge: {}", config.store_path().display());
    println!("Runs:      {}", config.audit_dir().display());
    println!("\n◆ Chameleon initialized");
    println!("\nNext steps:");
    println!("  1. Start Ollama and pull the model: ollama pull {}", config.inference.model);
    println!("  2. Load the knowledge base:        chameleon ingest");
    println!("  3. Ask for help:                   chameleon ask \"Why is my pod pending?\"");

    Ok(())
}

/// Run the agent once and print its answer
pub async fn ask_command(
    config_path: Option<&Path>,
    query: String,
    namespace: Option<String>,
) -> Result<()> {
    let config = load_config(config_path).await?;
    let agent = build_agent(&config).await?;
    let namespace = namespace.unwrap_or_else(|| config.cluster.namespace.clone());

    let outcome = run_once(&agent, &query, &namespace).await;
    print_outcome(&outcome);
    Ok(())
}

/// Interactive session; each line starts a fresh run.
/// Ctrl-C cancels a running request, or ends the session at the prompt.
pub async fn chat_command(config_path: Option<&Path>, namespace: Option<String>) -> Result<()> {
    let config = load_config(config_path).await?;
    let agent = build_agent(&config).await?;
    let namespace = namespace.unwrap_or_else(|| config.cluster.namespace.clone());

    println!("◆ Interactive mode in namespace {} (type 'help' or 'exit')", namespace);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("◆ ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        let input = line.trim();
        match input {
            "" => continue,
            "exit" | "quit" | "q" => break,
            "help" => {
                println!("Describe a problem in the cluster, for example:");
                for example in EXAMPLE_REQUESTS {
                    println!("  - {}", example);
                }
                println!("Ctrl-C cancels a running request; at the prompt it ends the session.");
                continue;
            }
            _ => {}
        }

        let outcome = run_once(&agent, input, &namespace).await;
        print_outcome(&outcome);
        println!();
    }

    Ok(())
}

/// Load the built-in corpus
pub async fn ingest_command(config_path: Option<&Path>, reset: bool) -> Result<()> {
    let config = load_config(config_path).await?;
    let store = open_store(&config).await?;

    let added = ingest(&store, reset).await?;
    let total = store.count().await?;

    println!("◆ Added {} documents ({} total)", added, total);
    if let Some(path) = store.path() {
        println!("◆ Store: {}", path.display());
    }
    Ok(())
}

/// Query the knowledge store the way the agent does
pub async fn search_command(
    config_path: Option<&Path>,
    query: String,
    top_k: Option<usize>,
) -> Result<()> {
    let config = load_config(config_path).await?;
    let store = open_store(&config).await?;
    let retriever = KnowledgeRetriever::new(
        Arc::new(store),
        Duration::from_millis(config.knowledge.query_timeout_ms),
    );

    let retrieval = retriever
        .retrieve(
            &query,
            top_k.unwrap_or(config.knowledge.top_k),
            config.knowledge.min_relevance,
        )
        .await;

    if retrieval.degraded {
        println!("{}", fallback_context());
    } else {
        println!(
            "{}",
            format_context(&retrieval.documents, config.knowledge.max_context_length)
        );
    }
    Ok(())
}

/// Show status
pub async fn status_command(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path).await?;
    let shown_path: PathBuf = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(chameleon_config::config_path);

    println!("◆ Chameleon System Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!(
        "Config:    {} {}",
        shown_path.display(),
        if shown_path.exists() { "[OK]" } else { "[Missing]" }
    );

    let provider = OllamaProvider::new(&config.inference.host, &config.inference.model);
    let inference = if !provider.is_configured() {
        "[Not configured]".to_string()
    } else {
        match provider.ping().await {
            Ok(()) => "[OK]".to_string(),
            Err(e) => format!("[Unreachable: {}]", e),
        }
    };
    println!(
        "Inference: {} ({}) {}",
        provider.host(),
        provider.default_model(),
        inference
    );

    let cluster = match KubectlClient::new()
        .run(
            &format!("{} cluster-info", config.cluster.kubectl_path),
            config.cluster.command_timeout_secs,
        )
        .await
    {
        Ok(output) if output.exit_code == 0 => "[OK]".to_string(),
        Ok(output) => format!("[Exit {}]", output.exit_code),
        Err(e) => format!("[Unavailable: {}]", e),
    };
    println!("Cluster:   {} {}", config.cluster.namespace, cluster);

    match open_store(&config).await {
        Ok(store) => println!(
            "Knowledge: {} ({} documents)",
            config.store_path().display(),
            store.count().await?
        ),
        Err(e) => println!("Knowledge: [Error: {:#}]", e),
    }

    let runs = AuditStore::new(config.audit_dir()).list().await?;
    println!(
        "Runs:      {} ({} recorded{})",
        config.audit_dir().display(),
        runs.len(),
        if config.audit.enabled { "" } else { ", audit disabled" }
    );

    println!(
        "Policy:    destructive {}, dry-run {}",
        if config.cluster.allow_destructive_commands { "allowed" } else { "blocked" },
        if config.cluster.dry_run { "on" } else { "off" }
    );

    Ok(())
}
