//! tda - task dependency agent.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tda_agent::{
    extract_tasks, validate_tasks, AgentConfig, AgentServer, TaskDependencyAgent,
    DEFAULT_AGENT_ID, HEALTH_INTENT, RESOLVE_INTENT,
};
use tda_ai::{OpenRouterClient, OpenRouterConfig};
use tda_storage::{JsonTaskStore, RetryingStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tda")]
#[command(about = "Task dependency agent - resolves execution order for task graphs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Name requests must be addressed to
    #[arg(long, global = true, default_value = DEFAULT_AGENT_ID)]
    agent_id: String,

    /// Result cache file (memory only when omitted)
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    /// JSON task store file for the database_update trigger
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Inference model (overrides OPENROUTER_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve requests on stdin/stdout
    Stdio,

    /// Serve requests on a Unix socket
    Socket {
        /// Socket path
        path: PathBuf,
    },

    /// Resolve a task list once and print the result
    Resolve {
        /// JSON file with a task list or a request input (stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Print agent info
    Info,
}

fn init_logging() {
    // stdout carries responses, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn build_agent(cli: &Cli) -> Result<TaskDependencyAgent> {
    let mut config = AgentConfig::new().with_agent_id(&cli.agent_id);
    if let Some(path) = &cli.cache {
        config = config.with_cache_path(path);
    }
    let mut agent = TaskDependencyAgent::new(config);

    if let Some(path) = &cli.store {
        let store = JsonTaskStore::new(path)
            .await
            .with_context(|| format!("Failed to open task store at {}", path.display()))?;
        info!("Task store: {}", path.display());
        agent = agent.with_store(Arc::new(RetryingStore::new(store)));
    }

    match OpenRouterConfig::from_env() {
        Ok(mut config) => {
            if let Some(model) = &cli.model {
                config = config.with_model(model);
            }
            let client = OpenRouterClient::new(config)?;
            info!("Inference model: {}", client.model());
            agent = agent.with_inference(Arc::new(client));
        }
        Err(e) => warn!("Inference client unavailable: {}", e),
    }

    Ok(agent)
}

fn read_input(file: Option<&PathBuf>) -> Result<Value> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    serde_json::from_str(&raw).context("Input is not valid JSON")
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Stdio => {
            let agent = build_agent(&cli).await?;
            AgentServer::new(Arc::new(agent)).serve_stdio().await?;
        }

        Commands::Socket { path } => {
            let agent = build_agent(&cli).await?;
            AgentServer::new(Arc::new(agent)).serve_socket(path).await?;
        }

        Commands::Resolve { file } => {
            let agent = build_agent(&cli).await?;
            let input = match read_input(file.as_ref())? {
                Value::Array(tasks) => json!({ "tasks": tasks }),
                other => other,
            };
            let tasks = validate_tasks(&extract_tasks(&input)?)?;
            let outcome = agent.resolve(tasks).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }

        Commands::Info => {
            println!("Task Dependency Agent v{}", env!("CARGO_PKG_VERSION"));
            println!("Agent id: {}", cli.agent_id);
            println!("Intent: {}", RESOLVE_INTENT);
            println!("Health check: {} (any agent name)", HEALTH_INTENT);
            println!("Transport: stdio / Unix socket (one JSON envelope per line)");
            match &cli.cache {
                Some(path) => println!("Cache: {}", path.display()),
                None => println!("Cache: memory only"),
            }
        }
    }

    Ok(())
}
