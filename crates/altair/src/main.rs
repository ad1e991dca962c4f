//! Altair - cluster workload scheduler
//!
//! Each pipeline stage (filter, score, bind) and the webhook collaborator
//! surface can run as its own process, or everything can share one process
//! with `run`.

use altair_apiserver::{AppState, Config as ServerConfig, PipelineServer, WebhookConfig};
use altair_registry::{monitor_connection, RegistryClient, RegistryConfig};
use altair_scheduler::{BindService, DispatchConfig, FilterService, ScoreService};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "altair", about = "Altair cluster workload scheduler")]
struct Cli {
    /// Registry gateway endpoints
    #[arg(long, global = true, default_value = "http://127.0.0.1:2379")]
    registry_endpoint: Vec<String>,

    /// Capacity of each stage's work queue
    #[arg(long, global = true, default_value_t = 64)]
    queue_capacity: usize,

    /// Worker tasks per stage
    #[arg(long, global = true, default_value_t = 4)]
    workers: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the node filter stage
    Filter {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
        /// Scorer intake URL to push candidate sets to
        #[arg(long, default_value = "http://127.0.0.1:8081/scheduler/score")]
        score_url: String,
    },
    /// Run the node scorer stage
    Score {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8081")]
        bind: String,
        /// Binder intake URL to push ranked sets to
        #[arg(long, default_value = "http://127.0.0.1:8082/scheduler/bind")]
        bind_url: String,
    },
    /// Run the pod binder stage
    Bind {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8082")]
        bind: String,
        /// Port of the execution agent on each node
        #[arg(long, default_value_t = 10250)]
        agent_port: u16,
    },
    /// Run the webhook collaborator surface
    Webhook {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8443")]
        bind: String,
        /// Reconciler URL for admission notifications
        #[arg(long)]
        reconciler_url: Option<String>,
    },
    /// Run every stage and the webhook in one process
    Run {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
        /// Port of the execution agent on each node
        #[arg(long, default_value_t = 10250)]
        agent_port: u16,
        /// Reconciler URL for admission notifications
        #[arg(long)]
        reconciler_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let registry = create_registry(&cli)?;
    let dispatch = DispatchConfig {
        capacity: cli.queue_capacity,
        workers: cli.workers,
    };

    match &cli.command {
        Commands::Filter { bind, score_url } => {
            info!("Starting altair filter stage");
            let state = AppState::new(registry.clone()).with_filter(
                FilterService::new(registry.clone(), score_url.clone()).into_queue(dispatch),
            );
            serve(registry, Arc::new(state), bind).await
        }
        Commands::Score { bind, bind_url } => {
            info!("Starting altair score stage");
            let state = AppState::new(registry.clone())
                .with_score(ScoreService::new(bind_url.clone()).into_queue(dispatch));
            serve(registry, Arc::new(state), bind).await
        }
        Commands::Bind { bind, agent_port } => {
            info!("Starting altair bind stage");
            let state = AppState::new(registry.clone())
                .with_bind(BindService::new(registry.clone(), *agent_port).into_queue(dispatch));
            serve(registry, Arc::new(state), bind).await
        }
        Commands::Webhook {
            bind,
            reconciler_url,
        } => {
            info!("Starting altair webhook surface");
            let state = AppState::new(registry.clone()).with_webhook(WebhookConfig {
                reconciler_url: reconciler_url.clone(),
            });
            serve(registry, Arc::new(state), bind).await
        }
        Commands::Run {
            bind,
            agent_port,
            reconciler_url,
        } => {
            info!("Starting altair with every stage in one process");

            let listen_addr: SocketAddr = parse_addr(bind)?;
            let local = format!("http://127.0.0.1:{}", listen_addr.port());

            let state = AppState::new(registry.clone())
                .with_filter(
                    FilterService::new(registry.clone(), format!("{}/scheduler/score", local))
                        .into_queue(dispatch.clone()),
                )
                .with_score(
                    ScoreService::new(format!("{}/scheduler/bind", local))
                        .into_queue(dispatch.clone()),
                )
                .with_bind(
                    BindService::new(registry.clone(), *agent_port).into_queue(dispatch),
                )
                .with_webhook(WebhookConfig {
                    reconciler_url: reconciler_url.clone(),
                });

            serve(registry, Arc::new(state), bind).await
        }
    }
}

/// Build the shared registry client from CLI flags
fn create_registry(cli: &Cli) -> miette::Result<Arc<RegistryClient>> {
    let config = RegistryConfig {
        endpoints: cli.registry_endpoint.clone(),
        ..Default::default()
    };

    let client = RegistryClient::new(config)
        .map_err(|e| miette::miette!("Failed to create registry client: {}", e))?;

    Ok(Arc::new(client))
}

fn parse_addr(bind: &str) -> miette::Result<SocketAddr> {
    bind.parse()
        .map_err(|e| miette::miette!("Invalid bind address '{}': {}", bind, e))
}

/// Spawn the registry monitor and the HTTP server, then wait for ctrl-c
async fn serve(
    registry: Arc<RegistryClient>,
    state: Arc<AppState>,
    bind: &str,
) -> miette::Result<()> {
    let listen_addr = parse_addr(bind)?;

    let token = CancellationToken::new();

    // Connection monitor runs for the lifetime of the process
    let monitor_handle = tokio::spawn(monitor_connection(registry, token.clone()));

    let server = PipelineServer::new(ServerConfig { listen_addr }, state);
    let server_token = token.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run(server_token).await {
            error!("Server error: {}", e);
        }
    });

    info!("Listening on {}", listen_addr);

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| miette::miette!("Failed to listen for ctrl-c: {}", e))?;

    info!("Shutting down gracefully...");
    token.cancel();

    let shutdown_timeout = std::time::Duration::from_secs(5);
    let _ = tokio::time::timeout(shutdown_timeout, async {
        let _ = tokio::join!(monitor_handle, server_handle);
    })
    .await;

    info!("Shutdown complete");

    Ok(())
}
