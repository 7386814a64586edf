use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vemu_orchestrator::{
    ConfigOverrides, Orchestrator, OrchestratorConfig, SimulationRequest, create_app,
};

#[derive(Parser)]
#[command(name = "vemu-orchestrator")]
#[command(about = "Drives the DSL → scheduling → simulation pipeline for VEMU workloads")]
struct Cli {
    /// Path to the JSON config file (defaults to VEMU_CONFIG, then ./orchestrator.json)
    #[arg(long, global = true, env = "VEMU_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ServiceArgs {
    /// DSL parsing service endpoint
    #[arg(long, env = "VEMU_DSL_URL")]
    dsl_url: Option<String>,
    /// Task scheduling service endpoint
    #[arg(long, env = "VEMU_SCHEDULING_URL")]
    scheduling_url: Option<String>,
    /// Simulation service JSON-RPC endpoint
    #[arg(long, env = "VEMU_SIMULATION_URL")]
    simulation_url: Option<String>,
    /// Per-stage timeout in seconds
    #[arg(long, env = "VEMU_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the orchestrator HTTP server
    Serve {
        /// Bind address, e.g. 0.0.0.0:8080
        #[arg(short, long, env = "VEMU_BIND")]
        bind: Option<String>,
        #[command(flatten)]
        services: ServiceArgs,
    },
    /// Run one orchestration in-process and print the response
    Run {
        app_package_id: String,
        #[command(flatten)]
        services: ServiceArgs,
    },
    /// Print the effective configuration
    ShowConfig {
        #[command(flatten)]
        services: ServiceArgs,
    },
}

impl ServiceArgs {
    fn into_overrides(self, bind: Option<String>) -> ConfigOverrides {
        ConfigOverrides {
            bind,
            timeout_secs: self.timeout_secs,
            dsl_url: self.dsl_url,
            scheduling_url: self.scheduling_url,
            simulation_url: self.simulation_url,
        }
    }
}

fn load_config(path: Option<&PathBuf>, overrides: ConfigOverrides) -> Result<OrchestratorConfig> {
    let mut config = OrchestratorConfig::load(path.map(PathBuf::as_path))?;
    config.apply_overrides(overrides);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

const DEFAULT_LOG_FILTER: &str = "vemu_orchestrator=info,tower_http=info";

/// `RUST_LOG` wins when it parses; otherwise fall back to info for our crates.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, services } => {
            let config = load_config(cli.config.as_ref(), services.into_overrides(bind))?;
            info!(
                "Collaborators: dsl={} scheduling={} simulation={} (timeout {}s)",
                config.dsl_url, config.scheduling_url, config.simulation_url, config.timeout_secs
            );

            let app = create_app(&config)?;
            let listener = tokio::net::TcpListener::bind(&config.bind)
                .await
                .with_context(|| format!("Failed to bind {}", config.bind))?;

            info!("VEMU orchestrator listening on http://{}", config.bind);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Commands::Run {
            app_package_id,
            services,
        } => {
            let config = load_config(cli.config.as_ref(), services.into_overrides(None))?;
            let orchestrator = Orchestrator::from_config(&config)?;

            let response = orchestrator
                .run_simulation(SimulationRequest::new(app_package_id))
                .await?;

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::ShowConfig { services } => {
            let config = load_config(cli.config.as_ref(), services.into_overrides(None))?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
