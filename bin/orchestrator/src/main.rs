mod config;
mod demo_chain;
mod errors;
mod handlers;
mod state;

use std::{path::PathBuf, sync::Arc};

use axum::{
    routing::{get, post},
    Router,
};
use clap::{Parser, Subcommand};
use orchestrator_executor::Executor;
use orchestrator_queue::Queue;
use orchestrator_store::db::Db;
use orchestrator_utils::config::load_config;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::{
    config::OrchestratorConfig,
    demo_chain::{DemoBroadcaster, DemoSigner},
    errors::StartupError,
    state::AppState,
};

const COMPONENT: &str = "orchestrator";
const ORCHESTRATOR_CONFIG_FILE_PATH: &str = "orchestrator.toml";

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the orchestrator service
    Start {
        #[arg(short, long, value_name = "FILE", default_value = ORCHESTRATOR_CONFIG_FILE_PATH)]
        config: PathBuf,
    },
    /// Write a default configuration file
    Init {
        #[arg(short, long, default_value = ORCHESTRATOR_CONFIG_FILE_PATH)]
        config_path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    orchestrator_utils::logging::setup_logging().expect("logging is only initialized once");

    let cli = Cli::parse();

    match &cli.command {
        Command::Start { config } => start(config).await,
        Command::Init { config_path } => {
            let contents = toml::to_string_pretty(&OrchestratorConfig::default())?;
            std::fs::write(config_path, contents)?;
            info!(target: COMPONENT, path = %config_path.display(), "wrote default configuration");
            Ok(())
        },
    }
}

async fn start(config_path: &PathBuf) -> Result<(), StartupError> {
    let config: OrchestratorConfig = load_config(config_path)?;
    info!(target: COMPONENT, %config, "starting orchestrator");
    let endpoint = config.endpoint();

    let db = Arc::new(Db::open(&config.store).await?);
    let queue = Arc::new(Queue::new(db, config.queue));

    let executor = Executor::new(
        queue.clone(),
        Arc::new(DemoSigner),
        Arc::new(DemoBroadcaster::new()),
        config.executor,
    );
    let executor_handle = {
        let executor = executor.clone();
        tokio::spawn(async move {
            if let Err(err) = executor.start().await {
                error!(target: COMPONENT, %err, "executor loop exited with an error");
            }
        })
    };

    let state = AppState { queue };
    let app = Router::new()
        .route("/transfers", post(handlers::enqueue_transfer))
        .route("/items/:id", get(handlers::get_item))
        .route("/items", get(handlers::list_items))
        .route("/items/:id/unstall", post(handlers::unstall_item))
        .route("/unstall", post(handlers::unstall_many))
        .route("/unstall-all", post(handlers::unstall_all))
        .route("/stats", get(handlers::stats))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&endpoint).await?;
    info!(target: COMPONENT, %endpoint, "listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    executor.stop();
    let _ = executor_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
