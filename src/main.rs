//! tierline pipeline server.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                    TIERLINE                      │
//!                         │                                                  │
//!   Signed request        │  ┌─────────┐    ┌──────────┐    ┌────────────┐   │
//!   ──────────────────────┼─▶│  http   │───▶│   auth   │───▶│  pipeline  │   │
//!                         │  │ server  │    │ verifier │    │ controller │   │
//!                         │  └─────────┘    └──────────┘    └─────┬──────┘   │
//!                         │                                       │          │
//!                         │                                       ▼          │
//!                         │                               ┌──────────────┐   │     control
//!   Uniform response      │  ┌──────────┐                 │    tiers     │───┼───▶ workflow
//!   ◀─────────────────────┼──│ response │◀────────────────│   resolver   │   │     store
//!                         │  │ mapping  │                 └──────────────┘   │
//!                         │  └──────────┘                                    │
//!                         │                                                  │
//!                         │  ┌────────────────────────────────────────────┐  │
//!                         │  │           Cross-Cutting Concerns           │  │
//!                         │  │  config · observability · resilience       │  │
//!                         │  │  admin routes · pending report queue       │  │
//!                         │  └────────────────────────────────────────────┘  │
//!                         └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use tierline::cli::{startup_error, EXIT_FAILURE};
use tierline::config::{self, env::load_dotenv};
use tierline::http::{shutdown_on_ctrl_c, PipelineServer};
use tierline::observability::{logging, metrics};
use tierline::pipeline::PipelineController;
use tierline::resilience::CancelToken;

#[derive(Parser)]
#[command(name = "tierline")]
#[command(about = "Fault-tolerant request pipeline server", long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long, env = "TIERLINE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    load_dotenv();
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "tierline stopped with an error");
            eprint!("{}", startup_error(e.as_ref()));
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_config(args.config.as_deref())?;
    logging::init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tierline starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tiers = config.tiers.len(),
        max_attempts = config.retries.max_attempts,
        scheme = ?config.signing.scheme,
        admin_enabled = config.admin.api_key.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let controller = Arc::new(PipelineController::from_config(&config)?);
    for tier in controller.tiers() {
        tracing::info!(
            tier = %tier.name,
            configured = tier.is_configured(),
            timeout_ms = tier.timeout.as_millis() as u64,
            "Tier registered"
        );
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = PipelineServer::new(config, controller)?;

    let shutdown = CancelToken::new();
    tokio::spawn(shutdown_on_ctrl_c(shutdown.clone()));
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
