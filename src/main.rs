//! Mesh test fixture.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │                 MESH FIXTURE                  │
//!                    │                                               │
//!     flags / env ───┼─▶ cli ──▶ config ──▶ identity                 │
//!                    │                          │                    │
//!                    │              ┌───────────┼────────────┐       │
//!                    │              ▼           ▼            ▼       │
//!                    │         ┌────────┐  ┌────────┐  ┌──────────┐  │
//!                    │         │  pki   │  │  http  │  │ registry │──┼──▶ registry agent
//!                    │         │ issuer │─▶│ server │  │  client  │  │
//!                    │         └────────┘  └────────┘  └──────────┘  │
//!     clients ───────┼────────────────────────▲                      │
//!                    │                                               │
//!                    │   lifecycle: signals ─▶ shutdown ─▶ drain     │
//!                    │              ─▶ deregister                    │
//!                    └──────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;

use clap::Parser;

use mesh_fixture::cli::Cli;
use mesh_fixture::lifecycle::{startup, Shutdown};
use mesh_fixture::observability::{logging, metrics};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("mesh-fixture: {e}");
            return ExitCode::from(2);
        }
    };

    logging::init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "mesh-fixture starting");
    tracing::info!(
        service = %config.service.name,
        bind_address = %config.listener.bind_address(),
        container_name = %config.service.container_name,
        registry_enabled = config.registry.enabled,
        registry = %config.registry.base_url(),
        tls = config.tls.enabled,
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

    let shutdown = Shutdown::new();
    shutdown.listen_for_signals();

    match startup::run(config, shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::from(e.exit_code())
        }
    }
}
