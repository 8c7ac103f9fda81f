//! Interop mediator.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌───────────────────────────────────────────────────────────┐
//!                     │                        MEDIATOR                            │
//!   Client Request    │  ┌─────────┐  ┌──────────┐  ┌─────────┐  ┌────────────┐   │
//!   ──────────────────┼─▶│  http   │─▶│   auth   │─▶│ routing │─▶│  recorder  │   │
//!                     │  │ server  │  │gatekeeper│  │ match / │  │   begin    │   │
//!                     │  └─────────┘  └──────────┘  │ gate /  │  └─────┬──────┘   │
//!                     │                             │ select  │        │          │
//!                     │                             └─────────┘        ▼          │
//!                     │                                        ┌──────────────┐   │     primary
//!   Client Response   │                                        │  forwarding  │───┼──▶  route
//!   ◀─────────────────┼────────────────────────────────────────│  multiplexer │───┼──▶  secondary
//!                     │                                        └──────────────┘   │     routes
//!                     │  ┌─────────────────────────────────────────────────────┐  │
//!                     │  │ config (+ hot reload) │ repository │ observability   │  │
//!                     │  │ lifecycle            │ admin API  │ net (TLS)       │  │
//!                     │  └─────────────────────────────────────────────────────┘  │
//!                     └───────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use interop_mediator::admin::{setup_admin_router, AdminState};
use interop_mediator::config::load_config;
use interop_mediator::config::watcher::ConfigWatcher;
use interop_mediator::http::HttpServer;
use interop_mediator::lifecycle::shutdown::wait_for_signal;
use interop_mediator::lifecycle::Shutdown;
use interop_mediator::net::load_tls_config;
use interop_mediator::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "interop-mediator", version, about = "Health-interoperability message mediator")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "mediator.toml")]
    config: PathBuf,

    /// Disable reloading channels and clients when the file changes.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(&args.config)?;
    logging::init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "interop-mediator starting");
    tracing::info!(
        path = ?args.config,
        bind_address = %config.listener.bind_address,
        channels = config.channels.len(),
        clients = config.clients.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher must outlive the server.
    let (watcher, config_updates) = ConfigWatcher::new(&args.config);
    let _watcher = if args.no_watch {
        None
    } else {
        match watcher.run() {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::warn!(error = %e, "Config watcher unavailable; hot reload disabled");
                None
            }
        }
    };

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config.clone())?;

    if config.admin.enabled {
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %admin_listener.local_addr()?, "Admin API listening");
        let router = setup_admin_router(AdminState::new(server.repository(), &config.admin.api_key));
        let mut admin_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let result = axum::serve(admin_listener, router)
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin API stopped");
            }
        });
    }

    let server_shutdown = shutdown.subscribe();
    let server_task = match &config.listener.tls {
        Some(tls) => {
            let tls_config = load_tls_config(tls).await?;
            let addr: SocketAddr = config.listener.bind_address.parse()?;
            tokio::spawn(server.run_tls(addr, tls_config, config_updates, server_shutdown))
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            tokio::spawn(server.run(listener, config_updates, server_shutdown))
        }
    };

    wait_for_signal().await;
    shutdown.trigger();

    server_task.await??;
    tracing::info!("Shutdown complete");
    Ok(())
}
