//! Push Router (v1)
//!
//! Serves the push hub and the demo application routes.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ axum + tower-http layers ──▶ routing::Router ──▶ handler
//!                     (CORS, request id,            (ordered scan,      │
//!                      trace, limits)                OPTIONS = 200)     │
//!                                                                       ▼
//!     Event stream                                                 push::PushHub
//!     ◀────────────── open text/event-stream ◀── stream sinks ◀──── emit(channel)
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use push_router::config::{load_config, ServerConfig};
use push_router::lifecycle::{trigger_on_signal, Shutdown};
use push_router::observability::{init_logging, init_metrics};
use push_router::{App, HttpServer};

#[derive(Parser)]
#[command(name = "push-router", version, about = "HTTP router with channel-based server push")]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability)?;

    tracing::info!("push-router v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.limits.request_timeout_secs,
        stream_buffer = config.push.stream_buffer,
        reap_dead_clients = config.push.reap_dead_clients,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(err) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %err,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(trigger_on_signal(shutdown.clone()));

    let App { router, hub } = App::build(&config);
    let server = HttpServer::new(config, router, hub);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
