//! # lookout
//!
//! Lookout server binary. Loads settings, starts the HTTP/WebSocket server
//! and the AIS feed ingester, and shuts both down on Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use lookout_ais::{PositionStore, StreamIngester};
use lookout_server::{JwtClaimsResolver, LookoutServer};
use lookout_settings::{LookoutSettings, load_settings, load_settings_from_path};

/// Lookout real-time notification and vessel tracking server.
#[derive(Parser, Debug)]
#[command(name = "lookout", about = "Lookout notification hub and AIS tracker")]
struct Cli {
    /// Settings file (defaults to `~/.lookout/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 to auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Log filter when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit JSON log lines instead of compact text.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn load_settings(&self) -> Result<LookoutSettings> {
        let mut settings = match &self.config {
            Some(path) => load_settings_from_path(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => load_settings().context("Failed to load settings")?,
        };
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    if args.json_logs {
        lookout_core::logging::init_json_subscriber(&args.log_level);
    } else {
        lookout_core::logging::init_subscriber(&args.log_level);
    }

    let settings = args.load_settings()?;
    let metrics = lookout_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;

    if settings.auth.jwt_secret.is_empty() {
        tracing::warn!("no JWT secret configured, every client connection will be rejected");
    }
    let resolver = Arc::new(JwtClaimsResolver::from_settings(&settings.auth));

    let store = Arc::new(PositionStore::new());
    let ingester = StreamIngester::new(settings.ais.clone(), store.clone());
    let server = LookoutServer::new(settings.server.clone(), resolver, store, metrics)
        .with_feed_state(ingester.subscribe_state());

    let token = server.shutdown().token();
    let ingest_handle = tokio::spawn(async move {
        let state = ingester.run(token).await;
        tracing::info!(state = state.name(), "AIS ingester finished");
    });

    let (addr, serve_handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("Lookout listening on http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    let timeout = Duration::from_secs(settings.server.shutdown_timeout_secs);
    server
        .shutdown()
        .graceful_shutdown(vec![serve_handle, ingest_handle], timeout)
        .await;

    tracing::info!("Shutdown complete");
    Ok(())
}
