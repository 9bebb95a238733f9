#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! vmb-server - vm-backend HTTP server
//!
//! Serves the vm-backend routes behind the three-tier authorization gate.
//! Configuration comes from an optional YAML file plus `VMB__`-prefixed
//! environment variables.

mod config;
mod handlers;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use token_codec::TokenCodec;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{AppConfig, LoggingConfig};

/// vm-backend HTTP server
#[derive(Parser, Debug)]
#[command(name = "vmb-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON (overrides `logging.json`)
    #[arg(long)]
    json: bool,

    /// Validate configuration and the route table, then exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref())?;

    init_tracing(&config.logging, args.json);

    let codec = Arc::new(TokenCodec::new(&config.auth).context("invalid auth configuration")?);
    let app = routes::build_router(codec, &config.gateway).context("invalid route table")?;

    if args.check {
        info!("configuration OK");
        return Ok(());
    }

    let listener = TcpListener::bind(config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
    info!(addr = %config.server.bind_addr, "vmb-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("vmb-server stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig, force_json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(filter);

    if force_json || logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
