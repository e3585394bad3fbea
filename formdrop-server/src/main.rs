// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  formdrop: form submission sink
//
//  HTTP:    axum on a multi-thread tokio runtime
//  Storage: one JSON array file, rewritten on every submission
//  Config:  optional YAML + FORMDROP_ env overrides + CLI flags
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use anyhow::Context;
use clap::Parser;
use formdrop_api::{AppState, build_router};
use formdrop_core::config::FormdropConfig;
use formdrop_observability::{SubmissionMetrics, init_tracing};
use formdrop_store::{AppendOptions, JsonArrayStore, RecordAppender};
use http::Method;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "formdrop", version, about = "Append form submissions to a shared JSON file")]
struct Cli {
    /// Path to configuration file (ignored when absent)
    #[arg(short, long, default_value = "formdrop.yaml")]
    config: PathBuf,

    /// Listen address, overrides `server.addr`
    #[arg(long)]
    addr: Option<String>,

    /// Store file, overrides `store.file` (default: next to this executable)
    #[arg(long)]
    store_file: Option<PathBuf>,

    /// Log level, used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Config ──
    let config_present = cli.config.exists();
    let mut config = FormdropConfig::load(config_present.then_some(cli.config.as_path()))
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(addr) = cli.addr {
        config.server.addr = addr;
    }
    if let Some(file) = cli.store_file {
        config.store.file = Some(file);
    }

    // ── Tracing ──
    init_tracing(&cli.log_level, config.observability.log_format)?;

    info!(version = env!("CARGO_PKG_VERSION"), "formdrop starting");
    if config_present {
        info!(path = %cli.config.display(), "Loaded config file");
    } else {
        info!("No config file found, using defaults");
    }

    // ── Store ──
    let store_path = config.store.resolved_file();
    let appender = RecordAppender::new(
        JsonArrayStore::new(&store_path),
        AppendOptions {
            accepted_method: Method::POST,
            serialize_appends: config.store.serialize_appends,
        },
    );
    info!(
        path = %store_path.display(),
        serialize_appends = config.store.serialize_appends,
        "Store configured"
    );
    if !config.store.serialize_appends {
        warn!("Concurrent submissions may overwrite each other; set store.serialize_appends to prevent lost records");
    }

    // ── Metrics ──
    let prometheus = &config.observability.prometheus;
    let metrics = SubmissionMetrics::new(prometheus.enabled)?;

    // ── API state ──
    let state = Arc::new(
        AppState::new(appender, metrics, config.server.path.clone())
            .with_metrics_path(prometheus.path.clone()),
    );

    let addr: SocketAddr = config
        .server
        .addr
        .parse()
        .with_context(|| format!("invalid server.addr {:?}", config.server.addr))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("formdrop")
        .build()?;

    runtime.block_on(formdrop_api::serve(
        addr,
        build_router(state),
        shutdown_signal(),
    ))?;

    info!("formdrop stopped");
    Ok(())
}

/// Resolve on SIGINT (Ctrl+C) or SIGTERM (docker stop).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping...");
}
