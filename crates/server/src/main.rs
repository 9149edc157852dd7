// crates/server/src/main.rs
//! ytgrab server binary.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use ytgrab_core::JobStore;
use ytgrab_server::{create_app_full, init_metrics, AppState, Config, DownloadRunner, LogFormat};

const DEFAULT_LOG_FILTER: &str = "warn,ytgrab_server=info,ytgrab_core=info,tower_http=info";

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
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
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(config.log_format);
    init_metrics();

    let runner_config = config.runner_config();
    runner_config
        .output_dir
        .ensure()
        .await
        .with_context(|| format!("creating output dir {}", config.output_dir.display()))?;

    let store = Arc::new(JobStore::new());
    let runner = Arc::new(DownloadRunner::new(store.clone(), runner_config));
    let state = AppState::new(store, runner.clone());

    if !state.tool().probe(ytgrab_server::tool::PROBE_TIMEOUT).await {
        tracing::warn!(program = %config.tool_program, "downloader not available; jobs will fail until it is installed");
    }

    let app = create_app_full(state, config.static_dir.as_deref());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, output_dir = %config.output_dir.display(), "ytgrab listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    runner.shutdown(config.shutdown_grace()).await;
    Ok(())
}
