//! # hpp-api - Binary Entry Point
//!
//! Starts the Axum HTTP server for the prediction service.
//!
//! Configuration comes from the YAML file named by `HPP_CONFIG` (default
//! `configs/config.yaml`; built-in defaults when absent), then `PORT`,
//! `DATABASE_URL` and `HPP_METRICS_ENABLED` override it.

use std::path::PathBuf;

use anyhow::Context;
use hpp_core::{LogFormat, LoggingConfig, PipelineConfig};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "configs/config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var_os("HPP_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let mut config = if config_path.exists() {
        PipelineConfig::load(&config_path)
            .with_context(|| format!("loading configuration from {}", config_path.display()))?
    } else {
        PipelineConfig::default()
    };
    config.apply_env_overrides();

    init_tracing(&config.logging);
    if !config_path.exists() {
        tracing::warn!(path = %config_path.display(), "configuration file not found, using defaults");
    }

    // The log is best-effort: run without it rather than refuse to serve.
    let db_pool = match hpp_api::db::init_pool(&config.monitoring).await {
        Ok(pool) => Some(pool),
        Err(e) => {
            tracing::error!(error = %e, "request log database unavailable; monitoring endpoints will return 503");
            None
        }
    };

    let addr = format!("{}:{}", config.api.host, config.api.port);
    let state = hpp_api::AppState::from_config(config, db_pool).context("building metrics recorder")?;
    state.load_initial_model().await;

    let app = hpp_api::app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "housing price API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

/// Initialize structured tracing. `RUST_LOG` wins over `logging.level`.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
