use anyhow::{Context, Result};
use moodlensd::{config::Config, engine, routes, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("moodlensd starting");

    let config = Config::from_env();
    tracing::info!(
        bind = %config.bind_addr(),
        origins = ?config.allowed_origins,
        model_dir = %config.model_dir.display(),
        tmdb_api_key = config.tmdb_api_key.is_some(),
        max_body_bytes = config.max_body_bytes,
        "configuration loaded"
    );

    let engine = engine::spawn_engine(&config.detector_model_path(), &config.classifier_model_path())
        .context("failed to start inference engine")?;

    let app = routes::router(
        AppState::new(Arc::new(engine)),
        &config.allowed_origins,
        config.max_body_bytes,
    );

    let listener = TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    tracing::info!(addr = %config.bind_addr(), "moodlensd ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("moodlensd shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}
