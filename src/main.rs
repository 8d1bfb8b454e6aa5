//! Radio Calico metadata proxy
//!
//! Serves the player's static files plus `/metadata`, `/config` and `/status`.

use radio_calico::{api, cache::MetadataCache, config, fetcher::IcyFetcher, service};

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "radio_calico=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Starting Radio Calico v{} ({})",
        env!("CALICO_VERSION"),
        env!("CALICO_GIT_SHA")
    );

    // Load configuration
    let config = config::load_config()?;
    tracing::info!(
        "Configuration loaded, port: {}, cache TTL: {:?}, fetch timeout: {:?}",
        config.port,
        config.cache_ttl(),
        config.fetch_timeout()
    );

    let stream_url = Arc::new(config.stream_url_source());
    let fetcher = Arc::new(IcyFetcher::new(&config.user_agent)?);
    let cache = MetadataCache::new(config.cache_ttl());
    let metadata =
        service::MetadataService::new(stream_url.clone(), fetcher, cache, config.fetch_timeout());

    let state = api::AppState::new(metadata, stream_url);
    let public_dir = config.public_dir.is_dir().then(|| config.public_dir.clone());
    match &public_dir {
        Some(dir) => tracing::info!("Serving static files from {}", dir.display()),
        None => tracing::warn!(
            "Static directory {} not found, serving API only",
            config.public_dir.display()
        ),
    }
    let app = api::router(state, public_dir);

    // Start server with graceful shutdown
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Radio player running at http://localhost:{}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
