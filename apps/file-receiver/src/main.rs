//! File Receiver Server

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use file_receiver::{server, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "file_receiver=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting File Receiver v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Image directory: {}", config.storage.image_dir.display());
    tracing::info!("Video directory: {}", config.storage.video_dir.display());

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("File Receiver listening on {}", listener.local_addr()?);

    let state = AppState::new(config);
    server::serve(listener, state, server::shutdown_signal()).await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}
