//! docx-fill HTTP server.
//!
//! Uploads go through placeholder extraction and are kept in an in-memory
//! session store; fill requests rewrite the stored template with answers.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use docx_fill_server::config::Config;
use docx_fill_server::extractor::{ChatCompletionsExtractor, SharedExtractor};
use docx_fill_server::handlers::AppState;
use docx_fill_server::router;
use docx_fill_server::session::{MemorySessionStore, SharedSessionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    info!("Starting docx-fill-server v{}", env!("CARGO_PKG_VERSION"));
    info!("  Host: {}", config.host);
    info!("  Port: {}", config.port);
    info!("  Extractor: {} ({})", config.extractor_url, config.extractor_model);
    info!("  Extractor timeout: {}s", config.extractor_timeout_secs);
    info!(
        "  Session TTL: {}s (max {} uploads)",
        config.session_ttl_secs, config.session_max_entries
    );

    if config.extractor_api_token.is_none() {
        warn!("  EXTRACTOR_API_TOKEN not set, extraction requests are unauthenticated");
    }

    let extractor: SharedExtractor = Arc::new(ChatCompletionsExtractor::new(
        config.extractor_url.clone(),
        config.extractor_api_token.clone(),
        config.extractor_model.clone(),
        Duration::from_secs(config.extractor_timeout_secs),
    )?);

    let sessions: SharedSessionStore = Arc::new(MemorySessionStore::new(
        Duration::from_secs(config.session_ttl_secs),
        config.session_max_entries,
    ));

    let app = router(
        AppState {
            sessions,
            extractor,
        },
        config.max_upload_bytes,
    );

    // Bind and serve
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, initiating shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM, initiating shutdown");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
}
