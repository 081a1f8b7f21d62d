use anyhow::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use axum::Router;
use common::config::GatewayConfig;
use gateway::{routes, state::AppState};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting session gateway");

    let config = GatewayConfig::from_env()?;
    info!(
        "Upstream backend at {}, frontend origin {}",
        config.backend_url, config.frontend_url
    );

    let bind_addr = config.bind_addr.clone();
    let pages = Router::new().fallback_service(
        ServeDir::new(&config.pages_dir).append_index_html_on_directories(true),
    );

    let app_state = AppState::new(config)?;

    // Start the web server
    let app = routes::create_router(app_state, pages);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Session gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Session gateway stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
