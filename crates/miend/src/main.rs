use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod http;
mod page;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("miend starting");

    let config = Config::from_env();
    let scrfd = config.scrfd_model_path();
    let arcface = config.arcface_model_path();
    let engine = engine::spawn_engine(&scrfd, &arcface, config.label_font.as_deref())?;

    let state = Arc::new(AppState::new(config, engine));
    let addr = state.config.bind_addr.clone();
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "miend ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    tracing::info!("miend shutting down");
    Ok(())
}
