use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use scout_client::{DuckDuckGoSearch, OpenAiChatModel, ReqwestFetcher, TextCleaner};
use scout_core::{DiscoveryService, KeyPool, ScoutConfig};
use scout_server::routes;
use scout_server::state::LiveState;

/// Discovery requests are small JSON profiles.
const MAX_BODY_BYTES: usize = 64 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("scout=info".parse()?))
        .with_target(false)
        .init();

    let config = ScoutConfig::from_env().context("Invalid configuration")?;
    let addr = format!("0.0.0.0:{}", config.port);

    let keys = KeyPool::new(config.api_keys.clone(), config.key_cooldown);

    let fetcher = ReqwestFetcher::new().context("Failed to create HTTP client")?;
    let model = OpenAiChatModel::with_base_url(&config.model, &config.base_url)
        .and_then(|m| m.with_timeout(config.llm_timeout))
        .context("Failed to create LLM client")?;
    let search = DuckDuckGoSearch::new().context("Failed to create search client")?;

    let state: Arc<LiveState> = Arc::new(LiveState {
        service: DiscoveryService::new(fetcher, TextCleaner::new(), model, search),
        keys,
    });

    let app = routes::router(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!(
        model = %config.model,
        keys = config.api_keys.len(),
        "Starting server on {addr}"
    );
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C handler: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
