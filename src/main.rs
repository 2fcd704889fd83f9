use std::sync::Arc;

use anyhow::Context;
use axum::http::{header::AUTHORIZATION, header::CONTENT_TYPE, Method};
use tower_http::cors::{Any, CorsLayer};

use axum_hwshare::allocation::AllocationEngine;
use axum_hwshare::config::Config;
use axum_hwshare::router;
use axum_hwshare::services::{AuthService, RedisStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize basic tracing subscriber
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize Redis-backed store
    let redis_client = Arc::new(
        redis::Client::open(config.redis.url.clone()).context("failed to open redis client")?,
    );
    let store: Arc<dyn Store> = Arc::new(RedisStore::new(redis_client));

    let engine = AllocationEngine::new(store.clone());
    let auth = AuthService::new(store, &config.auth);

    // The SPA is served from a different origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    let app = router((engine, auth, config.clone())).layer(cors);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;

    tracing::info!("server listening on {}", address);
    axum::serve(listener, app.into_make_service())
        .await
        .context("server error")?;

    Ok(())
}
