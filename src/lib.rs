pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod resilience;
pub mod routes;
pub mod upstream;

use crate::cache::{MemoryCache, RedisCache, ResultCache};
use crate::config::RelayConfig;
use crate::error::Result;
use crate::fetcher::ResilientFetcher;
use crate::resilience::{CircuitBreaker, RetryExecutor};
use crate::routes::AppState;
use crate::upstream::SupplierClient;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Initialize the relay server
pub async fn init_relay(config: RelayConfig) -> Result<()> {
    // Validate configuration
    config.validate()?;

    info!("Starting catalog relay");
    info!(
        "Server listening on {}:{}",
        config.server.host, config.server.port
    );

    // Pick the result cache backend: Redis when configured and reachable,
    // in-memory otherwise.
    let cache: Arc<dyn ResultCache> = match &config.cache.redis_url {
        Some(redis_url) => match RedisCache::connect(redis_url).await {
            Ok(redis_cache) => Arc::new(redis_cache),
            Err(e) => {
                warn!(error = %e, "Redis unavailable, falling back to in-memory result cache");
                Arc::new(MemoryCache::new(config.cache.max_capacity))
            }
        },
        None => Arc::new(MemoryCache::new(config.cache.max_capacity)),
    };

    // The breaker and retry policy are constructed once and live for the
    // process lifetime; the fetcher owns the whole resilient call path.
    let client = SupplierClient::new(&config.upstream)?;
    let breaker = CircuitBreaker::new(config.breaker.clone());
    let retrier = RetryExecutor::new(config.retry.clone());
    let fetcher = Arc::new(ResilientFetcher::new(
        client,
        breaker,
        retrier,
        cache,
        config.cache.external_api_ttl_secs,
    ));

    let app = routes::router(AppState { fetcher }).layer(TraceLayer::new_for_http());

    // Bind and serve
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(crate::error::RelayError::Io)?;

    info!("Relay ready to accept connections");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::RelayError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}

/// Initialize tracing/logging
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_relay=debug,tower_http=debug".into()),
        )
        .with_target(false)
        .compact()
        .init();
}
