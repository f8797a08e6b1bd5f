use crate::cache::ResultCache;
use crate::resilience::{BreakerSnapshot, CircuitBreaker, RetryExecutor};
use crate::upstream::{SupplierClient, SupplierProduct};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Logical cache key for the supplier catalog snapshot.
pub const SUPPLIER_PRODUCTS_KEY: &str = "external:supplier-products";

/// Where the returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataSource {
    #[serde(rename = "external-api")]
    Upstream,
    #[serde(rename = "cache-fallback")]
    CacheFallback,
    #[serde(rename = "error")]
    Error,
}

/// Outcome of one resilient fetch, always paired with the breaker snapshot
/// taken at return time.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Fresh data from the upstream.
    Success {
        data: Vec<SupplierProduct>,
        breaker: BreakerSnapshot,
    },
    /// The upstream was unavailable; last-known-good data served from cache.
    /// A degraded success, not an error.
    CachedFallback {
        data: Vec<SupplierProduct>,
        warning: String,
        breaker: BreakerSnapshot,
    },
    /// Both the upstream and the cache came up empty.
    Failure {
        error: String,
        breaker: BreakerSnapshot,
    },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, FetchOutcome::Failure { .. })
    }

    pub fn source(&self) -> DataSource {
        match self {
            FetchOutcome::Success { .. } => DataSource::Upstream,
            FetchOutcome::CachedFallback { .. } => DataSource::CacheFallback,
            FetchOutcome::Failure { .. } => DataSource::Error,
        }
    }

    pub fn breaker(&self) -> &BreakerSnapshot {
        match self {
            FetchOutcome::Success { breaker, .. } => breaker,
            FetchOutcome::CachedFallback { breaker, .. } => breaker,
            FetchOutcome::Failure { breaker, .. } => breaker,
        }
    }
}

/// Orchestrates the resilient call path for the supplier catalog:
/// breaker around retrier around the upstream call, cache write on success,
/// cache read as the fallback on any failure.
pub struct ResilientFetcher {
    client: SupplierClient,
    breaker: CircuitBreaker,
    retrier: RetryExecutor,
    cache: Arc<dyn ResultCache>,
    cache_ttl_secs: u64,
}

impl ResilientFetcher {
    /// Create a new fetcher. The breaker and retry policy are constructed
    /// once per upstream integration and live for the process lifetime.
    pub fn new(
        client: SupplierClient,
        breaker: CircuitBreaker,
        retrier: RetryExecutor,
        cache: Arc<dyn ResultCache>,
        cache_ttl_secs: u64,
    ) -> Self {
        Self {
            client,
            breaker,
            retrier,
            cache,
            cache_ttl_secs,
        }
    }

    /// Fetch the supplier catalog through the full resilience stack.
    pub async fn fetch_supplier_products(&self) -> FetchOutcome {
        let result = self
            .breaker
            .execute(|| self.retrier.execute(|| self.client.fetch_products()))
            .await;

        match result {
            Ok(data) => {
                self.store_snapshot(&data).await;
                FetchOutcome::Success {
                    data,
                    breaker: self.breaker.snapshot().await,
                }
            }
            Err(err) => {
                error!(error = %err, "Supplier fetch failed, attempting cache fallback");
                let breaker = self.breaker.snapshot().await;

                if let Some(cached) = self.cache.get(SUPPLIER_PRODUCTS_KEY).await {
                    match serde_json::from_str::<Vec<SupplierProduct>>(&cached) {
                        Ok(data) => {
                            info!("Returning cached supplier data as fallback");
                            return FetchOutcome::CachedFallback {
                                data,
                                warning: "Supplier API unavailable, serving cached data"
                                    .to_string(),
                                breaker,
                            };
                        }
                        Err(e) => {
                            warn!(error = %e, "Cached supplier payload is unreadable, discarding");
                            self.cache.delete(SUPPLIER_PRODUCTS_KEY).await;
                        }
                    }
                }

                FetchOutcome::Failure {
                    error: err.to_string(),
                    breaker,
                }
            }
        }
    }

    /// Breaker snapshot for the status endpoint, without triggering a fetch.
    pub async fn circuit_status(&self) -> BreakerSnapshot {
        self.breaker.snapshot().await
    }

    async fn store_snapshot(&self, data: &[SupplierProduct]) {
        match serde_json::to_string(data) {
            Ok(json) => {
                // Best-effort: a failed write only costs the next fallback.
                self.cache
                    .set(SUPPLIER_PRODUCTS_KEY, &json, self.cache_ttl_secs)
                    .await;
                debug!(
                    products = data.len(),
                    ttl_secs = self.cache_ttl_secs,
                    "Stored supplier snapshot in cache"
                );
            }
            Err(e) => {
                warn!(error = %e, "Failed to serialize supplier snapshot for caching");
            }
        }
    }
}
