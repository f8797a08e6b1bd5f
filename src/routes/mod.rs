use crate::fetcher::{DataSource, FetchOutcome, ResilientFetcher};
use crate::resilience::BreakerSnapshot;
use crate::upstream::SupplierProduct;
use axum::{
    extract::State,
    http::{header::HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Header carrying the breaker state alongside fetch results.
pub const CIRCUIT_STATE_HEADER: &str = "x-circuit-breaker-state";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<ResilientFetcher>,
}

/// Build the relay's router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/external/supplier-products", get(supplier_products))
        .route("/external/status", get(circuit_status))
        .route("/health", get(health))
        .with_state(state)
}

/// Breaker snapshot in the wire format of the status endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerStatus {
    pub state: crate::resilience::CircuitState,
    pub failure_count: u32,
    pub failure_threshold: u32,
    pub next_attempt: Option<String>,
}

impl From<&BreakerSnapshot> for BreakerStatus {
    fn from(snapshot: &BreakerSnapshot) -> Self {
        Self {
            state: snapshot.state,
            failure_count: snapshot.failure_count,
            failure_threshold: snapshot.failure_threshold,
            next_attempt: snapshot.next_attempt_utc().map(|at| at.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchResponse {
    success: bool,
    source: DataSource,
    data: Vec<SupplierProduct>,
    circuit_breaker_state: BreakerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// GET /external/supplier-products
///
/// Success and cache fallback both map to 200 (stale catalog data is more
/// useful than none); only a true failure maps to 503.
async fn supplier_products(State(state): State<AppState>) -> Response {
    let outcome = state.fetcher.fetch_supplier_products().await;

    let status = if outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let source = outcome.source();
    let breaker_state = outcome.breaker().state;

    let body = match outcome {
        FetchOutcome::Success { data, breaker } => FetchResponse {
            success: true,
            source,
            data,
            circuit_breaker_state: BreakerStatus::from(&breaker),
            warning: None,
            error: None,
            message: None,
        },
        FetchOutcome::CachedFallback {
            data,
            warning,
            breaker,
        } => FetchResponse {
            success: true,
            source,
            data,
            circuit_breaker_state: BreakerStatus::from(&breaker),
            warning: Some(warning),
            error: None,
            message: None,
        },
        FetchOutcome::Failure { error, breaker } => FetchResponse {
            success: false,
            source,
            data: Vec::new(),
            circuit_breaker_state: BreakerStatus::from(&breaker),
            warning: None,
            error: Some(error),
            message: Some("Supplier API unavailable and no cached data available".to_string()),
        },
    };

    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        HeaderName::from_static(CIRCUIT_STATE_HEADER),
        HeaderValue::from_static(breaker_state.as_str()),
    );
    response
}

/// GET /external/status
async fn circuit_status(State(state): State<AppState>) -> Response {
    let snapshot = state.fetcher.circuit_status().await;

    Json(serde_json::json!({
        "success": true,
        "data": BreakerStatus::from(&snapshot),
    }))
    .into_response()
}

/// GET /health
async fn health() -> Response {
    Json(serde_json::json!({ "status": "ok" })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::CircuitState;
    use tokio::time::Instant;

    #[test]
    fn test_breaker_status_view_closed() {
        let snapshot = BreakerSnapshot {
            state: CircuitState::Closed,
            failure_count: 0,
            failure_threshold: 3,
            next_attempt: None,
        };
        let view = BreakerStatus::from(&snapshot);
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["state"], "CLOSED");
        assert_eq!(json["failureCount"], 0);
        assert_eq!(json["failureThreshold"], 3);
        assert!(json["nextAttempt"].is_null());
    }

    #[test]
    fn test_breaker_status_view_open_has_next_attempt() {
        let snapshot = BreakerSnapshot {
            state: CircuitState::Open,
            failure_count: 3,
            failure_threshold: 3,
            next_attempt: Some(Instant::now() + std::time::Duration::from_secs(30)),
        };
        let view = BreakerStatus::from(&snapshot);
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["state"], "OPEN");
        assert!(json["nextAttempt"].is_string());
    }
}
