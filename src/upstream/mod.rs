use crate::config::UpstreamConfig;
use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// One product as served by the supplier catalog API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierProduct {
    pub id: u64,
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image: String,
}

/// HTTP client for the supplier catalog upstream.
///
/// A single network call with a fixed timeout; failures carry the upstream
/// status code when one was received, which is what the retry layer's
/// terminal/retryable classification keys on.
pub struct SupplierClient {
    client: reqwest::Client,
    base_url: String,
    products_path: String,
}

impl SupplierClient {
    /// Create a new supplier client
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| RelayError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            products_path: config.products_path.clone(),
        })
    }

    /// Fetch the product catalog from the supplier.
    pub async fn fetch_products(&self) -> Result<Vec<SupplierProduct>> {
        let url = format!("{}{}", self.base_url, self.products_path);
        debug!(url = %url, "Fetching data from supplier API");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::UpstreamStatus {
                status: status.as_u16(),
            });
        }

        response
            .json::<Vec<SupplierProduct>>()
            .await
            .map_err(|e| RelayError::Serialization(format!("Invalid supplier payload: {}", e)))
    }
}

fn map_transport_error(e: reqwest::Error) -> RelayError {
    if e.is_timeout() {
        RelayError::Timeout(format!("Supplier request timed out: {}", e))
    } else if e.is_connect() {
        RelayError::Connect(format!("Failed to connect to supplier: {}", e))
    } else {
        RelayError::Upstream(format!("Supplier request failed: {}", e))
    }
}
