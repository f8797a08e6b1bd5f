use crate::cache::ttl;
use crate::error::{RelayError, Result};
use crate::resilience::{BreakerConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream supplier API
    pub upstream: UpstreamConfig,
    /// Circuit breaker settings
    #[serde(default)]
    pub breaker: BreakerConfig,
    /// Retry policy
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Result cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Upstream supplier API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the supplier catalog API
    pub base_url: String,
    /// Resource path for the product catalog
    #[serde(default = "default_products_path")]
    pub products_path: String,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_upstream_timeout_ms")]
    pub timeout_ms: u64,
    /// User-Agent header sent upstream
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Result cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis connection URL; in-memory cache is used when absent
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Maximum number of entries for the in-memory cache
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// TTL for cached supplier snapshots in seconds
    #[serde(default = "default_external_api_ttl_secs")]
    pub external_api_ttl_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_products_path() -> String {
    "/products".to_string()
}

fn default_upstream_timeout_ms() -> u64 {
    5000
}

fn default_user_agent() -> String {
    "catalog-relay/0.1".to_string()
}

fn default_max_capacity() -> u64 {
    1000
}

fn default_external_api_ttl_secs() -> u64 {
    ttl::EXTERNAL_API
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            max_capacity: default_max_capacity(),
            external_api_ttl_secs: default_external_api_ttl_secs(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RelayError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| RelayError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.upstream.base_url)
            .map_err(|e| RelayError::Config(format!("Invalid upstream base URL: {}", e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(RelayError::Config(format!(
                "Upstream base URL must use http or https, got: {}",
                parsed.scheme()
            )));
        }

        if self.upstream.timeout_ms == 0 {
            return Err(RelayError::Config(
                "Upstream timeout must be > 0".to_string(),
            ));
        }

        if self.breaker.failure_threshold == 0 {
            return Err(RelayError::Config(
                "Breaker failure threshold must be >= 1".to_string(),
            ));
        }

        if self.retry.initial_delay_ms == 0 {
            return Err(RelayError::Config(
                "Retry initial delay must be > 0".to_string(),
            ));
        }
        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            return Err(RelayError::Config(
                "Retry max delay must be >= initial delay".to_string(),
            ));
        }
        if self.retry.backoff_factor <= 1.0 {
            return Err(RelayError::Config(
                "Retry backoff factor must be > 1".to_string(),
            ));
        }

        if self.cache.external_api_ttl_secs == 0 {
            return Err(RelayError::Config(
                "Cache TTL must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> RelayConfig {
        RelayConfig {
            server: ServerConfig::default(),
            upstream: UpstreamConfig {
                base_url: "https://fakestoreapi.com".to_string(),
                products_path: default_products_path(),
                timeout_ms: default_upstream_timeout_ms(),
                user_agent: default_user_agent(),
            },
            breaker: BreakerConfig::default(),
            retry: RetryPolicy::default(),
            cache: CacheConfig::default(),
        }
    }

    #[test]
    fn test_parse_valid_config() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 9090

upstream:
  base_url: "https://fakestoreapi.com"
  timeout_ms: 3000

breaker:
  failure_threshold: 5

retry:
  max_retries: 2

cache:
  redis_url: "redis://127.0.0.1:6379"
  external_api_ttl_secs: 120
"#;

        let config = RelayConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.upstream.timeout_ms, 3000);
        assert_eq!(config.upstream.products_path, "/products");
        assert_eq!(config.breaker.failure_threshold, 5);
        assert_eq!(config.breaker.reset_timeout_ms, 30_000);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.initial_delay_ms, 1000);
        assert_eq!(config.cache.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
        assert_eq!(config.cache.external_api_ttl_secs, 120);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_applied() {
        let yaml = r#"
upstream:
  base_url: "https://fakestoreapi.com"
"#;

        let config = RelayConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.upstream.timeout_ms, 5000);
        assert_eq!(config.breaker.failure_threshold, 3);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.max_delay_ms, 10_000);
        assert_eq!(config.retry.backoff_factor, 2.0);
        assert!(config.cache.redis_url.is_none());
        assert_eq!(config.cache.external_api_ttl_secs, 600);
    }

    #[test]
    fn test_validate_rejects_bad_scheme() {
        let mut config = base_config();
        config.upstream.base_url = "ftp://supplier.example".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unparseable_url() {
        let mut config = base_config();
        config.upstream.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let mut config = base_config();
        config.breaker.failure_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_delays() {
        let mut config = base_config();
        config.retry.initial_delay_ms = 5000;
        config.retry.max_delay_ms = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_flat_backoff() {
        let mut config = base_config();
        config.retry.backoff_factor = 1.0;
        assert!(config.validate().is_err());
    }
}
