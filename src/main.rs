use catalog_relay::{config::RelayConfig, init_relay, init_tracing};
use std::env;
use std::process;

#[tokio::main]
async fn main() {
    // Initialize tracing
    init_tracing();

    // Get config file path from command line or use default
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "config/relay.yaml".to_string());

    // Load configuration
    let config = match RelayConfig::from_file(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration from {}: {}", config_path, e);
            eprintln!("Usage: catalog-relay [config_file]");
            process::exit(1);
        }
    };

    // Start the relay
    if let Err(e) = init_relay(config).await {
        eprintln!("Relay error: {}", e);
        process::exit(1);
    }
}
