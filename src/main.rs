use std::env;
use std::sync::Arc;
use anyhow::{Context, Result};
use log::{error, info};
use aqicast::config::load_config;
use aqicast::initialization::init;
use aqicast::logging::setup_logger;
use aqicast::server::router;

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = env::var("AQICAST_CONFIG").ok()
        .or_else(|| env::args().nth(1))
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = load_config(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path))?;
    let _logger = setup_logger(&config.general)?;

    let state = match init(&config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("startup failed: {}", e);
            return Err(e.into());
        }
    };

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await
        .with_context(|| format!("binding {}", addr))?;
    info!("serving AQI forecasts for {} on {}", config.geo_ref.city_name, addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("shut down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", e);
    }
}
