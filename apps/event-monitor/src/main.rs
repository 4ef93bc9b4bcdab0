//! Console event monitor.
//!
//! Connects to a mirai-api-http websocket adapter, authenticates, and logs
//! every event the server pushes until interrupted.

mod config;
mod error;
mod logger;

use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::logger::initialize as logger_initialize;

use common::ErrorLocation;

use mirai_client::MiraiClient;

use std::fs::create_dir_all;

use log::info;
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<(), MonitorError> {
    // Optional .env; missing files are fine, the environment still applies.
    dotenvy::dotenv().ok();

    let config = MonitorConfig::from_env()?;

    create_dir_all(&config.log_dir).map_err(|e| MonitorError::Monitor {
        message: format!("Failed to create log directory: {e}"),
        location: ErrorLocation::capture(),
    })?;
    logger_initialize(&config.log_dir)?;

    info!("Event monitor starting");
    info!("Connecting to {}", config.address);

    let client = MiraiClient::new();
    let auth = client.connect(&config.address, config.authentication).await?;
    info!(
        "Authenticated (code {}, session key {})",
        auth.code,
        if auth.session_key.is_some() { "issued" } else { "absent" },
    );

    // Subscribe after connect; authentication starts a fresh listener set.
    client.subscribe(|event: &Value| {
        let kind = event
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!("[{kind}] {event}");
    });

    info!("Listening for events, press Ctrl-C to exit");
    tokio::signal::ctrl_c().await.map_err(|e| MonitorError::Monitor {
        message: format!("Failed to listen for Ctrl-C: {e}"),
        location: ErrorLocation::capture(),
    })?;

    info!("Shutting down");
    client.disconnect().await?;
    Ok(())
}
