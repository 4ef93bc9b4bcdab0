//! Environment-driven configuration.
//!
//! Read once at startup, after `.env` (if present) has been loaded:
//!
//! - `MIRAI_ADDRESS` - connection address (default `ws://localhost:8080/all`)
//! - `MIRAI_SESSION_KEY` - resume an existing session, or
//! - `MIRAI_VERIFY_KEY` + `MIRAI_QQ` - initial pairing credentials
//! - `MIRAI_LOG_DIR` - log directory (default `logs`)

use crate::error::MonitorError;

use common::ErrorLocation;

use mirai_client::Authentication;

use std::env;
use std::path::PathBuf;

const DEFAULT_ADDRESS: &str = "ws://localhost:8080/all";
const DEFAULT_LOG_DIR: &str = "logs";

pub struct MonitorConfig {
    pub address: String,
    pub authentication: Authentication,
    pub log_dir: PathBuf,
}

impl MonitorConfig {
    /// Assemble the configuration from the environment.
    ///
    /// A session key takes precedence over pairing credentials when both are
    /// set; pairing requires both the verify key and the account id.
    pub fn from_env() -> Result<Self, MonitorError> {
        let address = env::var("MIRAI_ADDRESS").unwrap_or_else(|_| DEFAULT_ADDRESS.to_string());
        let log_dir = env::var("MIRAI_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_DIR));

        let authentication = if let Ok(session_key) = env::var("MIRAI_SESSION_KEY") {
            Authentication::session_key(session_key)
        } else {
            let verify_key = env::var("MIRAI_VERIFY_KEY").map_err(|_| {
                MonitorError::Configuration {
                    message: "Set MIRAI_SESSION_KEY, or MIRAI_VERIFY_KEY and MIRAI_QQ".to_string(),
                    location: ErrorLocation::capture(),
                }
            })?;
            let qq = env::var("MIRAI_QQ")
                .map_err(|_| MonitorError::Configuration {
                    message: "MIRAI_QQ is required with MIRAI_VERIFY_KEY".to_string(),
                    location: ErrorLocation::capture(),
                })?
                .parse::<i64>()
                .map_err(|e| MonitorError::Configuration {
                    message: format!("MIRAI_QQ must be a numeric account id: {e}"),
                    location: ErrorLocation::capture(),
                })?;
            Authentication::verify_key(verify_key, qq)
        };

        Ok(Self {
            address,
            authentication,
            log_dir,
        })
    }
}
