//! Client options.

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_max_wait_time_ms() -> u64 {
    crate::DEFAULT_MAX_WAIT_TIME_MS
}

fn default_reserved_sync_id() -> String {
    crate::DEFAULT_RESERVED_SYNC_ID.to_string()
}

/// Per-client configuration.
///
/// `max_wait_time_ms` bounds the authentication handshake and, unless a call
/// overrides it, every individual call. `reserved_sync_id` is the
/// correlation id the server tags unsolicited event frames with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientOptions {
    #[serde(default = "default_max_wait_time_ms")]
    pub max_wait_time_ms: u64,
    #[serde(default = "default_reserved_sync_id")]
    pub reserved_sync_id: String,
}

impl ClientOptions {
    pub fn max_wait_time(&self) -> Duration {
        Duration::from_millis(self.max_wait_time_ms)
    }

    pub fn with_max_wait_time(mut self, wait: Duration) -> Self {
        self.max_wait_time_ms = wait.as_millis() as u64;
        self
    }

    pub fn with_reserved_sync_id(mut self, sync_id: impl Into<String>) -> Self {
        self.reserved_sync_id = sync_id.into();
        self
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            max_wait_time_ms: default_max_wait_time_ms(),
            reserved_sync_id: default_reserved_sync_id(),
        }
    }
}
