use common::ErrorLocation;

use mirai_client::{CallError, ConnectError, CoreError};

use thiserror::Error;

/// Errors that can occur in the event monitor.
///
/// Configuration problems are separated from transport failures so the exit
/// message tells the operator whether to fix the environment or the server.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Error local to this app (filesystem, logger, signal handling)
    #[error("Monitor Error: {message} {location}")]
    Monitor {
        message: String,
        location: ErrorLocation,
    },

    /// Missing or malformed environment configuration
    #[error("Configuration Error: {message} {location}")]
    Configuration {
        message: String,
        location: ErrorLocation,
    },

    /// Error from the transport core
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<ConnectError> for MonitorError {
    fn from(error: ConnectError) -> Self {
        MonitorError::Core(error.into())
    }
}

impl From<CallError> for MonitorError {
    fn from(error: CallError) -> Self {
        MonitorError::Core(error.into())
    }
}
