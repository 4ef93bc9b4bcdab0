use common::{ApiStatusCode, ErrorLocation};

use thiserror::Error as ThisError;

/// Failures of a single call.
///
/// `NotConnected`, `Send`, `Timeout`, and `ConnectionClosed` are transport
/// faults local to the one call that raised them. `Remote` is a normal,
/// expected outcome: the peer handled the request and reported a nonzero
/// status.
#[derive(Debug, ThisError)]
pub enum CallError {
    #[error("Not Connected: the connection is not open {location}")]
    NotConnected { location: ErrorLocation },

    #[error("Encode Error: {message} {location}")]
    Encode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Call Timeout: no response for packet {sync_id} within {waited_ms} ms")]
    Timeout { sync_id: String, waited_ms: u64 },

    #[error("Remote Error: {message} (code {code})")]
    Remote { code: ApiStatusCode, message: String },

    #[error("Connection Closed: the socket closed before the response arrived {location}")]
    ConnectionClosed { location: ErrorLocation },
}

impl CallError {
    pub(crate) fn remote(code: i64) -> Self {
        let code = ApiStatusCode::from(code);
        CallError::Remote {
            code,
            message: code.message().to_string(),
        }
    }
}
