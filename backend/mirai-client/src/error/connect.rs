use common::{ApiStatusCode, ErrorLocation};

use thiserror::Error as ThisError;

/// Failures of the connection/authentication lifecycle.
///
/// All variants are terminal for the connect attempt that raised them; the
/// core never retries. `HandshakeRejected` carries the remote status code so
/// collaborators can branch on it.
#[derive(Debug, ThisError)]
pub enum ConnectError {
    #[error("Invalid Address: {message} {location}")]
    InvalidAddress {
        message: String,
        location: ErrorLocation,
    },

    #[error("Already Connecting: a handshake is still pending {location}")]
    AlreadyConnecting { location: ErrorLocation },

    #[error("Already Connected: disconnect before reconnecting {location}")]
    AlreadyConnected { location: ErrorLocation },

    #[error("Not Connected: no socket instance {location}")]
    NotConnected { location: ErrorLocation },

    #[error("Socket Error: {message} {location}")]
    Socket {
        message: String,
        location: ErrorLocation,
    },

    #[error("Handshake Timeout: no acknowledgement within {waited_ms} ms {location}")]
    HandshakeTimeout {
        waited_ms: u64,
        location: ErrorLocation,
    },

    #[error("Handshake Rejected: {message} (code {code})")]
    HandshakeRejected { code: ApiStatusCode, message: String },
}

impl ConnectError {
    #[track_caller]
    pub(crate) fn socket(message: impl Into<String>) -> Self {
        ConnectError::Socket {
            message: message.into(),
            location: ErrorLocation::capture(),
        }
    }

    pub(crate) fn rejected(code: i64) -> Self {
        let code = ApiStatusCode::from(code);
        ConnectError::HandshakeRejected {
            code,
            message: code.message().to_string(),
        }
    }
}
