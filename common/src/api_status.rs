//! Remote status codes and their fixed human-readable messages.
//!
//! Every response payload from the remote peer may carry a numeric `code`.
//! Zero is success; everything else is a specific failure category. The
//! mapping is protocol data, not transport logic, which is why it lives here
//! rather than in the client core.

/// Status code reported by the remote peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiStatusCode(pub i64);

impl ApiStatusCode {
    pub const SUCCESS: ApiStatusCode = ApiStatusCode(0);

    pub fn is_success(&self) -> bool {
        self.0 == 0
    }

    /// Codes that indicate the session itself is unusable, as opposed to a
    /// single operation failing.
    pub fn is_session_error(&self) -> bool {
        matches!(self.0, 1 | 2 | 3 | 4)
    }

    /// Fixed message for this code.
    pub fn message(&self) -> &'static str {
        match self.0 {
            0 => "Success",
            1 => "Incorrect verify key",
            2 => "The specified bot does not exist",
            3 => "The session is invalid or does not exist",
            4 => "The session has not been authenticated or activated",
            5 => "The target does not exist",
            6 => "The target file does not exist",
            10 => "No permission to perform this operation",
            20 => "The bot is muted",
            30 => "The message is too long",
            400 => "Invalid request",
            500 => "Internal server error",
            _ => "Unknown status code",
        }
    }
}

impl From<i64> for ApiStatusCode {
    fn from(code: i64) -> Self {
        ApiStatusCode(code)
    }
}

impl std::fmt::Display for ApiStatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
