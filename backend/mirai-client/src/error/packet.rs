use common::ErrorLocation;

use thiserror::Error as ThisError;

/// Failures to encode or decode a wire frame.
///
/// Decode failures are discarded by the dispatch loop; they never crash it
/// and never affect other pending calls.
#[derive(Debug, ThisError)]
pub enum PacketError {
    #[error("Decode Error: {message} {location}")]
    Decode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Missing syncId: frame has no recognizable correlation id {location}")]
    MissingSyncId { location: ErrorLocation },
}

impl From<serde_json::Error> for PacketError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        PacketError::Decode {
            message: error.to_string(),
            location: ErrorLocation::capture(),
        }
    }
}
