//! Wire envelope codec.
//!
//! The protocol is JSON text frames over a WebSocket, tagged by a `syncId`
//! correlation token. Outbound frames are requests; inbound frames fall into
//! exactly one of three classes, decided once at decode time so the
//! dispatcher never branches on sentinel strings:
//!
//! - `syncId == ""`: authentication acknowledgement
//! - `syncId == <reserved id>` ("-1" by default): unsolicited event
//! - anything else: response to a previously issued call

use crate::error::PacketError;

use common::ErrorLocation;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Opaque correlation token binding a request to its eventual response.
pub type SyncId = String;

/// Outbound request envelope.
///
/// `subCommand` is always present on the wire (null when absent); `content`
/// is omitted for no-argument operations.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WsRequest<'a> {
    pub sync_id: &'a str,
    pub command: &'a str,
    pub sub_command: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<&'a Value>,
}

impl WsRequest<'_> {
    pub fn encode(&self) -> Result<String, PacketError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Payload of the authentication acknowledgement frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResult {
    pub code: i64,
    #[serde(default)]
    pub session_key: Option<String>,
}

/// One inbound frame, classified by its correlation id.
#[derive(Debug, Clone)]
pub enum InboundFrame {
    /// Authentication acknowledgement (`syncId == ""`).
    Handshake(Value),
    /// Unsolicited event pushed by the peer (`syncId == <reserved id>`).
    Event(Value),
    /// Response correlated to an outstanding call.
    Response { sync_id: SyncId, data: Value },
}

impl InboundFrame {
    /// Decode and classify one text frame.
    ///
    /// Tolerances, matching observed server behavior:
    /// - a numeric `syncId` is accepted and stringified;
    /// - a frame with no `data` field but top-level `code` and `msg` (the
    ///   shape some server versions use to report authentication failure) is
    ///   normalized into a `Response` whose data is `{"code", "msg"}`.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::Decode`] for invalid JSON or a frame with
    /// neither `data` nor a code/message pair, and
    /// [`PacketError::MissingSyncId`] when no correlation id is present.
    pub fn decode(text: &str, reserved_sync_id: &str) -> Result<InboundFrame, PacketError> {
        let frame: Value = serde_json::from_str(text)?;

        let sync_id = match frame.get("syncId") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(PacketError::MissingSyncId {
                    location: ErrorLocation::capture(),
                });
            }
        };

        let data = match frame.get("data") {
            Some(data) => data.clone(),
            None => match (frame.get("code"), frame.get("msg")) {
                (Some(code), Some(msg)) => json!({ "code": code, "msg": msg }),
                _ => {
                    return Err(PacketError::Decode {
                        message: format!("frame {sync_id} has no data field"),
                        location: ErrorLocation::capture(),
                    });
                }
            },
        };

        if sync_id == crate::HANDSHAKE_SYNC_ID {
            Ok(InboundFrame::Handshake(data))
        } else if sync_id == reserved_sync_id {
            Ok(InboundFrame::Event(data))
        } else {
            Ok(InboundFrame::Response { sync_id, data })
        }
    }
}

/// Whether a payload is a bare status-code/message pair with no result
/// fields.
///
/// While the handshake is still pending, a response frame with this shape is
/// an authentication rejection reported on an unexpected correlation id.
pub fn is_error_shaped(data: &Value) -> bool {
    let Some(object) = data.as_object() else {
        return false;
    };
    object.get("code").is_some_and(Value::is_number)
        && object.get("msg").is_some()
        && !object.contains_key("data")
        && !object.contains_key("sessionKey")
}
