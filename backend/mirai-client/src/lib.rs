//! Client-side WebSocket transport for the mirai-api-http websocket adapter.
//!
//! One duplex WebSocket connection is multiplexed into a request/response
//! RPC channel plus a side-channel event stream. The crate owns the
//! connection/authentication lifecycle, request-response correlation (many
//! concurrent outstanding calls over one socket), timeout-based cancellation,
//! and event fan-out. Command semantics, typed operation surfaces, and domain
//! payload schemas are collaborators built on top of [`MiraiClient::call`]
//! and [`MiraiClient::subscribe`].

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod packet;
pub mod pending;

#[cfg(test)]
mod tests;

pub use client::MiraiClient;
pub use config::ClientOptions;
pub use connection::{Authentication, ConnectionState};
pub use error::{CallError, ConnectError, CoreError, PacketError};
pub use events::SubscriptionId;
pub use packet::{AuthenticationResult, InboundFrame, SyncId, WsRequest};

/// Connection-wide default wait time for the handshake and for each call,
/// in milliseconds.
pub const DEFAULT_MAX_WAIT_TIME_MS: u64 = 5000;

/// Default `syncId` the server uses to tag unsolicited event frames.
pub const DEFAULT_RESERVED_SYNC_ID: &str = "-1";

/// `syncId` of the authentication acknowledgement frame.
pub const HANDSHAKE_SYNC_ID: &str = "";
