//! Shared leaf types for the mirai-client workspace.
//!
//! This crate contains small cross-cutting types with no business logic:
//!
//! - **error_location**: source-location capture for error variants
//! - **api_status**: the remote status-code-to-message table
//! - **redacted_key**: credential wrapper that never leaks into logs
//!
//! ## Architecture
//!
//! - **common** (this crate): leaf types, no dependencies on the rest
//! - **mirai-client**: the WebSocket transport core operating on them
//! - **event-monitor**: application wiring everything together

pub mod api_status;
pub mod error_location;
pub mod redacted_key;

pub use api_status::ApiStatusCode;
pub use error_location::ErrorLocation;
pub use redacted_key::RedactedKey;

#[cfg(test)]
mod tests;
