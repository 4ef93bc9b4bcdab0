//! Client facade.
//!
//! [`MiraiClient`] is the single entry point used by typed operation layers:
//! `call` issues a request and awaits its matched response, `subscribe`
//! registers an event listener. The client is an explicitly constructed
//! object passed by reference to collaborators; there is no process-wide
//! default instance.

use crate::config::ClientOptions;
use crate::connection::{Authentication, Connection, ConnectionState};
use crate::error::{CallError, ConnectError};
use crate::events::SubscriptionId;
use crate::packet::AuthenticationResult;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

/// Multiplexed RPC client over one WebSocket connection.
///
/// Cheap to clone; clones share the same connection.
///
/// # Examples
///
/// ```no_run
/// use mirai_client::{Authentication, MiraiClient};
///
/// #[tokio::main]
/// async fn main() -> Result<(), mirai_client::CoreError> {
///     let client = MiraiClient::new();
///     let auth = client
///         .connect("ws://localhost:8080/all", Authentication::verify_key("abc", 123))
///         .await?;
///     println!("session: {:?}", auth.session_key);
///
///     let groups = client.call("groupList", None).await?;
///     println!("groups: {groups}");
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct MiraiClient {
    connection: Arc<Connection>,
}

impl MiraiClient {
    /// A client with default options (5000 ms wait time, events tagged
    /// `"-1"`).
    pub fn new() -> Self {
        Self::with_options(ClientOptions::default())
    }

    pub fn with_options(options: ClientOptions) -> Self {
        Self {
            connection: Arc::new(Connection::new(options)),
        }
    }

    /// Connect and authenticate.
    ///
    /// Resolves with the authentication result (including the issued session
    /// key) once the server acknowledges with code 0; the connection is then
    /// `Open` and calls may be issued.
    ///
    /// # Errors
    ///
    /// - [`ConnectError::AlreadyConnecting`] / [`ConnectError::AlreadyConnected`]
    ///   when invoked out of order
    /// - [`ConnectError::InvalidAddress`] for an unparseable address
    /// - [`ConnectError::Socket`] when the socket fails before the handshake
    ///   completes
    /// - [`ConnectError::HandshakeTimeout`] when no acknowledgement arrives
    ///   within the configured wait time
    /// - [`ConnectError::HandshakeRejected`] when the server reports a
    ///   nonzero status code
    pub async fn connect(
        &self,
        address: &str,
        authentication: Authentication,
    ) -> Result<AuthenticationResult, ConnectError> {
        self.connection.connect(address, &authentication).await
    }

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// [`ConnectError::NotConnected`] if no socket instance exists.
    pub async fn disconnect(&self) -> Result<(), ConnectError> {
        self.connection.disconnect().await
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Whether calls may be issued right now.
    pub fn is_available(&self) -> bool {
        self.connection.state() == ConnectionState::Open
    }

    /// Issue a command and await its result.
    ///
    /// Shorthand for [`MiraiClient::call_command`] with no sub-command and
    /// the connection-wide timeout.
    pub async fn call(&self, command: &str, content: Option<Value>) -> Result<Value, CallError> {
        self.call_command(command, None, content, None).await
    }

    /// Issue a command with an optional sub-command (`"get"`/`"update"`
    /// variants of the same command) and an optional per-call timeout
    /// overriding the connection-wide default.
    ///
    /// A response payload carrying a nonzero status code fails the call with
    /// [`CallError::Remote`]; on success the status fields are stripped and
    /// the operation result alone is returned.
    pub async fn call_command(
        &self,
        command: &str,
        sub_command: Option<&str>,
        content: Option<Value>,
        call_timeout: Option<Duration>,
    ) -> Result<Value, CallError> {
        let data = self
            .connection
            .send_request(command, sub_command, content, call_timeout)
            .await?;
        unwrap_response(data)
    }

    /// Register an event listener; returns the handle used to unsubscribe.
    ///
    /// Listeners receive every unsolicited event frame pushed by the peer,
    /// in registration order. Authentication clears the listener set (a
    /// fresh session), so subscribe after `connect` resolves.
    pub fn subscribe(
        &self,
        listener: impl Fn(&Value) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.connection.events.subscribe(listener)
    }

    /// Remove a listener. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.connection.events.unsubscribe(id)
    }

    /// Publish a locally synthesized event to all subscribers, exactly as if
    /// the peer had pushed it.
    pub fn emit_event(&self, event: &Value) {
        self.connection.events.publish(event);
    }

    /// Number of calls currently awaiting their response.
    pub fn outstanding_calls(&self) -> usize {
        self.connection.pending.outstanding()
    }
}

impl Default for MiraiClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a response payload to the call outcome.
///
/// A nonzero `code` fails the call with the mapped message. On success the
/// `code`/`msg` envelope is stripped: a nested `data` field becomes the
/// result, otherwise the remaining fields are returned as-is. Payloads
/// without a status envelope pass through untouched.
pub(crate) fn unwrap_response(data: Value) -> Result<Value, CallError> {
    let Some(object) = data.as_object() else {
        return Ok(data);
    };
    let Some(code) = object.get("code").and_then(Value::as_i64) else {
        return Ok(data);
    };
    if code != 0 {
        return Err(CallError::remote(code));
    }
    let mut object = object.clone();
    object.remove("code");
    object.remove("msg");
    match object.remove("data") {
        Some(inner) => Ok(inner),
        None => Ok(Value::Object(object)),
    }
}
