//! Connection lifecycle controller.
//!
//! Owns the socket, drives the authentication handshake, and demultiplexes
//! every inbound frame to exactly one of three destinations: the handshake
//! waiter, the pending-call table, or the event hub.
//!
//! # State machine
//!
//! ```text
//! Disconnected --connect()--> Connecting --auth ack (code 0)--> Open
//!      Connecting --close/error/timeout/nonzero code--> Closed
//!      Open --disconnect() or socket close--> Closed
//!      Closed --connect()--> Connecting   (re-arms the machine)
//! ```
//!
//! All inbound work is driven by a single reader task; `call` suspends its
//! caller on a oneshot channel until the matching response arrives or its
//! deadline elapses.

use crate::config::ClientOptions;
use crate::error::{CallError, ConnectError};
use crate::events::EventHub;
use crate::packet::{AuthenticationResult, InboundFrame, SyncId, WsRequest, is_error_shaped};
use crate::pending::{PendingCalls, SyncIdSource};

use common::{ErrorLocation, RedactedKey};

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type HandshakeWaiter = oneshot::Sender<Result<AuthenticationResult, ConnectError>>;

/// Lifecycle of one connection instance; the sole source of truth for
/// whether a call may be issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closed,
}

/// Credentials appended to the connection address as query parameters.
#[derive(Debug, Clone)]
pub enum Authentication {
    /// Initial pairing: a verify key plus the numeric account id.
    VerifyKey { verify_key: RedactedKey, qq: i64 },
    /// Resuming a previously issued session.
    SessionKey { session_key: RedactedKey },
}

impl Authentication {
    pub fn verify_key(verify_key: impl Into<RedactedKey>, qq: i64) -> Self {
        Authentication::VerifyKey {
            verify_key: verify_key.into(),
            qq,
        }
    }

    pub fn session_key(session_key: impl Into<RedactedKey>) -> Self {
        Authentication::SessionKey {
            session_key: session_key.into(),
        }
    }
}

/// Build the connection URI from the base address and credentials.
pub(crate) fn build_ws_address(
    address: &str,
    authentication: &Authentication,
) -> Result<Url, ConnectError> {
    let mut url = Url::parse(address).map_err(|error| ConnectError::InvalidAddress {
        message: error.to_string(),
        location: ErrorLocation::capture(),
    })?;
    match authentication {
        Authentication::VerifyKey { verify_key, qq } => {
            url.query_pairs_mut()
                .append_pair("verifyKey", verify_key.expose())
                .append_pair("qq", &qq.to_string());
        }
        Authentication::SessionKey { session_key } => {
            url.query_pairs_mut()
                .append_pair("sessionKey", session_key.expose());
        }
    }
    Ok(url)
}

/// One connection instance: socket halves, handshake waiter, pending-call
/// table, and event hub. Owned behind an `Arc` by the client facade; the
/// reader task holds only a `Weak` reference so dropping the client tears
/// the connection down.
pub(crate) struct Connection {
    options: ClientOptions,
    state: Mutex<ConnectionState>,
    pub(crate) pending: PendingCalls,
    pub(crate) events: EventHub,
    handshake: Mutex<Option<HandshakeWaiter>>,
    sink: AsyncMutex<Option<WsSink>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    sync_ids: SyncIdSource,
}

impl Connection {
    pub(crate) fn new(options: ClientOptions) -> Self {
        Self {
            options,
            state: Mutex::new(ConnectionState::Disconnected),
            pending: PendingCalls::new(),
            events: EventHub::new(),
            handshake: Mutex::new(None),
            sink: AsyncMutex::new(None),
            reader: Mutex::new(None),
            sync_ids: SyncIdSource::new(),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.lock().expect("connection state poisoned")
    }

    fn set_state(&self, next: ConnectionState) {
        *self.state.lock().expect("connection state poisoned") = next;
    }

    fn handshake_pending(&self) -> bool {
        self.handshake
            .lock()
            .expect("handshake waiter poisoned")
            .is_some()
    }

    fn take_handshake_waiter(&self) -> Option<HandshakeWaiter> {
        self.handshake
            .lock()
            .expect("handshake waiter poisoned")
            .take()
    }

    /// Open the socket, run the authentication handshake, and transition to
    /// `Open` on success.
    ///
    /// At most one handshake waiter exists per connection instance; a second
    /// `connect` while one is pending is a programming error and is rejected
    /// immediately, as is connecting while already `Open`.
    pub(crate) async fn connect(
        self: &Arc<Self>,
        address: &str,
        authentication: &Authentication,
    ) -> Result<AuthenticationResult, ConnectError> {
        {
            let mut state = self.state.lock().expect("connection state poisoned");
            match *state {
                ConnectionState::Connecting => {
                    return Err(ConnectError::AlreadyConnecting {
                        location: ErrorLocation::capture(),
                    });
                }
                ConnectionState::Open => {
                    return Err(ConnectError::AlreadyConnected {
                        location: ErrorLocation::capture(),
                    });
                }
                ConnectionState::Disconnected | ConnectionState::Closed => {
                    *state = ConnectionState::Connecting;
                }
            }
        }

        let url = build_ws_address(address, authentication)?;
        let (socket, _) = match connect_async(url.as_str()).await {
            Ok(connected) => connected,
            Err(error) => {
                self.set_state(ConnectionState::Closed);
                return Err(ConnectError::socket(error.to_string()));
            }
        };
        info!("Socket connected to {address}, awaiting authentication");

        let (sink, stream) = socket.split();
        *self.sink.lock().await = Some(sink);

        let (waiter, acknowledged) = oneshot::channel();
        *self.handshake.lock().expect("handshake waiter poisoned") = Some(waiter);

        let reader = tokio::spawn(read_loop(Arc::downgrade(self), stream));
        if let Some(stale) = self
            .reader
            .lock()
            .expect("reader handle poisoned")
            .replace(reader)
        {
            // A previous connection's task; it has already exited with its
            // socket, abort is a no-op then.
            stale.abort();
        }

        match timeout(self.options.max_wait_time(), acknowledged).await {
            Err(_elapsed) => {
                self.take_handshake_waiter();
                self.shutdown_socket().await;
                self.set_state(ConnectionState::Closed);
                Err(ConnectError::HandshakeTimeout {
                    waited_ms: self.options.max_wait_time_ms,
                    location: ErrorLocation::capture(),
                })
            }
            Ok(Err(_dropped)) => {
                self.set_state(ConnectionState::Closed);
                Err(ConnectError::socket("connection closed during handshake"))
            }
            Ok(Ok(Err(rejection))) => {
                self.shutdown_socket().await;
                self.set_state(ConnectionState::Closed);
                Err(rejection)
            }
            Ok(Ok(Ok(result))) => {
                if result.code == 0 {
                    self.set_state(ConnectionState::Open);
                    info!("Authentication succeeded; connection open");
                    Ok(result)
                } else {
                    warn!("Authentication rejected with code {}", result.code);
                    self.shutdown_socket().await;
                    self.set_state(ConnectionState::Closed);
                    Err(ConnectError::rejected(result.code))
                }
            }
        }
    }

    /// Close the socket. Fails locally if no socket instance exists.
    pub(crate) async fn disconnect(&self) -> Result<(), ConnectError> {
        let mut slot = self.sink.lock().await;
        let Some(mut sink) = slot.take() else {
            return Err(ConnectError::NotConnected {
                location: ErrorLocation::capture(),
            });
        };
        self.set_state(ConnectionState::Closed);
        if let Err(error) = sink.close().await {
            debug!("Error while closing the socket: {error}");
        }
        info!("Disconnected");
        Ok(())
    }

    /// Issue one request and await its correlated response under a deadline.
    ///
    /// Fails immediately, without network I/O, unless the connection is
    /// `Open`. On timeout the table entry is removed so a late response is
    /// discarded rather than mis-delivered.
    pub(crate) async fn send_request(
        &self,
        command: &str,
        sub_command: Option<&str>,
        content: Option<Value>,
        call_timeout: Option<Duration>,
    ) -> Result<Value, CallError> {
        if self.state() != ConnectionState::Open {
            return Err(CallError::NotConnected {
                location: ErrorLocation::capture(),
            });
        }

        let sync_id = self.sync_ids.next();
        let request = WsRequest {
            sync_id: &sync_id,
            command,
            sub_command,
            content: content.as_ref(),
        };
        let text = request.encode().map_err(|error| CallError::Encode {
            message: error.to_string(),
            location: ErrorLocation::capture(),
        })?;

        let response = self.pending.register(sync_id.clone());
        {
            let mut slot = self.sink.lock().await;
            let Some(sink) = slot.as_mut() else {
                self.pending.remove(&sync_id);
                return Err(CallError::NotConnected {
                    location: ErrorLocation::capture(),
                });
            };
            if let Err(error) = sink.send(Message::Text(text.into())).await {
                self.pending.remove(&sync_id);
                return Err(CallError::Send {
                    message: error.to_string(),
                    location: ErrorLocation::capture(),
                });
            }
        }
        debug!("Sent request {sync_id} ({command})");

        let wait = call_timeout.unwrap_or_else(|| self.options.max_wait_time());
        match timeout(wait, response).await {
            Err(_elapsed) => {
                self.pending.remove(&sync_id);
                Err(CallError::Timeout {
                    sync_id,
                    waited_ms: wait.as_millis() as u64,
                })
            }
            Ok(Err(_dropped)) => Err(CallError::ConnectionClosed {
                location: ErrorLocation::capture(),
            }),
            Ok(Ok(data)) => Ok(data),
        }
    }

    /// Route one decoded inbound frame. Malformed frames are discarded here;
    /// nothing that happens on one frame may affect any other pending call
    /// or listener.
    fn dispatch(&self, text: &str) {
        let frame = match InboundFrame::decode(text, &self.options.reserved_sync_id) {
            Ok(frame) => frame,
            Err(error) => {
                warn!("Discarding malformed frame: {error}");
                return;
            }
        };
        match frame {
            InboundFrame::Handshake(data) => self.on_handshake(data),
            InboundFrame::Event(data) => {
                debug!(
                    "Dispatching event to {} subscriber(s)",
                    self.events.subscriber_count()
                );
                self.events.publish(&data);
            }
            InboundFrame::Response { sync_id, data } => self.on_response(sync_id, data),
        }
    }

    fn on_handshake(&self, data: Value) {
        match self.take_handshake_waiter() {
            Some(waiter) => {
                let outcome = serde_json::from_value::<AuthenticationResult>(data).map_err(
                    |error| {
                        ConnectError::socket(format!(
                            "unreadable authentication acknowledgement: {error}"
                        ))
                    },
                );
                let _ = waiter.send(outcome);
            }
            None => warn!("Discarding unsolicited authentication acknowledgement"),
        }
        // Authentication establishes a fresh session; correlation state from
        // before it is meaningless.
        self.pending.clear();
        self.events.clear();
    }

    fn on_response(&self, sync_id: SyncId, data: Value) {
        // Some server versions report authentication failure as an
        // error-coded response on a non-empty correlation id instead of the
        // empty-id acknowledgement; which versions produce which shape is
        // undocumented, so both are handled (the other is `on_handshake`).
        if self.handshake_pending() {
            if is_error_shaped(&data) {
                let code = data.get("code").and_then(Value::as_i64).unwrap_or(-1);
                if let Some(waiter) = self.take_handshake_waiter() {
                    let _ = waiter.send(Err(ConnectError::rejected(code)));
                }
            } else {
                warn!("Discarding response {sync_id} received before authentication completed");
            }
            return;
        }
        if !self.pending.settle(&sync_id, data) {
            debug!("Discarding response for unknown or timed-out packet {sync_id}");
        }
    }

    /// The socket is gone: reject a pending handshake waiter, fail
    /// outstanding calls, drop subscribers, and become terminal.
    async fn on_socket_closed(&self) {
        let previous = {
            let mut state = self.state.lock().expect("connection state poisoned");
            std::mem::replace(&mut *state, ConnectionState::Closed)
        };
        if let Some(waiter) = self.take_handshake_waiter() {
            let _ = waiter.send(Err(ConnectError::socket(
                "the socket closed before authentication completed",
            )));
        }
        self.pending.clear();
        self.events.clear();
        self.sink.lock().await.take();
        if previous == ConnectionState::Open {
            info!("Connection closed by the peer");
        }
    }

    async fn shutdown_socket(&self) {
        if let Some(mut sink) = self.sink.lock().await.take() {
            let _ = sink.close().await;
        }
    }
}

/// Reader task: one per connection, drives every inbound frame through
/// [`Connection::dispatch`]. Holds only a weak reference so the connection
/// does not outlive its client.
async fn read_loop(connection: Weak<Connection>, mut stream: SplitStream<WsStream>) {
    while let Some(message) = stream.next().await {
        let Some(connection) = connection.upgrade() else {
            return;
        };
        match message {
            Ok(Message::Text(text)) => connection.dispatch(text.as_str()),
            Ok(Message::Close(_)) => break,
            // Ping/pong and binary frames carry no envelope.
            Ok(_) => {}
            Err(error) => {
                warn!("Socket error: {error}");
                break;
            }
        }
    }
    if let Some(connection) = connection.upgrade() {
        connection.on_socket_closed().await;
    }
}
