//! Test helpers for WebSocket integration tests.
//!
//! This module provides a scripted mock server that plays the remote peer:
//! - Accepting one upgrade and capturing its URI (for query assertions)
//! - Sending a scripted first frame (the authentication acknowledgement)
//! - Answering parsed client requests through a responder closure
//! - Pushing arbitrary frames (events, late responses) from the test body

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};

const WAIT: Duration = Duration::from_secs(1);

/// Frame builder: successful authentication acknowledgement.
pub fn auth_ok_frame(session_key: &str) -> Value {
    json!({ "syncId": "", "data": { "code": 0, "sessionKey": session_key } })
}

/// Frame builder: authentication acknowledgement carrying a failure code.
pub fn auth_failed_frame(code: i64) -> Value {
    json!({ "syncId": "", "data": { "code": code, "msg": "Auth failed" } })
}

/// Frame builder: correlated response for one request.
pub fn response_frame(sync_id: &str, data: Value) -> Value {
    json!({ "syncId": sync_id, "data": data })
}

/// Frame builder: unsolicited event, tagged with the default reserved id.
pub fn event_frame(payload: Value) -> Value {
    json!({ "syncId": "-1", "data": payload })
}

type Responder = Box<dyn FnMut(&Value) -> Vec<Value> + Send>;

/// What the mock server does on its own, before the test body intervenes.
pub struct ServerScript {
    first_frame: Option<Value>,
    responder: Responder,
}

impl ServerScript {
    /// Acknowledge authentication with code 0 and the given session key.
    pub fn auth_ok(session_key: &str) -> Self {
        Self::first_frame(auth_ok_frame(session_key))
    }

    /// Send the given frame immediately after the upgrade completes.
    pub fn first_frame(frame: Value) -> Self {
        Self {
            first_frame: Some(frame),
            responder: Box::new(|_| Vec::new()),
        }
    }

    /// Send nothing until told to; requests go unanswered.
    pub fn silent() -> Self {
        Self {
            first_frame: None,
            responder: Box::new(|_| Vec::new()),
        }
    }

    /// Answer each parsed client request with the returned frames.
    pub fn with_responder(
        mut self,
        responder: impl FnMut(&Value) -> Vec<Value> + Send + 'static,
    ) -> Self {
        self.responder = Box::new(responder);
        self
    }
}

enum ServerPush {
    Frame(Value),
    Close,
}

/// Handle to a mock server serving exactly one connection.
pub struct TestServer {
    /// Base connection address; credentials are appended by the client.
    pub address: String,
    upgrade_uri: mpsc::UnboundedReceiver<String>,
    requests: mpsc::UnboundedReceiver<Value>,
    push: mpsc::UnboundedSender<ServerPush>,
}

impl TestServer {
    /// Bind an ephemeral port and start serving the script.
    pub async fn start(script: ServerScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let port = listener.local_addr().expect("No local address").port();

        let (uri_tx, uri_rx) = mpsc::unbounded_channel();
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (push_tx, push_rx) = mpsc::unbounded_channel();

        tokio::spawn(serve_connection(
            listener, script, uri_tx, request_tx, push_rx,
        ));

        Self {
            address: format!("ws://127.0.0.1:{port}/all"),
            upgrade_uri: uri_rx,
            requests: request_rx,
            push: push_tx,
        }
    }

    /// The URI (path and query) the client used in its upgrade request.
    pub async fn upgrade_uri(&mut self) -> String {
        timeout(WAIT, self.upgrade_uri.recv())
            .await
            .expect("No upgrade within the wait time")
            .expect("Server task gone")
    }

    /// The next request the client put on the wire, parsed.
    pub async fn next_request(&mut self) -> Value {
        timeout(WAIT, self.requests.recv())
            .await
            .expect("No request within the wait time")
            .expect("Server task gone")
    }

    /// Send one frame to the client, out of band.
    pub fn push_frame(&self, frame: Value) {
        self.push
            .send(ServerPush::Frame(frame))
            .expect("Server task gone");
    }

    /// Close the connection from the server side.
    pub fn close_connection(&self) {
        self.push
            .send(ServerPush::Close)
            .expect("Server task gone");
    }
}

async fn serve_connection(
    listener: TcpListener,
    script: ServerScript,
    uri_tx: mpsc::UnboundedSender<String>,
    request_tx: mpsc::UnboundedSender<Value>,
    mut push_rx: mpsc::UnboundedReceiver<ServerPush>,
) {
    let ServerScript {
        first_frame,
        mut responder,
    } = script;

    let (stream, _) = listener.accept().await.expect("Accept failed");
    let socket = accept_hdr_async(stream, |request: &Request, response: Response| {
        let _ = uri_tx.send(request.uri().to_string());
        Ok(response)
    })
    .await
    .expect("Upgrade failed");

    let (mut sink, mut stream) = socket.split();
    if let Some(frame) = first_frame {
        sink.send(Message::Text(frame.to_string().into()))
            .await
            .expect("Failed to send the first frame");
    }

    loop {
        tokio::select! {
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    let request: Value =
                        serde_json::from_str(text.as_str()).expect("Client sent non-JSON");
                    for reply in responder(&request) {
                        sink.send(Message::Text(reply.to_string().into()))
                            .await
                            .expect("Failed to send reply");
                    }
                    let _ = request_tx.send(request);
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
            action = push_rx.recv() => match action {
                Some(ServerPush::Frame(frame)) => {
                    sink.send(Message::Text(frame.to_string().into()))
                        .await
                        .expect("Failed to push frame");
                }
                Some(ServerPush::Close) => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
                // The test dropped its handle; the test is over.
                None => break,
            },
        }
    }
}
