//! HTTP Server-Sent Events transport.
//!
//! Each attempt spawns a tokio task that issues a `GET` with
//! `Accept: text/event-stream`, decodes the body with `eventsource-stream`,
//! and reports open/message/error events to the engine.
//!
//! # Event Loop
//!
//! - Non-2xx status or request failure: one `Error`, task ends
//! - 2xx status: `Open`, then one `Message` per listened frame
//! - Decode error or end of body: one `Error`, task ends
//!
//! Retrying is never done here; the engine opens a fresh attempt.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use parking_lot::RwLock;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use rustc_hash::FxHashSet;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::InboundMessage;

use super::{
    EventSender, Transport, TransportEvent, TransportEventKind, TransportFactory, TransportRequest,
};

// ============================================================================
// Constants
// ============================================================================

/// MIME type requested from the server.
const EVENT_STREAM_MIME: &str = "text/event-stream";

/// Header carrying the last seen message id on reconnect.
const LAST_EVENT_ID_HEADER: &str = "Last-Event-ID";

// ============================================================================
// Types
// ============================================================================

/// Event types the stream task forwards (shared with the task).
type ListenerSet = Arc<RwLock<FxHashSet<String>>>;

// ============================================================================
// HttpTransportFactory
// ============================================================================

/// Default transport factory backed by `reqwest`.
///
/// Holds two clients: a credentialed one with a cookie store and an
/// anonymous one. Requests pick one by
/// [`TransportRequest::with_credentials`].
#[derive(Debug, Clone)]
pub struct HttpTransportFactory {
    /// Client with a cookie store.
    credentialed: reqwest::Client,
    /// Client without cookies.
    anonymous: reqwest::Client,
}

impl HttpTransportFactory {
    /// Creates a factory with default clients.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if a client cannot be built (TLS backend
    /// initialization failure).
    pub fn new() -> Result<Self> {
        let credentialed = reqwest::Client::builder().cookie_store(true).build()?;
        let anonymous = reqwest::Client::builder().build()?;

        Ok(Self {
            credentialed,
            anonymous,
        })
    }

    /// Creates a factory that uses `client` for every request.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            credentialed: client.clone(),
            anonymous: client,
        }
    }
}

impl TransportFactory for HttpTransportFactory {
    fn open(&self, request: TransportRequest, events: EventSender) -> Box<dyn Transport> {
        let client = if request.with_credentials {
            self.credentialed.clone()
        } else {
            self.anonymous.clone()
        };

        Box::new(HttpTransport::spawn(client, request, events))
    }
}

// ============================================================================
// HttpTransport
// ============================================================================

/// One HTTP stream attempt.
///
/// Dropping the transport aborts the stream task.
pub struct HttpTransport {
    /// Event types forwarded by the stream task.
    listeners: ListenerSet,
    /// Stream task handle.
    task: JoinHandle<()>,
}

impl HttpTransport {
    /// Spawns the stream task for `request`.
    ///
    /// The listener set is seeded before the task starts, so frames sent
    /// with the response headers are never checked against an empty set.
    fn spawn(client: reqwest::Client, request: TransportRequest, events: EventSender) -> Self {
        let seeded: FxHashSet<String> = request.event_types.iter().cloned().collect();
        let listeners: ListenerSet = Arc::new(RwLock::new(seeded));
        let task = tokio::spawn(Self::run_stream(
            client,
            request,
            Arc::clone(&listeners),
            events,
        ));

        Self { listeners, task }
    }

    /// Stream task: connect, then forward frames until the body ends.
    async fn run_stream(
        client: reqwest::Client,
        request: TransportRequest,
        listeners: ListenerSet,
        events: EventSender,
    ) {
        let emit = |kind: TransportEventKind| {
            // Receiver gone means the engine is shutting down.
            let _ = events.send(TransportEvent::new(&request, kind));
        };

        let response = match Self::send_request(&client, &request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(scope = %request.scope, url = %request.url, error = %e, "Stream request failed");
                emit(TransportEventKind::Error(e.to_string()));
                return;
            }
        };

        debug!(scope = %request.scope, transport = %request.transport, "Stream opened");
        emit(TransportEventKind::Open);

        let mut stream = response.bytes_stream().eventsource();

        while let Some(item) = stream.next().await {
            match item {
                Ok(event) => {
                    let message = InboundMessage::from(event);

                    if listeners.read().contains(&message.event_type) {
                        emit(TransportEventKind::Message(message));
                    } else {
                        trace!(event_type = %message.event_type, "Frame without listener dropped");
                    }
                }

                Err(e) => {
                    warn!(scope = %request.scope, error = %e, "Stream decode failed");
                    emit(TransportEventKind::Error(e.to_string()));
                    return;
                }
            }
        }

        debug!(scope = %request.scope, "Stream ended by server");
        emit(TransportEventKind::Error("stream ended".to_string()));
    }

    /// Issues the streaming `GET`.
    async fn send_request(
        client: &reqwest::Client,
        request: &TransportRequest,
    ) -> Result<reqwest::Response> {
        let mut builder = client
            .get(request.url.clone())
            .header(ACCEPT, EVENT_STREAM_MIME)
            .header(CACHE_CONTROL, "no-cache");

        if let Some(last_event_id) = &request.last_event_id {
            builder = builder.header(LAST_EVENT_ID_HEADER, last_event_id.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(Error::transport(format!("unexpected status {status}")));
        }

        Ok(response)
    }
}

impl Transport for HttpTransport {
    fn listen(&mut self, event_type: &str) {
        self.listeners.write().insert(event_type.to_string());
    }

    fn unlisten(&mut self, event_type: &str) {
        self.listeners.write().remove(event_type);
    }

    fn close(&mut self) {
        self.task.abort();
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use url::Url;

    use crate::identifiers::{ElementId, TransportId};

    /// Serves one canned HTTP response and returns the raw request text.
    async fn serve_once(response: &'static str) -> (Url, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.expect("read");
            socket.write_all(response.as_bytes()).await.expect("write");
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });

        let url = Url::parse(&format!("http://127.0.0.1:{port}/events")).expect("url");
        (url, server)
    }

    fn request(url: Url, last_event_id: Option<&str>) -> TransportRequest {
        TransportRequest {
            scope: ElementId::new(1),
            transport: TransportId::next(),
            url,
            last_event_id: last_event_id.map(str::to_string),
            with_credentials: false,
            event_types: Vec::new(),
        }
    }

    async fn next_kind(rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> TransportEventKind {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event in time")
            .expect("channel open")
            .kind
    }

    #[tokio::test]
    async fn test_stream_forwards_listened_frames() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\n\
             Content-Type: text/event-stream\r\n\
             Connection: close\r\n\r\n\
             id: user-update\ndata: <div>X</div>\n\n\
             event: ignored\ndata: nope\n\n\
             event: notification\ndata: hi\n\n",
        )
        .await;

        let factory = HttpTransportFactory::with_client(reqwest::Client::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut transport = factory.open(request(url, None), tx);
        transport.listen("message");
        transport.listen("notification");

        assert_eq!(next_kind(&mut rx).await, TransportEventKind::Open);
        assert_eq!(
            next_kind(&mut rx).await,
            TransportEventKind::Message(InboundMessage::new("user-update", "message", "<div>X</div>"))
        );
        assert_eq!(
            next_kind(&mut rx).await,
            TransportEventKind::Message(InboundMessage::new("", "notification", "hi"))
        );
        assert!(matches!(next_kind(&mut rx).await, TransportEventKind::Error(_)));

        let raw_request = server.await.expect("server");
        assert!(raw_request.contains("text/event-stream"));
    }

    #[tokio::test]
    async fn test_seeded_types_forwarded_from_first_frame() {
        let (url, _server) = serve_once(
            "HTTP/1.1 200 OK\r\n\
             Content-Type: text/event-stream\r\n\
             Connection: close\r\n\r\n\
             event: tick\ndata: 42\n\n",
        )
        .await;

        let factory = HttpTransportFactory::with_client(reqwest::Client::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut seeded = request(url, None);
        seeded.event_types = vec!["tick".to_string()];

        // No listen() calls: the seed alone must let the frame through.
        let _transport = factory.open(seeded, tx);

        assert_eq!(next_kind(&mut rx).await, TransportEventKind::Open);
        assert_eq!(
            next_kind(&mut rx).await,
            TransportEventKind::Message(InboundMessage::new("", "tick", "42"))
        );
    }

    #[tokio::test]
    async fn test_non_success_status_reports_error() {
        let (url, _server) = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        let factory = HttpTransportFactory::with_client(reqwest::Client::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _transport = factory.open(request(url, None), tx);

        match next_kind(&mut rx).await {
            TransportEventKind::Error(info) => assert!(info.contains("503")),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_last_event_id_header_sent() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n",
        )
        .await;

        let factory = HttpTransportFactory::with_client(reqwest::Client::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _transport = factory.open(request(url, Some("evt-41")), tx);

        assert_eq!(next_kind(&mut rx).await, TransportEventKind::Open);

        let raw_request = server.await.expect("server").to_ascii_lowercase();
        assert!(raw_request.contains("last-event-id: evt-41"));
    }
}
