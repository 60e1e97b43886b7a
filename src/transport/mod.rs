//! Streaming transport layer.
//!
//! The engine never talks to the network directly. It asks an injected
//! [`TransportFactory`] for a [`Transport`] per connection attempt and
//! receives [`TransportEvent`]s back over a channel.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   open(request, events)   ┌──────────────────┐
//! │     Engine      │──────────────────────────►│ TransportFactory │
//! │                 │                           └────────┬─────────┘
//! │                 │   listen / unlisten / close        │
//! │                 │──────────────────────────►┌────────▼─────────┐
//! │                 │                           │    Transport     │
//! │                 │◄──────────────────────────│  (one attempt)   │
//! └─────────────────┘   TransportEvent (mpsc)   └──────────────────┘
//! ```
//!
//! # Attempt Lifecycle
//!
//! 1. `TransportFactory::open` - start a request for the scope's URL
//! 2. `TransportEventKind::Open` - server accepted the stream
//! 3. `TransportEventKind::Message` - one frame per listened event type
//! 4. `TransportEventKind::Error` - attempt is over; the engine decides
//!    whether to retry with a new attempt
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Default HTTP transport (reqwest + eventsource-stream) |

// ============================================================================
// Submodules
// ============================================================================

/// HTTP Server-Sent Events transport.
pub mod connection;

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;
use url::Url;

use crate::identifiers::{ElementId, TransportId};
use crate::protocol::InboundMessage;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{HttpTransport, HttpTransportFactory};

// ============================================================================
// Types
// ============================================================================

/// Channel on which transports report activity.
pub type EventSender = mpsc::UnboundedSender<TransportEvent>;

/// Receiving half of [`EventSender`].
pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

// ============================================================================
// TransportRequest
// ============================================================================

/// Everything a factory needs to start one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    /// Scope that owns the connection.
    pub scope: ElementId,
    /// Attempt identifier to stamp on every event.
    pub transport: TransportId,
    /// Stream URL.
    pub url: Url,
    /// Last non-empty message id seen on this connection.
    pub last_event_id: Option<String>,
    /// Whether to send credentials (cookies) with the request.
    pub with_credentials: bool,
    /// Event types listened for from the first frame on.
    ///
    /// The engine also calls [`Transport::listen`] for each of them once
    /// the attempt is created; transports that start reading before that
    /// call must seed their listener set from here.
    pub event_types: Vec<String>,
}

// ============================================================================
// TransportEvent
// ============================================================================

/// An event reported by a transport attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    /// Scope that owns the connection.
    pub scope: ElementId,
    /// Attempt that produced the event.
    pub transport: TransportId,
    /// What happened.
    pub kind: TransportEventKind,
}

/// Kind of [`TransportEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    /// The server accepted the stream.
    Open,
    /// A frame arrived for a listened event type.
    Message(InboundMessage),
    /// The attempt failed or the stream ended.
    Error(String),
}

impl TransportEvent {
    /// Creates an event stamped with the request's scope and attempt.
    #[inline]
    #[must_use]
    pub fn new(request: &TransportRequest, kind: TransportEventKind) -> Self {
        Self {
            scope: request.scope,
            transport: request.transport,
            kind,
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// A live transport attempt.
///
/// `listen` and `unlisten` are idempotent set operations over named event
/// types; only listened types are forwarded as messages.
pub trait Transport: Send {
    /// Starts forwarding frames of `event_type`.
    fn listen(&mut self, event_type: &str);

    /// Stops forwarding frames of `event_type`.
    fn unlisten(&mut self, event_type: &str);

    /// Releases the underlying stream. No events follow.
    fn close(&mut self);
}

/// Creates transports. Injected at engine construction.
pub trait TransportFactory: Send + Sync {
    /// Starts a new attempt that reports on `events`.
    fn open(&self, request: TransportRequest, events: EventSender) -> Box<dyn Transport>;
}
