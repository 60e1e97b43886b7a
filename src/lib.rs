//! SSE Multiplex - Server-Sent Events fan-out for element trees.
//!
//! This library keeps one streaming connection per *scope* element of a
//! host tree and routes each inbound message to the subscribers registered
//! beneath that scope.
//!
//! # Architecture
//!
//! - **Scope**: an element that owns exactly one SSE connection
//! - **Subscriber**: an element + filter list + action (swap, trigger, close)
//! - **Host**: the embedding environment; answers tree queries and applies
//!   swaps and triggers
//!
//! Key design principles:
//!
//! - The [`Engine`] is a synchronous state machine; the async [`SseClient`]
//!   drives it from a single tokio task
//! - Dropped transports reconnect with exponential backoff
//!   (500ms, 1s, 2s ... capped at 64s)
//! - Scopes and subscribers whose elements vanished are collected lazily,
//!   on the next event that touches them
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use sse_multiplex::{ElementId, Result, SseClient};
//!
//! # async fn example(host: Arc<MyHost>) -> Result<()> {
//! let client = SseClient::builder().host(host).build()?;
//!
//! let feed = ElementId::new(1);
//! client.connect(feed, "https://example.com/events").await?;
//!
//! // Swap the badge whenever a "notification" event arrives
//! client.swap(ElementId::new(2), "type:notification").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Async client handle and configuration |
//! | [`engine`] | Connections, subscribers, dispatch |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Inbound messages and the filter language |
//! | [`transport`] | Pluggable streaming transport |

// ============================================================================
// Modules
// ============================================================================

/// Async client handle and configuration.
///
/// Use [`SseClient::builder()`] to create a running client.
pub mod client;

/// Connection lifecycle, subscriber registry, and dispatch.
pub mod engine;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for elements, subscribers, and connections.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Inbound message type and filter expressions.
pub mod protocol;

/// Streaming transport abstraction and the default HTTP implementation.
pub mod transport;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{SseClient, SseClientBuilder, SseConfig};

// Engine types
pub use engine::{
    Action, CloseReason, ConnectionStatus, Engine, Host, Reconnect, Subscriber, TransportState,
    backoff_delay, next_retry,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ConnectionId, ElementId, SubscriberId, TransportId};

// Protocol types
pub use protocol::{DEFAULT_EVENT_TYPE, Filter, FilterList, InboundMessage};

// Transport types
pub use transport::{
    EventReceiver, EventSender, HttpTransportFactory, Transport, TransportEvent,
    TransportEventKind, TransportFactory, TransportRequest,
};
