//! Connection lifecycle manager.
//!
//! One [`Connection`] per scope, each a small state machine:
//!
//! ```text
//!            connect()             Open
//!  Absent ─────────────► Connecting ────► Open
//!                            ▲   │          │ Error (scope present)
//!            reconnect()     │   │ Error    │
//!            after backoff   └───┴──────────┘
//!
//!  Connecting/Open ── close(reason) / Error (scope missing) ──► Closed
//! ```
//!
//! `Closed` is terminal: the connection is removed and a later
//! [`Engine::connect`] builds a brand-new one.
//!
//! # Backoff
//!
//! Each failure doubles the retry counter (floored at 1, capped at the
//! configured maximum) and waits `retry * base_delay` before the next
//! attempt: 500ms, 1s, 2s, ... 64s with the defaults.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::client::SseConfig;
use crate::error::Result;
use crate::identifiers::{ConnectionId, ElementId, SubscriberId, TransportId};
use crate::protocol::FilterList;
use crate::transport::{
    EventSender, Transport, TransportEvent, TransportEventKind, TransportFactory, TransportRequest,
};

use super::host::{CloseReason, Host};
use super::registry::{Action, Registry, Subscriber};

// ============================================================================
// Backoff Policy
// ============================================================================

/// Retry counter after one more failure: doubled, floored at 1, capped.
#[inline]
#[must_use]
pub fn next_retry(retry: u32, max_retry: u32) -> u32 {
    retry.saturating_mul(2).clamp(1, max_retry.max(1))
}

/// Wait before the next attempt for a given retry counter.
#[inline]
#[must_use]
pub fn backoff_delay(retry: u32, base_delay: Duration) -> Duration {
    base_delay.saturating_mul(retry)
}

// ============================================================================
// TransportState
// ============================================================================

/// Transport state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TransportState {
    /// An attempt is in flight or scheduled.
    Connecting,
    /// The server accepted the stream.
    Open,
    /// Released for good.
    Closed,
}

// ============================================================================
// Reconnect / ConnectionStatus
// ============================================================================

/// A reconnect the caller must schedule.
///
/// After `delay`, pass `scope` and `connection` back to
/// [`Engine::reconnect`]. Stale requests are ignored there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconnect {
    /// Scope to reconnect.
    pub scope: ElementId,
    /// Connection instance the timer belongs to.
    pub connection: ConnectionId,
    /// How long to wait.
    pub delay: Duration,
}

/// Snapshot of one scope's connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    /// Connection instance.
    pub connection: ConnectionId,
    /// Stream URL.
    pub url: Url,
    /// Transport state.
    pub state: TransportState,
    /// Retry counter (0 while healthy).
    pub retry_count: u32,
    /// Live subscribers under the scope.
    pub subscribers: usize,
}

// ============================================================================
// Connection
// ============================================================================

/// The transport attempt currently owned by a connection.
struct ActiveTransport {
    id: TransportId,
    handle: Box<dyn Transport>,
}

/// One scope's streaming session.
pub(crate) struct Connection {
    id: ConnectionId,
    url: Url,
    state: TransportState,
    retry_count: u32,
    transport: Option<ActiveTransport>,
    /// Subscriber references per named event type.
    listeners: FxHashMap<String, usize>,
    last_event_id: Option<String>,
    reconnect_pending: bool,
}

impl Connection {
    fn new(url: Url) -> Self {
        Self {
            id: ConnectionId::next(),
            url,
            state: TransportState::Connecting,
            retry_count: 0,
            transport: None,
            listeners: FxHashMap::default(),
            last_event_id: None,
            reconnect_pending: false,
        }
    }

    /// Returns `true` if `transport` is the live attempt.
    fn owns(&self, transport: TransportId) -> bool {
        self.transport.as_ref().is_some_and(|t| t.id == transport)
    }

    /// Returns `true` if frames of `event_type` reach subscribers.
    pub(crate) fn is_listening(&self, event_type: &str, defaults: &[String]) -> bool {
        defaults.iter().any(|t| t == event_type) || self.listeners.contains_key(event_type)
    }

    /// Remembers the last non-empty message id for `Last-Event-ID`.
    pub(crate) fn record_event_id(&mut self, id: &str) {
        if !id.is_empty() {
            self.last_event_id = Some(id.to_string());
        }
    }

    /// Adds listener references for a subscriber's filters.
    fn attach(&mut self, filters: &FilterList, defaults: &[String]) {
        for event_type in filters.event_types() {
            let count = self.listeners.entry(event_type.to_string()).or_insert(0);
            *count += 1;

            if *count == 1
                && !defaults.iter().any(|t| t == event_type)
                && let Some(active) = self.transport.as_mut()
            {
                active.handle.listen(event_type);
            }
        }
    }

    /// Drops listener references for a subscriber's filters.
    fn detach(&mut self, filters: &FilterList, defaults: &[String]) {
        for event_type in filters.event_types() {
            let Some(count) = self.listeners.get_mut(event_type) else {
                continue;
            };
            *count = count.saturating_sub(1);

            if *count == 0 {
                self.listeners.remove(event_type);

                if !defaults.iter().any(|t| t == event_type)
                    && let Some(active) = self.transport.as_mut()
                {
                    active.handle.unlisten(event_type);
                }
            }
        }
    }

    /// Closes and forgets the live attempt.
    fn release_transport(&mut self) {
        if let Some(mut active) = self.transport.take() {
            active.handle.close();
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Synchronous core: connections, subscribers, and dispatch.
///
/// The engine never blocks or sleeps. Reconnect delays are returned as
/// [`Reconnect`] values for the caller (normally
/// [`SseClient`](crate::SseClient)) to schedule.
pub struct Engine {
    pub(crate) config: SseConfig,
    pub(crate) host: Arc<dyn Host>,
    factory: Arc<dyn TransportFactory>,
    events: EventSender,
    pub(crate) connections: FxHashMap<ElementId, Connection>,
    pub(crate) registry: Registry,
}

// ============================================================================
// Engine - Constructor
// ============================================================================

impl Engine {
    /// Creates an engine whose transports report on `events`.
    #[must_use]
    pub fn new(
        config: SseConfig,
        host: Arc<dyn Host>,
        factory: Arc<dyn TransportFactory>,
        events: EventSender,
    ) -> Self {
        Self {
            config,
            host,
            factory,
            events,
            connections: FxHashMap::default(),
            registry: Registry::new(),
        }
    }

    /// Returns the active configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SseConfig {
        &self.config
    }
}

// ============================================================================
// Engine - Connections
// ============================================================================

impl Engine {
    /// Ensures `scope` owns a connection to `url`.
    ///
    /// Returns `Ok(false)` if the scope already had one (the existing
    /// connection is kept untouched).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`](crate::Error::Url) if `url` does not parse.
    pub fn connect(&mut self, scope: ElementId, url: &str) -> Result<bool> {
        if self.connections.contains_key(&scope) {
            debug!(scope = %scope, "Connection already exists");
            return Ok(false);
        }

        let url = Url::parse(url)?;
        let connection = Connection::new(url);
        debug!(scope = %scope, connection = %connection.id, url = %connection.url, "Connection created");

        self.connections.insert(scope, connection);
        self.open_transport(scope);
        Ok(true)
    }

    /// Closes `scope`'s connection and drops its subscribers.
    ///
    /// Returns `false` if there was nothing to close.
    pub fn close(&mut self, scope: ElementId, reason: CloseReason) -> bool {
        let Some(mut connection) = self.connections.remove(&scope) else {
            return false;
        };

        connection.release_transport();
        connection.state = TransportState::Closed;
        let dropped = self.registry.remove_scope(scope);

        info!(scope = %scope, connection = %connection.id, %reason, subscribers = dropped, "Connection closed");
        self.host.on_connection_closed(scope, reason);
        true
    }

    /// Releases every transport without notifying the host.
    pub fn shutdown(&mut self) {
        for (scope, mut connection) in self.connections.drain() {
            connection.release_transport();
            debug!(scope = %scope, "Connection released on shutdown");
        }
        self.registry = Registry::new();
    }

    /// Routes one transport event.
    ///
    /// Events from a superseded attempt are ignored. Returns the reconnect
    /// to schedule, if any.
    pub fn handle_event(&mut self, event: TransportEvent) -> Option<Reconnect> {
        let scope = event.scope;

        let owned = self
            .connections
            .get(&scope)
            .is_some_and(|c| c.owns(event.transport));

        if !owned {
            debug!(scope = %scope, transport = %event.transport, "Stale transport event ignored");
            return None;
        }

        match event.kind {
            TransportEventKind::Open => {
                self.on_open(scope);
                None
            }
            TransportEventKind::Message(message) => {
                self.dispatch(scope, &message);
                None
            }
            TransportEventKind::Error(info) => self.on_error(scope, &info),
        }
    }

    /// Timer re-entry point after a backoff delay.
    ///
    /// No-op if the connection closed or was replaced in the meantime.
    pub fn reconnect(&mut self, scope: ElementId, connection: ConnectionId) {
        let Some(conn) = self.connections.get_mut(&scope) else {
            return;
        };

        if conn.id != connection || !conn.reconnect_pending {
            debug!(scope = %scope, "Stale reconnect ignored");
            return;
        }
        conn.reconnect_pending = false;

        if !self.host.is_present(scope) {
            self.close(scope, CloseReason::NodeMissing);
            return;
        }

        debug!(scope = %scope, "Reconnecting");
        self.open_transport(scope);
    }

    /// Starts a new transport attempt for `scope`.
    fn open_transport(&mut self, scope: ElementId) {
        let Some(connection) = self.connections.get_mut(&scope) else {
            return;
        };

        // Defaults first, then every type a subscriber still references.
        let mut event_types = self.config.default_event_types.clone();
        for event_type in connection.listeners.keys() {
            if !event_types.contains(event_type) {
                event_types.push(event_type.clone());
            }
        }

        let request = TransportRequest {
            scope,
            transport: TransportId::next(),
            url: connection.url.clone(),
            last_event_id: connection.last_event_id.clone(),
            with_credentials: self.config.with_credentials,
            event_types,
        };
        let transport_id = request.transport;
        let event_types = request.event_types.clone();

        let mut handle = self.factory.open(request, self.events.clone());
        for event_type in &event_types {
            handle.listen(event_type);
        }

        connection.state = TransportState::Connecting;
        connection.transport = Some(ActiveTransport {
            id: transport_id,
            handle,
        });
    }

    /// Connecting → Open.
    fn on_open(&mut self, scope: ElementId) {
        let Some(connection) = self.connections.get_mut(&scope) else {
            return;
        };

        let reconnected = connection.retry_count > 0;
        connection.state = TransportState::Open;
        connection.retry_count = 0;

        if reconnected {
            debug!(
                scope = %scope,
                subscribers = self.registry.len_of(scope),
                listeners = connection.listeners.len(),
                "Reconnected with subscribers attached"
            );
        }

        info!(scope = %scope, connection = %connection.id, "Connection open");
        self.host.on_connection_open(scope);
    }

    /// Attempt failed: close if the scope is gone, else back off.
    fn on_error(&mut self, scope: ElementId, info: &str) -> Option<Reconnect> {
        warn!(scope = %scope, error = %info, "Connection error");
        self.host.on_connection_error(scope, info);

        if !self.host.is_present(scope) {
            self.close(scope, CloseReason::NodeMissing);
            return None;
        }

        let base_delay = self.config.base_delay();
        let max_retry = self.config.max_retry;
        let connection = self.connections.get_mut(&scope)?;

        connection.release_transport();
        connection.state = TransportState::Connecting;

        if connection.reconnect_pending {
            return None;
        }

        connection.retry_count = next_retry(connection.retry_count, max_retry);
        connection.reconnect_pending = true;
        let delay = backoff_delay(connection.retry_count, base_delay);

        debug!(scope = %scope, retry = connection.retry_count, delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), "Reconnect scheduled");

        Some(Reconnect {
            scope,
            connection: connection.id,
            delay,
        })
    }
}

// ============================================================================
// Engine - Subscribers
// ============================================================================

impl Engine {
    /// Registers a subscriber for `element`.
    ///
    /// The subscriber is anchored at the nearest scope (starting at
    /// `element` itself) that owns a connection. Returns `None` when no
    /// such scope exists.
    pub fn register(
        &mut self,
        element: ElementId,
        filters: &str,
        action: Action,
    ) -> Option<SubscriberId> {
        let Some(scope) = self.find_scope(element) else {
            debug!(element = %element, filters, "Orphaned registration dropped");
            return None;
        };

        let subscriber = Subscriber::new(element, scope, FilterList::parse(filters), action);
        let id = subscriber.id;

        if let Some(connection) = self.connections.get_mut(&scope) {
            connection.attach(&subscriber.filters, &self.config.default_event_types);
        }

        debug!(element = %element, scope = %scope, subscriber = %id, filters = %subscriber.filters, "Subscriber registered");
        self.registry.register(scope, subscriber);
        Some(id)
    }

    /// Removes a subscriber by id.
    pub fn unregister(&mut self, id: SubscriberId) -> bool {
        match self.registry.remove_by_id(id) {
            Some(subscriber) => {
                self.detach(&subscriber);
                true
            }
            None => false,
        }
    }

    /// Removes `subscriber` if its element left the host tree.
    pub fn unregister_if_owner_gone(&mut self, subscriber: &Subscriber) -> bool {
        let registered = self.registry.contains(subscriber.scope, subscriber.id);

        if !self
            .registry
            .unregister_if_owner_gone(subscriber, self.host.as_ref())
        {
            return false;
        }

        if registered {
            self.detach(subscriber);
            debug!(subscriber = %subscriber.id, element = %subscriber.element, "Subscriber collected");
        }
        true
    }

    /// Subscribers of `scope` in registration order.
    #[must_use]
    pub fn all_subscribers_of(&self, scope: ElementId) -> &[Subscriber] {
        self.registry.all_subscribers_of(scope)
    }

    /// Walks up from `element` to the nearest scope owning a connection.
    fn find_scope(&self, element: ElementId) -> Option<ElementId> {
        let mut current = Some(element);

        while let Some(node) = current {
            if self.connections.contains_key(&node) {
                return Some(node);
            }
            current = self.host.parent(node);
        }

        None
    }

    /// Drops the subscriber's listener references.
    pub(crate) fn detach(&mut self, subscriber: &Subscriber) {
        if let Some(connection) = self.connections.get_mut(&subscriber.scope) {
            connection.detach(&subscriber.filters, &self.config.default_event_types);
        }
    }
}

// ============================================================================
// Engine - Introspection
// ============================================================================

impl Engine {
    /// Snapshot of `scope`'s connection, if it has one.
    #[must_use]
    pub fn status(&self, scope: ElementId) -> Option<ConnectionStatus> {
        self.connections.get(&scope).map(|c| ConnectionStatus {
            connection: c.id,
            url: c.url.clone(),
            state: c.state,
            retry_count: c.retry_count,
            subscribers: self.registry.len_of(scope),
        })
    }

    /// Transport state of `scope`'s connection.
    #[inline]
    #[must_use]
    pub fn state(&self, scope: ElementId) -> Option<TransportState> {
        self.connections.get(&scope).map(|c| c.state)
    }

    /// Retry counter of `scope`'s connection.
    #[inline]
    #[must_use]
    pub fn retry_count(&self, scope: ElementId) -> Option<u32> {
        self.connections.get(&scope).map(|c| c.retry_count)
    }

    /// Number of subscribers under `scope`.
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self, scope: ElementId) -> usize {
        self.registry.len_of(scope)
    }

    /// Number of live connections.
    #[inline]
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
