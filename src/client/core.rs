//! Async client handle.
//!
//! [`SseClient`] owns an [`Engine`] inside a spawned tokio task. The task
//! multiplexes three inputs:
//!
//! - transport events (open, message, error)
//! - reconnect timers that fired
//! - commands from client handles
//!
//! Transport events are drained first so a command never observes a
//! connection state older than what the network already reported.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use sse_multiplex::{ElementId, SseClient};
//!
//! # async fn example(host: Arc<MyHost>) -> sse_multiplex::Result<()> {
//! let client = SseClient::builder().host(host).build()?;
//!
//! let feed = ElementId::new(1);
//! client.connect(feed, "https://example.com/events").await?;
//! client.swap(ElementId::new(2), "type:update").await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

use crate::engine::{Action, CloseReason, ConnectionStatus, Engine, Host, Reconnect};
use crate::error::{Error, Result};
use crate::identifiers::{ElementId, SubscriberId};
use crate::transport::{EventReceiver, TransportFactory};

use super::builder::SseClientBuilder;
use super::options::SseConfig;

// ============================================================================
// Types
// ============================================================================

/// Commands sent from client handles to the event loop.
enum ClientCommand {
    /// Ensure a scope owns a connection.
    Connect {
        scope: ElementId,
        url: String,
        reply: oneshot::Sender<Result<bool>>,
    },

    /// Add a subscriber.
    Register {
        element: ElementId,
        filters: String,
        action: Action,
        reply: oneshot::Sender<Option<SubscriberId>>,
    },

    /// Remove a subscriber.
    Unregister {
        id: SubscriberId,
        reply: oneshot::Sender<bool>,
    },

    /// Host reports an element left the tree.
    ElementRemoved(ElementId),

    /// Close a scope's connection.
    Close {
        scope: ElementId,
        reason: CloseReason,
        reply: oneshot::Sender<bool>,
    },

    /// Snapshot a scope's connection.
    Status {
        scope: ElementId,
        reply: oneshot::Sender<Option<ConnectionStatus>>,
    },

    /// Release everything and stop the loop.
    Shutdown,
}

// ============================================================================
// SseClient
// ============================================================================

/// Handle to a running SSE multiplexer.
///
/// Cheap to clone; all clones drive the same engine. The event loop
/// stops on [`shutdown`](Self::shutdown) or when every handle is dropped.
#[derive(Clone)]
pub struct SseClient {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ClientCommand>,
}

impl std::fmt::Debug for SseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SseClient")
            .field("running", &!self.command_tx.is_closed())
            .finish()
    }
}

// ============================================================================
// SseClient - Construction
// ============================================================================

impl SseClient {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> SseClientBuilder {
        SseClientBuilder::new()
    }

    /// Spawns the event loop around a fresh engine.
    pub(crate) fn spawn(
        config: SseConfig,
        host: Arc<dyn Host>,
        factory: Arc<dyn TransportFactory>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let engine = Engine::new(config, host, factory, event_tx);
        tokio::spawn(Self::run_event_loop(engine, command_rx, event_rx));

        Self { command_tx }
    }
}

// ============================================================================
// SseClient - Public API
// ============================================================================

impl SseClient {
    /// Ensures `scope` owns a connection to `url`.
    ///
    /// Returns `false` if the scope was already connected.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if `url` does not parse
    /// - [`Error::ConnectionClosed`] if the client was shut down
    pub async fn connect(&self, scope: ElementId, url: impl Into<String>) -> Result<bool> {
        let url = url.into();
        self.request(|reply| ClientCommand::Connect { scope, url, reply })
            .await?
    }

    /// Registers a subscriber under the nearest connected scope.
    ///
    /// Returns `None` when no ancestor of `element` owns a connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the client was shut down.
    pub async fn register(
        &self,
        element: ElementId,
        filters: impl Into<String>,
        action: Action,
    ) -> Result<Option<SubscriberId>> {
        let filters = filters.into();
        self.request(|reply| ClientCommand::Register {
            element,
            filters,
            action,
            reply,
        })
        .await
    }

    /// Registers a subscriber that swaps `element`'s content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the client was shut down.
    #[inline]
    pub async fn swap(
        &self,
        element: ElementId,
        filters: impl Into<String>,
    ) -> Result<Option<SubscriberId>> {
        self.register(element, filters, Action::Swap).await
    }

    /// Registers a subscriber that runs `spec` on `element`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the client was shut down.
    #[inline]
    pub async fn trigger(
        &self,
        element: ElementId,
        filters: impl Into<String>,
        spec: impl Into<String>,
    ) -> Result<Option<SubscriberId>> {
        self.register(element, filters, Action::Trigger(spec.into()))
            .await
    }

    /// Registers a subscriber that closes its scope on a match.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the client was shut down.
    #[inline]
    pub async fn close_on(
        &self,
        element: ElementId,
        filters: impl Into<String>,
    ) -> Result<Option<SubscriberId>> {
        self.register(element, filters, Action::Close).await
    }

    /// Removes a subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the client was shut down.
    pub async fn unregister(&self, id: SubscriberId) -> Result<bool> {
        self.request(|reply| ClientCommand::Unregister { id, reply })
            .await
    }

    /// Reports that `element` left the host tree.
    ///
    /// Fire-and-forget; cleanup happens on the event loop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the client was shut down.
    pub fn element_removed(&self, element: ElementId) -> Result<()> {
        self.command_tx
            .send(ClientCommand::ElementRemoved(element))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Closes `scope`'s connection.
    ///
    /// Returns `false` if the scope had none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the client was shut down.
    pub async fn close(&self, scope: ElementId, reason: CloseReason) -> Result<bool> {
        self.request(|reply| ClientCommand::Close {
            scope,
            reason,
            reply,
        })
        .await
    }

    /// Snapshots `scope`'s connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the client was shut down.
    pub async fn status(&self, scope: ElementId) -> Result<Option<ConnectionStatus>> {
        self.request(|reply| ClientCommand::Status { scope, reply })
            .await
    }

    /// Releases every connection and stops the event loop.
    ///
    /// No close notifications are delivered.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ClientCommand::Shutdown);
    }

    /// Sends a command and waits for its reply.
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> ClientCommand,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();

        self.command_tx
            .send(command(tx))
            .map_err(|_| Error::ConnectionClosed)?;

        Ok(rx.await?)
    }
}

// ============================================================================
// SseClient - Event Loop
// ============================================================================

impl SseClient {
    /// Event loop that owns the engine.
    async fn run_event_loop(
        mut engine: Engine,
        mut command_rx: mpsc::UnboundedReceiver<ClientCommand>,
        mut event_rx: EventReceiver,
    ) {
        let (timer_tx, mut timer_rx) = mpsc::unbounded_channel::<Reconnect>();

        loop {
            tokio::select! {
                biased;

                // Transport events
                Some(event) = event_rx.recv() => {
                    if let Some(reconnect) = engine.handle_event(event) {
                        Self::schedule(reconnect, &timer_tx);
                    }
                }

                // Fired reconnect timers
                Some(reconnect) = timer_rx.recv() => {
                    engine.reconnect(reconnect.scope, reconnect.connection);
                }

                // Commands from client handles
                command = command_rx.recv() => {
                    match command {
                        Some(ClientCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            break;
                        }

                        Some(command) => Self::handle_command(&mut engine, command),

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        engine.shutdown();

        debug!("Event loop terminated");
    }

    /// Applies one command to the engine.
    fn handle_command(engine: &mut Engine, command: ClientCommand) {
        match command {
            ClientCommand::Connect { scope, url, reply } => {
                let _ = reply.send(engine.connect(scope, &url));
            }

            ClientCommand::Register {
                element,
                filters,
                action,
                reply,
            } => {
                let _ = reply.send(engine.register(element, &filters, action));
            }

            ClientCommand::Unregister { id, reply } => {
                let _ = reply.send(engine.unregister(id));
            }

            ClientCommand::ElementRemoved(element) => engine.element_removed(element),

            ClientCommand::Close {
                scope,
                reason,
                reply,
            } => {
                let _ = reply.send(engine.close(scope, reason));
            }

            ClientCommand::Status { scope, reply } => {
                let _ = reply.send(engine.status(scope));
            }

            ClientCommand::Shutdown => {}
        }
    }

    /// Posts `reconnect` back to the loop once its delay elapses.
    fn schedule(reconnect: Reconnect, timer_tx: &mpsc::UnboundedSender<Reconnect>) {
        trace!(scope = %reconnect.scope, delay_ms = u64::try_from(reconnect.delay.as_millis()).unwrap_or(u64::MAX), "Reconnect scheduled");

        let timer_tx = timer_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(reconnect.delay).await;
            let _ = timer_tx.send(reconnect);
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
