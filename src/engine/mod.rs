//! Connection lifecycle, subscription registry, and dispatch.
//!
//! The engine is a synchronous state machine. It is driven by transport
//! events and host callbacks, one at a time, and never blocks. The async
//! [`SseClient`](crate::SseClient) feeds it from a tokio event loop; hosts
//! with their own loop can drive an [`Engine`] directly.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Engine`] | Connections per scope, reconnection policy |
//! | [`Registry`] | Ordered subscribers per scope |
//! | [`Host`] | Callbacks supplied by the host environment |
//! | [`Subscriber`] | Element + filters + action |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `lifecycle` | Connection state machine and backoff |
//! | `dispatch` | Message-to-subscriber routing |
//! | `collector` | Lazy scope and subscriber cleanup |
//! | `registry` | Subscriber storage |
//! | `host` | Host trait and close reasons |

// ============================================================================
// Submodules
// ============================================================================

/// Lazy cleanup of scopes and subscribers.
pub mod collector;

/// Message dispatch.
pub mod dispatch;

/// Host environment contract.
pub mod host;

/// Connection state machine.
pub mod lifecycle;

/// Subscriber storage.
pub mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use host::{CloseReason, Host};
pub use lifecycle::{
    ConnectionStatus, Engine, Reconnect, TransportState, backoff_delay, next_retry,
};
pub use registry::{Action, Registry, Subscriber};
