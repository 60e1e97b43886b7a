//! Host environment contract.
//!
//! The host owns the element tree and whatever "content" means for it. The
//! engine only asks questions about the tree and invokes opaque callbacks.
//!
//! | Direction | Methods |
//! |-----------|---------|
//! | Engine asks host | [`Host::is_present`], [`Host::parent`] |
//! | Engine acts through host | [`Host::replace_content`], [`Host::run_trigger`] |
//! | Engine notifies host | `on_*` methods (default no-ops) |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identifiers::ElementId;
use crate::protocol::InboundMessage;

use super::registry::Subscriber;

// ============================================================================
// CloseReason
// ============================================================================

/// Why a connection was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CloseReason {
    /// The host removed or replaced the scope element.
    NodeReplaced,
    /// The scope element was found missing from the tree.
    NodeMissing,
    /// A close-subscriber matched an inbound message.
    Message,
}

impl CloseReason {
    /// Returns the wire name of the reason.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NodeReplaced => "nodeReplaced",
            Self::NodeMissing => "nodeMissing",
            Self::Message => "message",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Host
// ============================================================================

/// Callbacks supplied by the host environment.
///
/// All methods are invoked from the engine's single event loop, one at a
/// time, in transport delivery order.
pub trait Host: Send + Sync {
    /// Returns `true` while `element` is attached to the host tree.
    fn is_present(&self, element: ElementId) -> bool;

    /// Returns the parent of `element`, or `None` at the root.
    fn parent(&self, element: ElementId) -> Option<ElementId>;

    /// Replaces the content of `element` with `data`.
    fn replace_content(&self, element: ElementId, data: &str);

    /// Runs the host action described by `spec` on `element`.
    fn run_trigger(&self, element: ElementId, spec: &str, message: &InboundMessage);

    /// A connection reached the open state.
    fn on_connection_open(&self, _scope: ElementId) {}

    /// A transport attempt failed.
    fn on_connection_error(&self, _scope: ElementId, _info: &str) {}

    /// A connection closed for good.
    fn on_connection_closed(&self, _scope: ElementId, _reason: CloseReason) {}

    /// Called before a swap. Return `false` to veto it.
    fn on_before_message(&self, _subscriber: &Subscriber, _message: &InboundMessage) -> bool {
        true
    }

    /// Called after a swap or trigger ran.
    fn on_after_message(&self, _subscriber: &Subscriber, _message: &InboundMessage) {}

    /// No live subscriber of `scope` matched `message`.
    fn on_unmatched(&self, _scope: ElementId, _message: &InboundMessage) {}
}

// ============================================================================
// Tests
// ============================================================================
