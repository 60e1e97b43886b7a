//! Scope garbage collection.
//!
//! There is no sweep. Presence is checked on the hot path: before a scope
//! dispatches, when an attempt fails, and per subscriber during dispatch.
//! Hosts that do get a removal callback can report it through
//! [`Engine::element_removed`].

// ============================================================================
// Imports
// ============================================================================

use tracing::debug;

use crate::identifiers::ElementId;

use super::host::CloseReason;
use super::lifecycle::Engine;

// ============================================================================
// Engine - Collection
// ============================================================================

impl Engine {
    /// Closes `scope` with [`CloseReason::NodeMissing`] if the host no
    /// longer has it.
    ///
    /// Returns `true` if the scope is still present.
    pub fn collect_if_gone(&mut self, scope: ElementId) -> bool {
        if self.host.is_present(scope) {
            return true;
        }

        debug!(scope = %scope, "Scope missing from host tree");
        self.close(scope, CloseReason::NodeMissing);
        false
    }

    /// Host callback: `element` was removed or replaced.
    ///
    /// Closes a connection the element owned with
    /// [`CloseReason::NodeReplaced`] and drops subscribers bound to it.
    pub fn element_removed(&mut self, element: ElementId) {
        self.close(element, CloseReason::NodeReplaced);

        let removed = self.registry.remove_element(element);
        for subscriber in &removed {
            self.detach(subscriber);
        }

        if !removed.is_empty() {
            debug!(element = %element, subscribers = removed.len(), "Subscribers dropped with element");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
