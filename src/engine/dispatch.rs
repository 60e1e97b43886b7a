//! Dispatch engine.
//!
//! For each inbound message on a scope's connection:
//!
//! 1. Collect the scope if the host dropped it.
//! 2. Walk the scope's subscribers in registration order, skipping (and
//!    collecting) those whose element is gone.
//! 3. Run the action of every subscriber whose filters match.
//!
//! | Action | Effect |
//! |--------|--------|
//! | `Swap` | `on_before_message` (may veto) → `replace_content` → `on_after_message` |
//! | `Trigger` | `run_trigger` → `on_after_message` |
//! | `Close` | close the connection with reason `message` (first match only) |

// ============================================================================
// Imports
// ============================================================================

use tracing::{debug, trace};

use crate::identifiers::ElementId;
use crate::protocol::InboundMessage;

use super::host::CloseReason;
use super::lifecycle::Engine;
use super::registry::{Action, Subscriber};

// ============================================================================
// Engine - Dispatch
// ============================================================================

impl Engine {
    /// Delivers `message` to the subscribers of `scope`.
    pub(crate) fn dispatch(&mut self, scope: ElementId, message: &InboundMessage) {
        if !self.collect_if_gone(scope) {
            return;
        }

        let Some(connection) = self.connections.get_mut(&scope) else {
            return;
        };

        connection.record_event_id(&message.id);

        if !connection.is_listening(&message.event_type, &self.config.default_event_types) {
            trace!(scope = %scope, event_type = %message.event_type, "No listener for event type");
            return;
        }

        // Snapshot: actions may close the connection mid-loop.
        let subscribers: Vec<Subscriber> = self.registry.all_subscribers_of(scope).to_vec();
        let mut matched = false;
        let mut closed = false;

        for subscriber in &subscribers {
            if self.unregister_if_owner_gone(subscriber) {
                continue;
            }

            if !subscriber.filters.matches(message) {
                continue;
            }
            matched = true;

            trace!(subscriber = %subscriber.id, message_id = %message.id, event_type = %message.event_type, "Subscriber matched");

            match &subscriber.action {
                Action::Swap => self.run_swap(subscriber, message),

                Action::Trigger(spec) => {
                    self.host.run_trigger(subscriber.element, spec, message);
                    self.host.on_after_message(subscriber, message);
                }

                Action::Close => {
                    if !closed {
                        closed = self.close(scope, CloseReason::Message);
                    }
                }
            }
        }

        if !matched {
            trace!(scope = %scope, message_id = %message.id, "Message matched no subscriber");
            self.host.on_unmatched(scope, message);
        }
    }

    /// Runs a swap unless the host vetoes it.
    fn run_swap(&self, subscriber: &Subscriber, message: &InboundMessage) {
        if !self.host.on_before_message(subscriber, message) {
            debug!(subscriber = %subscriber.id, "Swap vetoed by host");
            return;
        }

        self.host.replace_content(subscriber.element, &message.data);
        self.host.on_after_message(subscriber, message);
    }
}

// ============================================================================
// Tests
// ============================================================================
