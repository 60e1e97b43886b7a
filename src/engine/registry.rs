//! Subscription registry.
//!
//! Subscribers are grouped by the scope whose connection feeds them.
//! Within a scope, registration order is preserved and is the dispatch
//! order.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;

use crate::identifiers::{ElementId, SubscriberId};
use crate::protocol::FilterList;

use super::host::Host;

// ============================================================================
// Action
// ============================================================================

/// What a subscriber does when its filters match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Replace the element's content with the message data.
    Swap,
    /// Run a host action described by the given spec.
    Trigger(String),
    /// Close the scope's connection.
    Close,
}

// ============================================================================
// Subscriber
// ============================================================================

/// A host element bound to filters and an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    /// Unique subscriber id.
    pub id: SubscriberId,
    /// Element the subscriber belongs to.
    pub element: ElementId,
    /// Scope whose connection delivers messages to this subscriber.
    pub scope: ElementId,
    /// Parsed filters.
    pub filters: FilterList,
    /// Action to run on match.
    pub action: Action,
}

impl Subscriber {
    /// Creates a subscriber with a fresh id.
    #[must_use]
    pub fn new(element: ElementId, scope: ElementId, filters: FilterList, action: Action) -> Self {
        Self {
            id: SubscriberId::next(),
            element,
            scope,
            filters,
            action,
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Per-scope ordered subscriber lists.
#[derive(Debug, Default)]
pub struct Registry {
    scopes: FxHashMap<ElementId, Vec<Subscriber>>,
}

impl Registry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `subscriber` to `scope`'s list.
    pub fn register(&mut self, scope: ElementId, subscriber: Subscriber) {
        self.scopes.entry(scope).or_default().push(subscriber);
    }

    /// Removes `subscriber` if its element left the host tree.
    ///
    /// Returns `true` iff the element is gone, whether or not it was still
    /// registered.
    pub fn unregister_if_owner_gone(&mut self, subscriber: &Subscriber, host: &dyn Host) -> bool {
        if host.is_present(subscriber.element) {
            return false;
        }

        self.remove(subscriber.scope, subscriber.id);
        true
    }

    /// Subscribers of `scope` in registration order.
    #[must_use]
    pub fn all_subscribers_of(&self, scope: ElementId) -> &[Subscriber] {
        self.scopes.get(&scope).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns `true` if `id` is registered under `scope`.
    #[must_use]
    pub fn contains(&self, scope: ElementId, id: SubscriberId) -> bool {
        self.all_subscribers_of(scope).iter().any(|s| s.id == id)
    }

    /// Removes one subscriber from `scope`.
    pub fn remove(&mut self, scope: ElementId, id: SubscriberId) -> Option<Subscriber> {
        let list = self.scopes.get_mut(&scope)?;
        let index = list.iter().position(|s| s.id == id)?;
        let removed = list.remove(index);

        if list.is_empty() {
            self.scopes.remove(&scope);
        }

        Some(removed)
    }

    /// Removes a subscriber by id, wherever it is registered.
    pub fn remove_by_id(&mut self, id: SubscriberId) -> Option<Subscriber> {
        let scope = self
            .scopes
            .iter()
            .find(|(_, list)| list.iter().any(|s| s.id == id))
            .map(|(scope, _)| *scope)?;

        self.remove(scope, id)
    }

    /// Removes every subscriber bound to `element`, across all scopes.
    pub fn remove_element(&mut self, element: ElementId) -> Vec<Subscriber> {
        let mut removed = Vec::new();

        for list in self.scopes.values_mut() {
            let (gone, kept): (Vec<_>, Vec<_>) =
                list.drain(..).partition(|s| s.element == element);
            *list = kept;
            removed.extend(gone);
        }

        self.scopes.retain(|_, list| !list.is_empty());
        removed
    }

    /// Drops all subscribers of `scope`, returning how many there were.
    pub fn remove_scope(&mut self, scope: ElementId) -> usize {
        self.scopes.remove(&scope).map_or(0, |list| list.len())
    }

    /// Number of subscribers under `scope`.
    #[inline]
    #[must_use]
    pub fn len_of(&self, scope: ElementId) -> usize {
        self.all_subscribers_of(scope).len()
    }

    /// Total number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes.values().map(Vec::len).sum()
    }

    /// Returns `true` if nothing is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::RecordingHost;

    const SCOPE: ElementId = ElementId::new(1);

    fn subscriber(element: u64) -> Subscriber {
        Subscriber::new(
            ElementId::new(element),
            SCOPE,
            FilterList::wildcard(),
            Action::Swap,
        )
    }

    #[test]
    fn test_registration_order_is_stable() {
        let mut registry = Registry::new();
        let a = subscriber(10);
        let b = subscriber(11);
        let c = subscriber(12);
        registry.register(SCOPE, a.clone());
        registry.register(SCOPE, b.clone());
        registry.register(SCOPE, c.clone());

        registry.remove(SCOPE, b.id);

        let ids: Vec<_> = registry.all_subscribers_of(SCOPE).iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![a.id, c.id]);
    }

    #[test]
    fn test_unregister_if_owner_gone() {
        let host = RecordingHost::new();
        host.attach(10, None);

        let mut registry = Registry::new();
        let present = subscriber(10);
        let missing = subscriber(11);
        registry.register(SCOPE, present.clone());
        registry.register(SCOPE, missing.clone());

        assert!(!registry.unregister_if_owner_gone(&present, &host));
        assert!(registry.unregister_if_owner_gone(&missing, &host));
        assert_eq!(registry.len_of(SCOPE), 1);
        assert!(!registry.contains(SCOPE, missing.id));
    }

    #[test]
    fn test_remove_element_across_scopes() {
        let mut registry = Registry::new();
        let other_scope = ElementId::new(2);
        registry.register(SCOPE, subscriber(10));
        registry.register(other_scope, subscriber(10));
        registry.register(other_scope, subscriber(20));

        let removed = registry.remove_element(ElementId::new(10));
        assert_eq!(removed.len(), 2);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.len_of(SCOPE), 0);
    }

    #[test]
    fn test_remove_scope_and_by_id() {
        let mut registry = Registry::new();
        let a = subscriber(10);
        registry.register(SCOPE, a.clone());
        registry.register(SCOPE, subscriber(11));

        assert!(registry.remove_by_id(a.id).is_some());
        assert!(registry.remove_by_id(a.id).is_none());
        assert_eq!(registry.remove_scope(SCOPE), 1);
        assert!(registry.is_empty());
    }
}
