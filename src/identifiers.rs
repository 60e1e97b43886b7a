//! Type-safe identifiers.
//!
//! Newtype wrappers keep host element handles, subscriber ids, and transport
//! attempt ids from being mixed up at compile time.
//!
//! | Type | Origin | Purpose |
//! |------|--------|---------|
//! | [`ElementId`] | Host | A node in the host tree (scopes are elements) |
//! | [`SubscriberId`] | Engine | One registered subscriber |
//! | [`ConnectionId`] | Engine | One connection state-machine instance |
//! | [`TransportId`] | Engine | One transport attempt within a connection |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// ============================================================================
// Counters
// ============================================================================

static SUBSCRIBER_COUNTER: AtomicU64 = AtomicU64::new(1);
static CONNECTION_COUNTER: AtomicU64 = AtomicU64::new(1);
static TRANSPORT_COUNTER: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// ElementId
// ============================================================================

/// Handle for a node in the host's element tree.
///
/// The host assigns these; equality is identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(u64);

impl ElementId {
    /// Wraps a host-assigned handle.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw handle value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element-{}", self.0)
    }
}

impl From<u64> for ElementId {
    #[inline]
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// ============================================================================
// Generated Identifiers
// ============================================================================

macro_rules! generated_id {
    ($(#[$meta:meta])* $name:ident, $counter:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Allocates the next process-unique identifier.
            #[inline]
            #[must_use]
            pub fn next() -> Self {
                Self($counter.fetch_add(1, Ordering::Relaxed))
            }

            /// Returns the raw identifier value.
            #[inline]
            #[must_use]
            pub const fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

generated_id!(
    /// Identifier of a registered subscriber.
    SubscriberId,
    SUBSCRIBER_COUNTER,
    "sub"
);

generated_id!(
    /// Identifier of one connection state machine.
    ///
    /// A scope that closes and later reconnects gets a new `ConnectionId`,
    /// which is how stale reconnect timers are recognized.
    ConnectionId,
    CONNECTION_COUNTER,
    "conn"
);

generated_id!(
    /// Identifier of one transport attempt.
    TransportId,
    TRANSPORT_COUNTER,
    "transport"
);

// ============================================================================
// Tests
// ============================================================================
