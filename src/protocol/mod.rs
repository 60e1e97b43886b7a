//! Wire-level message types and the filter language.
//!
//! # Protocol Overview
//!
//! | Type | Direction | Purpose |
//! |------|-----------|---------|
//! | [`InboundMessage`] | Server → Client | One normalized SSE frame |
//! | [`Filter`] | Host config | Predicate over a message |
//! | [`FilterList`] | Host config | Comma-separated OR of filters |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `filter` | Filter parsing and matching |
//! | `message` | Inbound message normalization |

// ============================================================================
// Submodules
// ============================================================================

/// Filter expression parsing and evaluation.
pub mod filter;

/// Inbound SSE message type.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use filter::{Filter, FilterList};
pub use message::{DEFAULT_EVENT_TYPE, InboundMessage};
