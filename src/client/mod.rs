//! Async client surface.
//!
//! This module provides the main entry point for hosts running on tokio.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SseClient`] | Handle to the running multiplexer |
//! | [`SseClientBuilder`] | Fluent configuration builder |
//! | [`SseConfig`] | Reconnection policy and transport defaults |
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use sse_multiplex::{ElementId, Result, SseClient};
//!
//! # async fn example(host: Arc<MyHost>) -> Result<()> {
//! let client = SseClient::builder().host(host).build()?;
//!
//! client.connect(ElementId::new(1), "https://example.com/events").await?;
//! client.swap(ElementId::new(2), "user-update").await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Client handle and event loop.
pub mod core;

/// Reconnection policy and transport defaults.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::SseClientBuilder;
pub use core::SseClient;
pub use options::SseConfig;
