//! Builder pattern for client configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use sse_multiplex::{SseClient, SseConfig};
//!
//! # async fn example(host: Arc<MyHost>) -> sse_multiplex::Result<()> {
//! let client = SseClient::builder()
//!     .host(host)
//!     .config(SseConfig::new().with_credentials(false))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::engine::Host;
use crate::error::{Error, Result};
use crate::transport::{HttpTransportFactory, TransportFactory};

use super::core::SseClient;
use super::options::SseConfig;

// ============================================================================
// SseClientBuilder
// ============================================================================

/// Builder for an [`SseClient`].
///
/// Use [`SseClient::builder()`] to create one.
#[derive(Default)]
pub struct SseClientBuilder {
    /// Reconnection policy and transport defaults.
    config: SseConfig,
    /// Host callbacks (required).
    host: Option<Arc<dyn Host>>,
    /// Transport factory (defaults to HTTP).
    factory: Option<Arc<dyn TransportFactory>>,
}

impl fmt::Debug for SseClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SseClientBuilder")
            .field("config", &self.config)
            .field("host", &self.host.is_some())
            .field("factory", &self.factory.is_some())
            .finish()
    }
}

// ============================================================================
// SseClientBuilder Implementation
// ============================================================================

impl SseClientBuilder {
    /// Creates a builder with default configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the host environment.
    #[inline]
    #[must_use]
    pub fn host<H: Host + 'static>(mut self, host: Arc<H>) -> Self {
        self.host = Some(host);
        self
    }

    /// Overrides the transport factory.
    #[inline]
    #[must_use]
    pub fn transport<F: TransportFactory + 'static>(mut self, factory: F) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Sets the configuration.
    #[inline]
    #[must_use]
    pub fn config(mut self, config: SseConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the configuration and spawns the client event loop.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no host was set or the config is invalid
    /// - [`Error::Http`] if the default HTTP factory cannot be built
    pub fn build(self) -> Result<SseClient> {
        self.config.validate()?;

        let host = self.host.ok_or_else(|| {
            Error::config(
                "A host is required. Use .host() to set it.\n\
                 Example: SseClient::builder().host(Arc::new(my_host))",
            )
        })?;

        let factory = match self.factory {
            Some(factory) => factory,
            None => Arc::new(HttpTransportFactory::new()?),
        };

        Ok(SseClient::spawn(self.config, host, factory))
    }
}

// ============================================================================
// Tests
// ============================================================================
