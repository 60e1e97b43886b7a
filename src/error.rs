//! Error types for the SSE multiplexer.
//!
//! Almost nothing in the dispatch core can fail: transport failures feed the
//! reconnection policy, orphaned registrations return `None`, and filters
//! never fail to parse. The variants here cover the edges where a caller
//! genuinely has to react: bad configuration, bad URLs, and a client whose
//! event loop has already stopped.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::Url`], [`Error::Json`] |
//! | Transport | [`Error::Transport`], [`Error::Http`] |
//! | Client | [`Error::ConnectionClosed`], [`Error::ChannelClosed`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid or incomplete.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Stream URL could not be parsed.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// JSON configuration could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// The event stream failed or was rejected by the server.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // ========================================================================
    // Client Errors
    // ========================================================================
    /// The client event loop is no longer running.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Reply channel dropped before an answer arrived.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error came from the network layer.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Http(_))
    }

    /// Returns `true` if the client can no longer accept commands.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::ConnectionClosed | Self::ChannelClosed(_))
    }
}

// ============================================================================
// Tests
// ============================================================================
