//! Client configuration.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use sse_multiplex::SseConfig;
//!
//! let config = SseConfig::new()
//!     .with_base_delay(Duration::from_millis(250))
//!     .with_event_type("presence")
//!     .with_credentials(false);
//!
//! assert!(config.validate().is_ok());
//! ```
//!
//! # JSON Form
//!
//! ```json
//! {
//!   "baseDelayMs": 500,
//!   "maxRetry": 128,
//!   "defaultEventTypes": ["message", "update", "notification", "error"],
//!   "withCredentials": true
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::DEFAULT_EVENT_TYPE;

// ============================================================================
// Constants
// ============================================================================

/// Wait per retry step.
const DEFAULT_BASE_DELAY_MS: u64 = 500;

/// Retry counter cap (128 × 500ms = 64s).
const DEFAULT_MAX_RETRY: u32 = 128;

/// Event types every transport listens for from the start.
const DEFAULT_EVENT_TYPES: &[&str] = &[DEFAULT_EVENT_TYPE, "update", "notification", "error"];

// ============================================================================
// SseConfig
// ============================================================================

/// Reconnection policy and transport defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SseConfig {
    /// Milliseconds to wait per retry step.
    pub base_delay_ms: u64,

    /// Upper bound of the retry counter.
    pub max_retry: u32,

    /// Event types listened for on every transport.
    ///
    /// Must contain `"message"`.
    pub default_event_types: Vec<String>,

    /// Send cookies with stream requests.
    pub with_credentials: bool,
}

impl Default for SseConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_retry: DEFAULT_MAX_RETRY,
            default_event_types: DEFAULT_EVENT_TYPES.iter().map(ToString::to_string).collect(),
            with_credentials: true,
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl SseConfig {
    /// Creates the default configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON configuration.
    ///
    /// Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the text is not valid JSON for this shape
    /// - [`Error::Config`] if validation fails
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SseConfig {
    /// Sets the wait per retry step.
    #[inline]
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the retry counter cap.
    #[inline]
    #[must_use]
    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry;
        self
    }

    /// Adds a pre-listened event type.
    #[must_use]
    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        let event_type = event_type.into();
        if !self.default_event_types.contains(&event_type) {
            self.default_event_types.push(event_type);
        }
        self
    }

    /// Replaces the pre-listened event types.
    #[must_use]
    pub fn with_event_types(mut self, types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.default_event_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables credentialed requests.
    #[inline]
    #[must_use]
    pub fn with_credentials(mut self, enabled: bool) -> Self {
        self.with_credentials = enabled;
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl SseConfig {
    /// Wait per retry step.
    #[inline]
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Longest wait the policy can produce.
    #[inline]
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        self.base_delay().saturating_mul(self.max_retry)
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the base delay or retry cap is zero,
    /// or the default event type is not pre-listened.
    pub fn validate(&self) -> Result<()> {
        if self.base_delay_ms == 0 {
            return Err(Error::config("base delay must be positive"));
        }

        if self.max_retry == 0 {
            return Err(Error::config("max retry must be at least 1"));
        }

        if !self.default_event_types.iter().any(|t| t == DEFAULT_EVENT_TYPE) {
            return Err(Error::config(format!(
                "default event types must include \"{DEFAULT_EVENT_TYPE}\""
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SseConfig::default();
        assert_eq!(config.base_delay(), Duration::from_millis(500));
        assert_eq!(config.max_retry, 128);
        assert_eq!(config.max_delay(), Duration::from_secs(64));
        assert!(config.with_credentials);
        assert!(config.default_event_types.contains(&"message".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = SseConfig::new()
            .with_base_delay(Duration::from_millis(100))
            .with_max_retry(8)
            .with_event_type("presence")
            .with_event_type("presence")
            .with_credentials(false);

        assert_eq!(config.base_delay_ms, 100);
        assert_eq!(config.max_retry, 8);
        assert_eq!(
            config
                .default_event_types
                .iter()
                .filter(|t| *t == "presence")
                .count(),
            1
        );
        assert!(!config.with_credentials);
    }

    #[test]
    fn test_base_delay_saturates() {
        let config = SseConfig::new().with_base_delay(Duration::MAX);
        assert_eq!(config.base_delay_ms, u64::MAX);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(SseConfig::new().with_max_retry(0).validate().is_err());
        assert!(
            SseConfig::new()
                .with_base_delay(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(
            SseConfig::new()
                .with_event_types(["update"])
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_from_json_partial() {
        let config = SseConfig::from_json(r#"{"baseDelayMs": 250, "withCredentials": false}"#)
            .expect("valid config");
        assert_eq!(config.base_delay_ms, 250);
        assert_eq!(config.max_retry, 128);
        assert!(!config.with_credentials);
    }

    #[test]
    fn test_from_json_errors() {
        assert!(matches!(
            SseConfig::from_json("not json"),
            Err(Error::Json(_))
        ));
        assert!(matches!(
            SseConfig::from_json(r#"{"maxRetry": 0}"#),
            Err(Error::Config { .. })
        ));
    }
}
