//! Inbound message type.
//!
//! Every frame read off the wire is normalized into an [`InboundMessage`]
//! before it reaches the dispatch engine.
//!
//! # Wire Format
//!
//! ```text
//! id: user-update
//! event: notification
//! data: <div>X</div>
//!
//! ```
//!
//! Frames without an `event:` field carry the default type `"message"`.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Event type used when a frame has no `event:` field.
pub const DEFAULT_EVENT_TYPE: &str = "message";

// ============================================================================
// InboundMessage
// ============================================================================

/// One normalized Server-Sent Events frame.
///
/// `event_type` is never empty: absence normalizes to
/// [`DEFAULT_EVENT_TYPE`].
///
/// # Format
///
/// ```json
/// { "id": "user-update", "type": "message", "data": "<div>X</div>" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Frame id (`id:` field), possibly empty.
    #[serde(default)]
    pub id: String,

    /// Named event type (`event:` field).
    #[serde(rename = "type", default = "default_event_type")]
    pub event_type: String,

    /// Frame payload (`data:` lines joined by newlines), possibly empty.
    #[serde(default)]
    pub data: String,
}

fn default_event_type() -> String {
    DEFAULT_EVENT_TYPE.to_string()
}

impl InboundMessage {
    /// Creates a message, normalizing an empty event type.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        event_type: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        let event_type = event_type.into();
        Self {
            id: id.into(),
            event_type: if event_type.is_empty() {
                default_event_type()
            } else {
                event_type
            },
            data: data.into(),
        }
    }

    /// Creates an unnamed, id-less message carrying only data.
    #[inline]
    #[must_use]
    pub fn data_only(data: impl Into<String>) -> Self {
        Self::new("", DEFAULT_EVENT_TYPE, data)
    }

    /// Returns `true` if the frame used the default event type.
    #[inline]
    #[must_use]
    pub fn is_default_type(&self) -> bool {
        self.event_type == DEFAULT_EVENT_TYPE
    }
}

impl From<eventsource_stream::Event> for InboundMessage {
    fn from(event: eventsource_stream::Event) -> Self {
        Self::new(event.id, event.event, event.data)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_type_normalized() {
        let message = InboundMessage::new("1", "", "hello");
        assert_eq!(message.event_type, "message");
        assert!(message.is_default_type());
    }

    #[test]
    fn test_named_type_kept() {
        let message = InboundMessage::new("", "notification", "hi");
        assert_eq!(message.event_type, "notification");
        assert!(!message.is_default_type());
    }

    #[test]
    fn test_deserialize_missing_type() {
        let message: InboundMessage =
            serde_json::from_str(r#"{"id":"a","data":"b"}"#).expect("parse message");
        assert_eq!(message.event_type, DEFAULT_EVENT_TYPE);
        assert_eq!(message.id, "a");
        assert_eq!(message.data, "b");
    }

    #[test]
    fn test_from_eventsource_event() {
        let event = eventsource_stream::Event {
            event: String::new(),
            data: "<div>X</div>".to_string(),
            id: "user-update".to_string(),
            retry: None,
        };

        let message = InboundMessage::from(event);
        assert_eq!(message.id, "user-update");
        assert_eq!(message.event_type, "message");
        assert_eq!(message.data, "<div>X</div>");
    }
}
