//! Filter expression language.
//!
//! Subscribers choose which messages they react to with a comma-separated
//! list of filter tokens:
//!
//! ```text
//! expr  := '*' | token (',' token)*
//! token := '*' | 'id:' text | 'type:' text | 'data:' text | text
//! ```
//!
//! | Token | Variant | Matches when |
//! |-------|---------|--------------|
//! | `*` | [`Filter::Wildcard`] | always |
//! | `id:x` | [`Filter::ById`] | `message.id == x` |
//! | `type:x` | [`Filter::ByType`] | `message.type == x` |
//! | `data:x` | [`Filter::ByDataSubstring`] | `message.data` contains `x` |
//! | `x` | [`Filter::ByBareId`] | `message.id == x` |
//!
//! Parsing is total. Unknown prefixes fall through to the bare id form, so
//! a misconfigured filter silently never matches instead of breaking the
//! stream.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use super::message::InboundMessage;

// ============================================================================
// Constants
// ============================================================================

const WILDCARD: &str = "*";
const ID_PREFIX: &str = "id:";
const TYPE_PREFIX: &str = "type:";
const DATA_PREFIX: &str = "data:";

// ============================================================================
// Filter
// ============================================================================

/// A single parsed predicate over an [`InboundMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Filter {
    /// Matches every message.
    Wildcard,

    /// Exact message id (`id:` prefix).
    ById(String),

    /// Exact event type (`type:` prefix).
    ByType(String),

    /// Substring of the payload (`data:` prefix).
    ByDataSubstring(String),

    /// Exact message id written without a prefix.
    ///
    /// Behaves exactly like [`Filter::ById`]; kept separate so the original
    /// text can be reproduced.
    ByBareId(String),
}

impl Filter {
    /// Parses one filter token. Never fails.
    ///
    /// # Example
    ///
    /// ```
    /// use sse_multiplex::Filter;
    ///
    /// assert_eq!(Filter::parse("*"), Filter::Wildcard);
    /// assert_eq!(Filter::parse("type:update"), Filter::ByType("update".into()));
    /// assert_eq!(Filter::parse("user-1"), Filter::ByBareId("user-1".into()));
    /// ```
    #[must_use]
    pub fn parse(token: &str) -> Self {
        if token == WILDCARD {
            Self::Wildcard
        } else if let Some(rest) = token.strip_prefix(ID_PREFIX) {
            Self::ById(rest.to_string())
        } else if let Some(rest) = token.strip_prefix(TYPE_PREFIX) {
            Self::ByType(rest.to_string())
        } else if let Some(rest) = token.strip_prefix(DATA_PREFIX) {
            Self::ByDataSubstring(rest.to_string())
        } else {
            Self::ByBareId(token.to_string())
        }
    }

    /// Evaluates the filter against a message.
    #[inline]
    #[must_use]
    pub fn matches(&self, message: &InboundMessage) -> bool {
        match self {
            Self::Wildcard => true,
            Self::ById(id) | Self::ByBareId(id) => message.id == *id,
            Self::ByType(event_type) => message.event_type == *event_type,
            Self::ByDataSubstring(needle) => message.data.contains(needle.as_str()),
        }
    }

    /// Returns the named event type this filter needs a listener for.
    #[inline]
    #[must_use]
    pub fn event_type(&self) -> Option<&str> {
        match self {
            Self::ByType(event_type) => Some(event_type),
            _ => None,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard => f.write_str(WILDCARD),
            Self::ById(id) => write!(f, "{ID_PREFIX}{id}"),
            Self::ByType(event_type) => write!(f, "{TYPE_PREFIX}{event_type}"),
            Self::ByDataSubstring(needle) => write!(f, "{DATA_PREFIX}{needle}"),
            Self::ByBareId(id) => f.write_str(id),
        }
    }
}

// ============================================================================
// FilterList
// ============================================================================

/// An ordered list of filters combined with logical OR.
///
/// An empty expression means "everything", same as `*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterList {
    filters: Vec<Filter>,
}

impl FilterList {
    /// Parses a comma-separated filter expression.
    ///
    /// Tokens are trimmed of surrounding whitespace after splitting.
    #[must_use]
    pub fn parse(expr: &str) -> Self {
        let expr = expr.trim();
        if expr.is_empty() || expr == WILDCARD {
            return Self::wildcard();
        }

        Self {
            filters: expr.split(',').map(|token| Filter::parse(token.trim())).collect(),
        }
    }

    /// Returns a list that matches every message.
    #[inline]
    #[must_use]
    pub fn wildcard() -> Self {
        Self {
            filters: vec![Filter::Wildcard],
        }
    }

    /// Returns `true` if any filter matches the message.
    #[inline]
    #[must_use]
    pub fn matches(&self, message: &InboundMessage) -> bool {
        self.filters.iter().any(|filter| filter.matches(message))
    }

    /// Iterates over named event types referenced by `type:` filters.
    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().filter_map(Filter::event_type)
    }

    /// Returns the parsed filters in expression order.
    #[inline]
    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Returns `true` if the list is exactly the wildcard.
    #[inline]
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self.filters.as_slice(), [Filter::Wildcard])
    }
}

impl From<Vec<Filter>> for FilterList {
    fn from(filters: Vec<Filter>) -> Self {
        if filters.is_empty() {
            Self::wildcard()
        } else {
            Self { filters }
        }
    }
}

impl fmt::Display for FilterList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, filter) in self.filters.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(f, "{filter}")?;
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

    use proptest::prelude::*;

    fn message(id: &str, event_type: &str, data: &str) -> InboundMessage {
        InboundMessage::new(id, event_type, data)
    }

    #[test]
    fn test_parse_precedence() {
        assert_eq!(Filter::parse("*"), Filter::Wildcard);
        assert_eq!(Filter::parse("id:a"), Filter::ById("a".into()));
        assert_eq!(Filter::parse("type:a"), Filter::ByType("a".into()));
        assert_eq!(Filter::parse("data:a"), Filter::ByDataSubstring("a".into()));
        assert_eq!(Filter::parse("a"), Filter::ByBareId("a".into()));
        assert_eq!(Filter::parse(""), Filter::ByBareId(String::new()));
    }

    #[test]
    fn test_unknown_prefix_falls_back_to_bare_id() {
        assert_eq!(Filter::parse("event:x"), Filter::ByBareId("event:x".into()));
        assert_eq!(Filter::parse("**"), Filter::ByBareId("**".into()));
        assert_eq!(Filter::parse("ID:x"), Filter::ByBareId("ID:x".into()));
    }

    #[test]
    fn test_prefix_with_empty_rest() {
        assert_eq!(Filter::parse("id:"), Filter::ById(String::new()));
        assert!(Filter::parse("data:").matches(&message("", "message", "")));
    }

    #[test]
    fn test_bare_id_scenario() {
        let msg = message("user-update", "message", "<div>X</div>");
        assert!(FilterList::parse("user-update").matches(&msg));
        assert!(!FilterList::parse("type:user-update").matches(&msg));
    }

    #[test]
    fn test_named_type_scenario() {
        let msg = message("", "notification", "hi");
        assert!(FilterList::parse("type:notification").matches(&msg));
        assert!(FilterList::parse("data:hi").matches(&msg));
        assert!(!FilterList::parse("id:notification").matches(&msg));
    }

    #[test]
    fn test_wildcard_matches_empty_data() {
        let list = FilterList::parse("*");
        assert!(list.is_wildcard());
        assert!(list.matches(&message("", "message", "")));
        assert!(list.matches(&message("x", "custom", "payload")));
    }

    #[test]
    fn test_empty_expression_is_wildcard() {
        assert!(FilterList::parse("").is_wildcard());
        assert!(FilterList::parse("   ").is_wildcard());
    }

    #[test]
    fn test_list_is_logical_or() {
        let list = FilterList::parse("id:a, type:ping ,data:needle");
        assert_eq!(list.filters().len(), 3);
        assert!(list.matches(&message("a", "message", "")));
        assert!(list.matches(&message("", "ping", "")));
        assert!(list.matches(&message("", "message", "hay needle hay")));
        assert!(!list.matches(&message("b", "message", "hay")));
    }

    #[test]
    fn test_event_types() {
        let list = FilterList::parse("type:a,id:b,type:c");
        let types: Vec<_> = list.event_types().collect();
        assert_eq!(types, vec!["a", "c"]);
    }

    #[test]
    fn test_display_reproduces_expression() {
        let list = FilterList::parse("id:a,type:b,data:c,d");
        assert_eq!(list.to_string(), "id:a,type:b,data:c,d");
    }

    proptest! {
        #[test]
        fn prop_parse_is_total(token in ".*") {
            let filter = Filter::parse(&token);
            // Rendering then reparsing lands on the same filter.
            prop_assert_eq!(Filter::parse(&filter.to_string()), filter);
        }

        #[test]
        fn prop_by_id_equals_bare_id(
            value in "[a-z0-9:-]{0,8}",
            id in "[a-z0-9:-]{0,8}",
            event_type in "[a-z]{0,8}",
            data in ".{0,16}",
        ) {
            let msg = message(&id, &event_type, &data);
            prop_assert_eq!(
                Filter::ById(value.clone()).matches(&msg),
                Filter::ByBareId(value).matches(&msg)
            );
        }

        #[test]
        fn prop_wildcard_always_matches(
            id in ".{0,8}",
            event_type in ".{0,8}",
            data in ".{0,16}",
        ) {
            prop_assert!(Filter::Wildcard.matches(&message(&id, &event_type, &data)));
        }
    }
}
