//! Identifier newtypes for Confab.
//!
//! Every persistent identifier is issued by the server and treated as an
//! opaque string. The only client-generated identifier is the temporary
//! item id (`temp-<millis>`) used while an optimistic exchange awaits its
//! server-assigned id.

use serde::{Deserialize, Serialize};

use std::fmt;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap a raw identifier string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id! {
    /// Unique identifier for a conversation.
    ChatId
}

string_id! {
    /// Identifier for a single question/answer item within a conversation.
    ///
    /// Either a server-issued history id or a client-generated temporary id
    /// created by [`ItemId::temp`].
    ItemId
}

string_id! {
    /// Identifier for a feedback record attached to an item.
    FeedbackId
}

string_id! {
    /// Opaque visitor identity issued by the server and persisted locally.
    VisitorId
}

impl ItemId {
    const TEMP_PREFIX: &'static str = "temp-";

    /// Create a temporary identifier from a millisecond timestamp.
    pub fn temp(millis: i64) -> Self {
        Self(format!("{}{millis}", Self::TEMP_PREFIX))
    }

    /// Whether this id is a client-generated placeholder awaiting
    /// reconciliation with a server id.
    pub fn is_temp(&self) -> bool {
        self.0.starts_with(Self::TEMP_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_id_format() {
        let id = ItemId::temp(1_700_000_000_123);
        assert_eq!(id.as_str(), "temp-1700000000123");
        assert!(id.is_temp());
    }

    #[test]
    fn test_server_id_is_not_temp() {
        let id = ItemId::new("665f1c2e9b1d8a0012345678");
        assert!(!id.is_temp());
    }

    #[test]
    fn test_serde_transparent() {
        let id = ChatId::new("c1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"c1\"");
        let parsed: ChatId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_display_roundtrip() {
        let id = VisitorId::new("v-42");
        assert_eq!(id.to_string(), "v-42");
        assert_eq!(VisitorId::from("v-42"), id);
    }
}
