//! Branded ID newtypes for type safety.
//!
//! The registry is a two-level partition keyed by project and channel, and
//! both keys are strings supplied by clients. Distinct newtypes keep a
//! channel name from ever being used where a project key is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Channel used when the client does not name one at handshake time.
pub const DEFAULT_CHANNEL: &str = "default";

macro_rules! branded_string {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from an existing string value.
            #[must_use]
            pub fn from_string(s: String) -> Self {
                Self(s)
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_string! {
    /// Opaque key identifying a tenant project. Supplied by the client at
    /// handshake and validated against the credential directory; never
    /// mutated afterwards.
    ProjectKey
}

branded_string! {
    /// Name of a channel scoped under a project. Channels are created
    /// lazily on first join and destroyed when their member set empties.
    ChannelName
}

impl ChannelName {
    /// Resolve an optional handshake value to a channel name, falling back
    /// to [`DEFAULT_CHANNEL`] when absent or empty.
    #[must_use]
    pub fn or_default(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(name) if !name.is_empty() => Self(name.to_owned()),
            _ => Self(DEFAULT_CHANNEL.to_owned()),
        }
    }
}

/// Unique identifier for one live connection (UUID v7, time-ordered).
///
/// Registry membership and broadcast self-exclusion are keyed on this, not
/// on the transport handle.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Generate a fresh connection ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Return the inner string as a slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_is_uuid_v7() {
        let id = ConnectionId::new();
        let parsed = Uuid::parse_str(id.as_str()).expect("should be valid UUID");
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn connection_ids_are_unique() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn project_key_from_str() {
        let key = ProjectKey::from("proj_abc");
        assert_eq!(key.as_str(), "proj_abc");
        assert_eq!(format!("{key}"), "proj_abc");
    }

    #[test]
    fn project_key_into_string() {
        let key = ProjectKey::from("k1");
        let s: String = key.into();
        assert_eq!(s, "k1");
    }

    #[test]
    fn channel_or_default_with_name() {
        let ch = ChannelName::or_default(Some("room1"));
        assert_eq!(ch.as_str(), "room1");
    }

    #[test]
    fn channel_or_default_missing() {
        let ch = ChannelName::or_default(None);
        assert_eq!(ch.as_str(), DEFAULT_CHANNEL);
    }

    #[test]
    fn channel_or_default_empty_string() {
        let ch = ChannelName::or_default(Some(""));
        assert_eq!(ch.as_str(), DEFAULT_CHANNEL);
    }

    #[test]
    fn channel_or_default_whitespace_only() {
        let ch = ChannelName::or_default(Some("   "));
        assert_eq!(ch.as_str(), DEFAULT_CHANNEL);
    }

    #[test]
    fn channel_or_default_trims() {
        let ch = ChannelName::or_default(Some("  design  "));
        assert_eq!(ch.as_str(), "design");
    }

    #[test]
    fn serde_transparent() {
        let key = ProjectKey::from("serde-me");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"serde-me\"");
        let back: ProjectKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn hash_and_eq_in_map_keys() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        let _ = map.insert(ChannelName::from("room1"), 1);
        let _ = map.insert(ChannelName::from("room1"), 2);
        assert_eq!(map.len(), 1);
        assert_eq!(map[&ChannelName::from("room1")], 2);
    }

    #[test]
    fn project_and_channel_are_distinct_types() {
        // Compile-time property; this test just documents the intent.
        let p = ProjectKey::from("x");
        let c = ChannelName::from("x");
        assert_eq!(p.as_str(), c.as_str());
    }
}
