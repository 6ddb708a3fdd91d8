//! Type-safe ID wrappers.
//!
//! The backend hands out numeric ids; everything downstream compares them as
//! strings, so each wrapper accepts either form on the wire.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Int(i64),
    Str(String),
}

fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match WireId::deserialize(deserializer)? {
        WireId::Int(n) => n.to_string(),
        WireId::Str(s) => s,
    })
}

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new ID from a string.
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            /// Check if this ID is empty or "0".
            pub fn is_empty(&self) -> bool {
                self.0.is_empty() || self.0 == "0"
            }

            /// Get the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Numeric form, as the API expects in request bodies.
            pub fn as_number(&self) -> Option<i64> {
                self.0.trim().parse().ok()
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserialize_id(deserializer).map($name)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_owned())
            }
        }

        impl From<&String> for $name {
            fn from(s: &String) -> Self {
                $name(s.clone())
            }
        }

        impl From<i64> for $name {
            fn from(n: i64) -> Self {
                $name(n.to_string())
            }
        }

        impl From<i32> for $name {
            fn from(n: i32) -> Self {
                $name(n.to_string())
            }
        }

        impl From<&$name> for $name {
            fn from(id: &$name) -> Self {
                id.clone()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name("0".to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(UserId, "A user identifier.");
define_id!(ItemId, "A marketplace item (listing) identifier.");
define_id!(GroupId, "A conversation (message group) identifier.");
define_id!(MessageId, "A message identifier, server-assigned or local.");
