//! Branded identifiers.
//!
//! Slack identifiers are opaque strings (`D06ABC...` for a DM channel,
//! `U02XYZ...` for a user). Wrapping them keeps a user id from being passed
//! where a conversation id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! slack_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier as returned by the API.
            pub fn from_raw(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is the empty string.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_owned()))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

slack_id!(
    /// Identifier of a direct-message conversation (Slack channel id).
    ConversationId
);
slack_id!(
    /// Identifier of a Slack user.
    UserId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_raw_value() {
        let id = ConversationId::from_raw("D06ABC");
        assert_eq!(id.to_string(), "D06ABC");
        assert_eq!(id.as_str(), "D06ABC");
    }

    #[test]
    fn empty_user_detected() {
        assert!(UserId::default().is_empty());
        assert!(!UserId::from("U1").is_empty());
    }

    #[test]
    fn serde_is_transparent() {
        let id = UserId::from_raw("U02XYZ");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"U02XYZ\"");
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
