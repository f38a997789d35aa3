//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Invalid direction value.
    #[error("invalid direction: {value}")]
    InvalidDirection { value: String },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated participant identifier.
    ///
    /// Participant IDs must be non-empty strings. Upstream gateways typically
    /// supply a numeric snowflake here, but the ledger treats it as opaque.
    ParticipantId, "participant ID"
);

define_string_id!(
    /// A validated channel name.
    ///
    /// Channel names must be non-empty strings. They identify the voice
    /// channel whose occupancy is being tracked.
    ChannelName, "channel name"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_id_rejects_empty() {
        assert!(ParticipantId::new("").is_err());
        assert!(ParticipantId::new("1234").is_ok());
    }

    #[test]
    fn channel_name_rejects_empty() {
        assert!(ChannelName::new("").is_err());
        assert!(ChannelName::new("general").is_ok());
    }

    #[test]
    fn channel_name_serde_roundtrip() {
        let name = ChannelName::new("general").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"general\"");
        let parsed: ChannelName = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, name);
    }

    #[test]
    fn channel_name_serde_rejects_empty() {
        let result: Result<ChannelName, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn participant_id_as_ref() {
        let id = ParticipantId::new("42").unwrap();
        let s: &str = id.as_ref();
        assert_eq!(s, "42");
    }
}
