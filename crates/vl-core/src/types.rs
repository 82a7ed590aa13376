//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Invalid alternation policy value.
    #[error("invalid alternation policy: {value}")]
    InvalidAlternationPolicy { value: String },
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
    /// Identifies a user that can be present in a voice channel.
    ParticipantId, "participant ID"
);

define_string_id!(
    /// A validated scope identifier.
    ///
    /// A scope groups resources, e.g. the server (guild) a channel belongs to.
    ScopeId, "scope ID"
);

define_string_id!(
    /// A validated resource identifier.
    ///
    /// Identifies a trackable resource within its scope, e.g. a voice channel.
    ResourceId, "resource ID"
);

/// The key a tracking session is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub scope: ScopeId,
    pub resource: ResourceId,
}

impl ResourceKey {
    pub const fn new(scope: ScopeId, resource: ResourceId) -> Self {
        Self { scope, resource }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.scope, self.resource)
    }
}

/// Identity of one tracking session.
///
/// A resource can be tracked many times over the life of the process; the
/// session ID tells those runs apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random session ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a participant log treats transitions that do not alternate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlternationPolicy {
    /// Append every transition as received.
    Trust,
    /// Drop transitions that repeat the participant's current state.
    #[default]
    Coalesce,
    /// Reject repeated transitions and timestamps that go backwards.
    Strict,
}

impl AlternationPolicy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trust => "trust",
            Self::Coalesce => "coalesce",
            Self::Strict => "strict",
        }
    }
}

impl fmt::Display for AlternationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AlternationPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trust" => Ok(Self::Trust),
            "coalesce" => Ok(Self::Coalesce),
            "strict" => Ok(Self::Strict),
            _ => Err(ValidationError::InvalidAlternationPolicy {
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_id_rejects_empty() {
        assert!(ParticipantId::new("").is_err());
        assert!(ParticipantId::new("123456789").is_ok());
    }

    #[test]
    fn test_empty_id_error_names_field() {
        let err = ResourceId::new("").unwrap_err();
        assert_eq!(err.to_string(), "resource ID cannot be empty");
    }

    #[test]
    fn test_scope_id_serde_rejects_empty() {
        let result: Result<ScopeId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_resource_key_display_joins_scope_and_resource() {
        let key = ResourceKey::new(
            ScopeId::new("guild").unwrap(),
            ResourceId::new("voice").unwrap(),
        );
        assert_eq!(key.to_string(), "guild-voice");
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn test_alternation_policy_from_str() {
        assert_eq!(
            "strict".parse::<AlternationPolicy>().unwrap(),
            AlternationPolicy::Strict
        );
        assert_eq!(
            "trust".parse::<AlternationPolicy>().unwrap(),
            AlternationPolicy::Trust
        );
        assert!("lenient".parse::<AlternationPolicy>().is_err());
    }

    #[test]
    fn test_alternation_policy_defaults_to_coalesce() {
        assert_eq!(AlternationPolicy::default(), AlternationPolicy::Coalesce);
        let json = serde_json::to_string(&AlternationPolicy::Coalesce).unwrap();
        assert_eq!(json, "\"coalesce\"");
    }
}
