//! Display-name lookup.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{ParticipantId, ScopeId};

/// Name lookup errors. Never fatal: the participant ID stays the label.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The resolver has no name for the participant.
    #[error("no display name known for {participant}")]
    Unknown { participant: ParticipantId },

    /// The lookup itself failed.
    #[error("display name lookup failed: {0}")]
    Lookup(String),
}

/// Resolves a participant's human-readable label within a scope.
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve(
        &self,
        scope: &ScopeId,
        participant: &ParticipantId,
    ) -> Result<String, ResolveError>;
}

/// Resolver backed by a fixed participant ID → name table.
///
/// The same name is returned in every scope.
#[derive(Debug, Clone, Default)]
pub struct StaticNameResolver {
    names: BTreeMap<String, String>,
}

impl StaticNameResolver {
    pub const fn new(names: BTreeMap<String, String>) -> Self {
        Self { names }
    }
}

#[async_trait]
impl NameResolver for StaticNameResolver {
    async fn resolve(
        &self,
        _scope: &ScopeId,
        participant: &ParticipantId,
    ) -> Result<String, ResolveError> {
        self.names
            .get(participant.as_str())
            .cloned()
            .ok_or_else(|| ResolveError::Unknown {
                participant: participant.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_resolver_looks_up_table() {
        let resolver =
            StaticNameResolver::new(BTreeMap::from([("1".to_string(), "Ada".to_string())]));
        let scope = ScopeId::new("g").unwrap();

        let name = resolver
            .resolve(&scope, &ParticipantId::new("1").unwrap())
            .await
            .unwrap();
        assert_eq!(name, "Ada");

        let err = resolver
            .resolve(&scope, &ParticipantId::new("2").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no display name known for 2");
    }
}
