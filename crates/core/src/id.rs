//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of an inventory unit.
///
/// Unit ids are the human-readable labels printed on cartons and pallets
/// (e.g. `BP-001`), so they are strings rather than UUIDs. Ordering is used
/// for deterministic lock acquisition when two units are touched together.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    /// Parse a unit label. Must be non-empty and contain only `[A-Z0-9-_]`
    /// after upper-casing.
    pub fn new(value: impl AsRef<str>) -> Result<Self, DomainError> {
        let value = value.as_ref().trim().to_ascii_uppercase();
        if value.is_empty() {
            return Err(DomainError::invalid_id("UnitId: empty"));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DomainError::invalid_id(format!(
                "UnitId: '{value}' contains characters outside [A-Z0-9-_]"
            )));
        }
        Ok(Self(value))
    }

    /// Build the `n`-th generated id for a prefix, e.g. `IU-000042`.
    pub fn sequential(prefix: &str, n: u64) -> Result<Self, DomainError> {
        Self::new(format!("{prefix}-{n:06}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for UnitId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UnitId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Identifier of a reassignment record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReassignmentId(Uuid);

impl ReassignmentId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
    /// for determinism.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReassignmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ReassignmentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for ReassignmentId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for ReassignmentId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s)
            .map_err(|e| DomainError::invalid_id(format!("ReassignmentId: {e}")))?;
        Ok(Self(uuid))
    }
}

/// The operator (or system process) a mutation is attributed to.
///
/// Free-form display name as shown on terminals, e.g. `"Ayesha (Receiving)"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Actor(String);

impl Actor {
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("actor cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Actor used for mutations not triggered by a person.
    pub fn system() -> Self {
        Self("system".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Actor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_id_is_normalised_to_upper_case() {
        let id = UnitId::new(" bp-001 ").unwrap();
        assert_eq!(id.as_str(), "BP-001");
    }

    #[test]
    fn unit_id_rejects_whitespace_inside() {
        assert!(matches!(UnitId::new("BP 001"), Err(DomainError::InvalidId(_))));
        assert!(matches!(UnitId::new(""), Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn sequential_ids_sort_in_creation_order() {
        let a = UnitId::sequential("IU", 9).unwrap();
        let b = UnitId::sequential("IU", 10).unwrap();
        assert_eq!(a.as_str(), "IU-000009");
        assert!(a < b);
    }

    #[test]
    fn actor_is_trimmed_and_non_empty() {
        assert_eq!(Actor::new("  Bilal ").unwrap().as_str(), "Bilal");
        assert!(Actor::new("   ").is_err());
    }

    #[test]
    fn unit_id_serializes_transparently() {
        let id = UnitId::new("BP-002").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"BP-002\"");
    }
}
