//! Versioned records and the decide/record/evolve commit cycle.
//!
//! Every accepted transition bumps a record's version by one. Operator
//! terminals send the version they last saw; a mismatch means someone else
//! moved the record first.

use crate::error::{DomainError, DomainResult};

/// A record with an identity and a transition counter.
pub trait AggregateRoot {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    fn id(&self) -> &Self::Id;

    /// Number of events applied since creation.
    fn version(&self) -> u64;

    /// Reject the command when the caller saw a different version.
    fn ensure_version(&self, expected: ExpectedVersion) -> DomainResult<()> {
        let actual = self.version();
        match expected {
            ExpectedVersion::Exact(v) if v != actual => Err(DomainError::conflict(format!(
                "{} is at version {actual}, caller expected {v}",
                self.id()
            ))),
            _ => Ok(()),
        }
    }
}

/// Version a caller claims to have seen.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ExpectedVersion {
    /// Scanner double-fires and operator retries skip the check.
    #[default]
    Any,
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }
}

/// An absent version on a request means "don't check".
impl From<Option<u64>> for ExpectedVersion {
    fn from(version: Option<u64>) -> Self {
        version.map_or(ExpectedVersion::Any, ExpectedVersion::Exact)
    }
}

/// Pure decision and evolution. No IO, no locks, no clocks: timestamps come
/// in on the command.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Must bump `version()` by one.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events a command produces without touching state.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Decide, let `record` persist the pending events (bin effects, audit
    /// entries), then apply them. If `record` fails nothing is applied.
    fn commit_with<E, F>(&mut self, command: &Self::Command, record: F) -> Result<Vec<Self::Event>, E>
    where
        Self: Sized,
        E: From<Self::Error>,
        F: FnOnce(&Self, &[Self::Event]) -> Result<(), E>,
    {
        let events = self.handle(command)?;
        record(self, &events)?;
        for event in &events {
            self.apply(event);
        }
        Ok(events)
    }
}
