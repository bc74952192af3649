//! Warehouse error model.
//!
//! Every rejection carries enough detail (expected vs. actual state, expected
//! vs. scanned code, capacity figures) for an operator to correct the input
//! at the terminal.

use thiserror::Error;

use solewms_core::{DomainError, UnitId};

use crate::bin::BinCode;
use crate::unit::{LifecycleEvent, UnitState};

/// Result type used across the warehouse crates.
pub type WarehouseResult<T> = Result<T, WarehouseError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WarehouseError {
    #[error(
        "bin {bin_code} capacity exceeded (capacity {capacity}, occupied {occupied}, requested {requested})"
    )]
    CapacityExceeded {
        bin_code: BinCode,
        capacity: u32,
        occupied: u32,
        requested: u32,
    },

    #[error("invalid release from bin {bin_code} (occupied {occupied}, requested {requested})")]
    InvalidRelease {
        bin_code: BinCode,
        occupied: u32,
        requested: u32,
    },

    #[error("unit {unit_id} cannot '{event}' while {from}")]
    IllegalTransition {
        unit_id: UnitId,
        from: UnitState,
        event: LifecycleEvent,
    },

    #[error("scan mismatch for unit {unit_id}: expected sku {expected_sku} or unit id, scanned '{scanned}'")]
    ScanMismatch {
        unit_id: UnitId,
        expected_sku: String,
        scanned: String,
    },

    #[error("unit {unit_id} cannot be swapped with itself")]
    SelfSwap { unit_id: UnitId },

    #[error("unit {0} not found")]
    UnitNotFound(UnitId),

    #[error("bin {0} not found")]
    BinNotFound(BinCode),

    #[error("unit {0} already exists")]
    DuplicateUnit(UnitId),

    #[error("bin {0} already registered")]
    DuplicateBin(BinCode),

    /// Archived or under maintenance; takes no new stock.
    #[error("bin {bin_code} cannot take stock: {reason}")]
    BinUnavailable { bin_code: BinCode, reason: String },

    #[error("bin {bin_code} is not empty (occupied {occupied})")]
    BinNotEmpty { bin_code: BinCode, occupied: u32 },

    #[error("incompatible swap: {0}")]
    IncompatibleSwap(String),

    /// Lost a race and the precondition no longer holds. Retryable after
    /// re-reading current state.
    #[error("concurrent modification: {0}")]
    ConcurrentModification(String),

    #[error("validation failed: {0}")]
    Validation(String),

    /// A thread panicked while holding a store lock. Not retryable.
    #[error("{0} lock poisoned")]
    LockPoisoned(String),

    /// The activity ledger could not be written; nothing was committed.
    #[error("activity ledger unavailable: {0}")]
    Ledger(String),
}

impl WarehouseError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn concurrent(msg: impl Into<String>) -> Self {
        Self::ConcurrentModification(msg.into())
    }

    pub fn poisoned(what: impl Into<String>) -> Self {
        Self::LockPoisoned(what.into())
    }

    /// Whether the caller may retry after re-reading state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification(_) | Self::Ledger(_))
    }
}

impl From<DomainError> for WarehouseError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => WarehouseError::Validation(msg),
            DomainError::InvalidId(msg) => WarehouseError::Validation(msg),
            DomainError::Conflict(msg) => WarehouseError::ConcurrentModification(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_transition_message_names_state_and_event() {
        let err = WarehouseError::IllegalTransition {
            unit_id: UnitId::new("BP-001").unwrap(),
            from: UnitState::Arrived,
            event: LifecycleEvent::ConfirmPick,
        };
        assert_eq!(err.to_string(), "unit BP-001 cannot 'confirm pick' while Arrived");
    }

    #[test]
    fn domain_conflict_maps_to_concurrent_modification() {
        let err: WarehouseError = DomainError::conflict("stale").into();
        assert!(matches!(err, WarehouseError::ConcurrentModification(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn poisoned_lock_is_not_retryable() {
        let err = WarehouseError::poisoned("bin");
        assert_eq!(err.to_string(), "bin lock poisoned");
        assert!(!err.is_retryable());
    }
}
