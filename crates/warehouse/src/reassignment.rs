//! Two-way bin swaps between stored units.
//!
//! A swap exchanges the two units' `BinAssignment`s wholesale, slot quantity
//! included, so each bin's occupancy is numerically unchanged and still equals
//! the sum of its units' slots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use solewms_core::{Actor, ReassignmentId, UnitId};

use crate::bin::{Bin, BinCode, BinKind};
use crate::error::{WarehouseError, WarehouseResult};
use crate::unit::{BinAssignment, InventoryUnit, LifecycleEvent, UnitAction, UnitCommand};

/// Append-only provenance of one swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignmentRecord {
    pub reassignment_id: ReassignmentId,
    pub unit_id_a: UnitId,
    pub unit_id_b: UnitId,
    pub from_bin_a: BinCode,
    pub to_bin_a: BinCode,
    pub from_bin_b: BinCode,
    pub to_bin_b: BinCode,
    pub reason: String,
    pub performed_by: Actor,
    pub timestamp: DateTime<Utc>,
}

impl ReassignmentRecord {
    pub fn involves(&self, unit_id: &UnitId) -> bool {
        &self.unit_id_a == unit_id || &self.unit_id_b == unit_id
    }
}

/// Whether swaps are checked against destination bin compatibility.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapPolicy {
    /// Reject swaps where a unit's size class differs from its destination
    /// storage bin, or its quantity exceeds the destination capacity.
    pub strict: bool,
}

/// A validated swap, ready to be applied to both units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPlan {
    pub reassignment_id: ReassignmentId,
    pub unit_a: UnitId,
    pub unit_b: UnitId,
    pub assignment_a: BinAssignment,
    pub assignment_b: BinAssignment,
    pub reason: String,
    /// Set when a permissive swap moves a unit into a bin of another size class.
    pub size_mismatch: bool,
}

impl SwapPlan {
    pub fn same_bin(&self) -> bool {
        self.assignment_a.bin_code == self.assignment_b.bin_code
    }

    pub fn command_for_a(&self, actor: &Actor, at: DateTime<Utc>) -> UnitCommand {
        UnitCommand {
            unit_id: self.unit_a.clone(),
            actor: actor.clone(),
            occurred_at: at,
            action: UnitAction::Reassign {
                to: self.assignment_b.clone(),
                reassignment_id: self.reassignment_id,
            },
        }
    }

    pub fn command_for_b(&self, actor: &Actor, at: DateTime<Utc>) -> UnitCommand {
        UnitCommand {
            unit_id: self.unit_b.clone(),
            actor: actor.clone(),
            occurred_at: at,
            action: UnitAction::Reassign {
                to: self.assignment_a.clone(),
                reassignment_id: self.reassignment_id,
            },
        }
    }

    pub fn record(&self, actor: &Actor, at: DateTime<Utc>) -> ReassignmentRecord {
        ReassignmentRecord {
            reassignment_id: self.reassignment_id,
            unit_id_a: self.unit_a.clone(),
            unit_id_b: self.unit_b.clone(),
            from_bin_a: self.assignment_a.bin_code.clone(),
            to_bin_a: self.assignment_b.bin_code.clone(),
            from_bin_b: self.assignment_b.bin_code.clone(),
            to_bin_b: self.assignment_a.bin_code.clone(),
            reason: self.reason.clone(),
            performed_by: actor.clone(),
            timestamp: at,
        }
    }
}

fn swappable_assignment(unit: &InventoryUnit) -> WarehouseResult<BinAssignment> {
    match unit.assignment() {
        Some(a) if unit.is_swappable() => Ok(a.clone()),
        _ => Err(WarehouseError::IllegalTransition {
            unit_id: unit.unit_id().clone(),
            from: unit.state(),
            event: LifecycleEvent::Reassign,
        }),
    }
}

fn fits_destination(unit: &InventoryUnit, dest: &Bin) -> Result<(), String> {
    if dest.kind() == BinKind::Storage && unit.size_class() != dest.size_class() {
        return Err(format!(
            "unit {} is size {} but bin {} holds size {}",
            unit.unit_id(),
            unit.size_class(),
            dest.code(),
            dest.size_class()
        ));
    }
    if unit.quantity() > dest.capacity() {
        return Err(format!(
            "unit {} quantity {} exceeds bin {} capacity {}",
            unit.unit_id(),
            unit.quantity(),
            dest.code(),
            dest.capacity()
        ));
    }
    Ok(())
}

/// Validate a swap of `a` and `b`, whose current bins are `bin_a` and `bin_b`.
pub fn plan_swap(
    a: &InventoryUnit,
    b: &InventoryUnit,
    bin_a: &Bin,
    bin_b: &Bin,
    reason: &str,
    policy: SwapPolicy,
    reassignment_id: ReassignmentId,
) -> WarehouseResult<SwapPlan> {
    if a.unit_id() == b.unit_id() {
        return Err(WarehouseError::SelfSwap {
            unit_id: a.unit_id().clone(),
        });
    }
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(WarehouseError::validation("reassignment reason cannot be empty"));
    }

    let assignment_a = swappable_assignment(a)?;
    let assignment_b = swappable_assignment(b)?;

    if &assignment_a.bin_code != bin_a.code() || &assignment_b.bin_code != bin_b.code() {
        return Err(WarehouseError::concurrent(format!(
            "bins of {} and {} changed while planning the swap",
            a.unit_id(),
            b.unit_id()
        )));
    }

    let a_into_b = fits_destination(a, bin_b);
    let b_into_a = fits_destination(b, bin_a);
    if policy.strict {
        a_into_b.clone().map_err(WarehouseError::IncompatibleSwap)?;
        b_into_a.clone().map_err(WarehouseError::IncompatibleSwap)?;
    }

    Ok(SwapPlan {
        reassignment_id,
        unit_a: a.unit_id().clone(),
        unit_b: b.unit_id().clone(),
        assignment_a,
        assignment_b,
        reason: reason.to_string(),
        size_mismatch: a_into_b.is_err() || b_into_a.is_err(),
    })
}
