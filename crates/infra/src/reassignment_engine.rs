//! Reassignment Engine: atomic two-way bin swaps.
//!
//! Lock order is both units (ascending `UnitId`), then both bins (ascending
//! `BinCode`), then the ledger. Bins are locked even though their occupancy
//! does not change, so no reservation or pick can interleave with the swap.

use std::sync::Arc;

use solewms_core::{Actor, Aggregate, ReassignmentId, UnitId};
use solewms_warehouse::{
    ActivityAction, BinCode, InventoryUnit, LifecycleEvent, NewActivity, ReassignmentRecord, SwapPolicy,
    WarehouseError, WarehouseResult, plan_swap,
};

use crate::activity_ledger::ActivityLedger;
use crate::bin_registry::BinRegistry;
use crate::clock::Clock;
use crate::unit_store::{UnitStore, lock_unit};

#[derive(Debug)]
pub struct ReassignmentEngine {
    units: Arc<UnitStore>,
    registry: Arc<BinRegistry>,
    ledger: Arc<dyn ActivityLedger>,
    clock: Arc<dyn Clock>,
    policy: SwapPolicy,
}

fn current_bin(unit: &InventoryUnit) -> WarehouseResult<BinCode> {
    unit.current_bin_code()
        .cloned()
        .ok_or_else(|| WarehouseError::IllegalTransition {
            unit_id: unit.unit_id().clone(),
            from: unit.state(),
            event: LifecycleEvent::Reassign,
        })
}

impl ReassignmentEngine {
    pub fn new(
        units: Arc<UnitStore>,
        registry: Arc<BinRegistry>,
        ledger: Arc<dyn ActivityLedger>,
        clock: Arc<dyn Clock>,
        policy: SwapPolicy,
    ) -> Self {
        Self {
            units,
            registry,
            ledger,
            clock,
            policy,
        }
    }

    /// Swap the bin assignments of `unit_a` and `unit_b`.
    pub fn reassign(
        &self,
        unit_a: &UnitId,
        unit_b: &UnitId,
        reason: &str,
        actor: &Actor,
    ) -> WarehouseResult<ReassignmentRecord> {
        if unit_a == unit_b {
            return Err(WarehouseError::SelfSwap {
                unit_id: unit_a.clone(),
            });
        }

        let handle_a = self.units.handle(unit_a)?;
        let handle_b = self.units.handle(unit_b)?;
        let (first, second) = if unit_a < unit_b {
            (&handle_a, &handle_b)
        } else {
            (&handle_b, &handle_a)
        };
        let mut first = lock_unit(first)?;
        let mut second = lock_unit(second)?;
        let (a, b): (&mut InventoryUnit, &mut InventoryUnit) = if unit_a < unit_b {
            (&mut *first, &mut *second)
        } else {
            (&mut *second, &mut *first)
        };

        let bin_a = current_bin(a)?;
        let bin_b = current_bin(b)?;

        let record = self.registry.with_pair(&bin_a, &bin_b, |bin_a, bin_b| {
            let plan = plan_swap(a, b, bin_a, bin_b, reason, self.policy, ReassignmentId::new())?;
            if plan.size_mismatch {
                tracing::warn!(
                    unit_a = %unit_a,
                    unit_b = %unit_b,
                    "reassignment moves a unit into a bin of another size class or smaller capacity"
                );
            }

            let at = self.clock.now();
            let events_a = a.handle(&plan.command_for_a(actor, at))?;
            let events_b = b.handle(&plan.command_for_b(actor, at))?;
            let record = plan.record(actor, at);

            let description = if plan.same_bin() {
                format!("{} and {} swapped within {} ({})", unit_a, unit_b, record.from_bin_a, record.reason)
            } else {
                format!(
                    "{}: {} -> {}, {}: {} -> {} ({})",
                    unit_a,
                    record.from_bin_a,
                    record.to_bin_a,
                    unit_b,
                    record.from_bin_b,
                    record.to_bin_b,
                    record.reason
                )
            };
            let entry = NewActivity::new(actor.clone(), ActivityAction::Reassigned, description, at)
                .unit(unit_a)
                .bin(Some(&record.from_bin_a));
            self.ledger.append_reassignment(record.clone(), entry)?;

            for event in &events_a {
                a.apply(event);
            }
            for event in &events_b {
                b.apply(event);
            }
            Ok(record)
        })?;

        tracing::info!(
            reassignment_id = %record.reassignment_id,
            unit_a = %unit_a,
            unit_b = %unit_b,
            from_bin_a = %record.from_bin_a,
            from_bin_b = %record.from_bin_b,
            actor = %actor,
            "units reassigned"
        );
        Ok(record)
    }
}
