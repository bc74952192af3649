//! Inventory Lifecycle Tracker.
//!
//! Each operation runs as one critical section on the unit's mutex:
//! decide (pure) -> bin effect -> ledger append -> apply. A failure at any
//! step leaves the unit, its bin and the ledger as they were. Bin locks are
//! only taken while a unit lock is held, never the other way round.

use std::sync::Arc;

use solewms_core::{Actor, Aggregate, AggregateRoot, ExpectedVersion, UnitId};
use solewms_warehouse::{
    AcceptOutcome, ActivityAction, AllocationDecision, AssignmentChange, Bin, BinAssignment, BinCode,
    InventoryUnit, LifecycleEvent, NewActivity, NewInventoryUnit, UnitAction, UnitCommand, UnitEvent,
    UnitState, WarehouseError, WarehouseResult,
};

use crate::activity_ledger::ActivityLedger;
use crate::allocation_engine::AllocationEngine;
use crate::bin_registry::BinRegistry;
use crate::clock::Clock;
use crate::unit_store::{UnitStore, lock_unit};

/// Occupancy change a transition implies for its bin.
#[derive(Debug, Clone, Copy)]
enum SlotEffect<'a> {
    Reserve(&'a BinAssignment),
    Release(&'a BinAssignment),
}

impl SlotEffect<'_> {
    fn bin_code(&self) -> &BinCode {
        match self {
            SlotEffect::Reserve(a) | SlotEffect::Release(a) => &a.bin_code,
        }
    }

    fn apply(&self, bin: &mut Bin) -> WarehouseResult<()> {
        match self {
            SlotEffect::Reserve(a) => {
                bin.ensure_accepts_stock()?;
                bin.reserve(a.slot_qty)
            }
            SlotEffect::Release(a) => bin.release(a.slot_qty),
        }
    }

    fn revert(&self, bin: &mut Bin) {
        let result = match self {
            SlotEffect::Reserve(a) => bin.release(a.slot_qty),
            SlotEffect::Release(a) => bin.reserve(a.slot_qty),
        };
        if let Err(e) = result {
            tracing::error!(bin_code = %bin.code(), error = %e, "failed to revert bin occupancy");
        }
    }
}

fn slot_effect(events: &[UnitEvent]) -> Option<SlotEffect<'_>> {
    events.iter().find_map(|event| match event {
        UnitEvent::Transitioned(t) => match &t.assignment {
            AssignmentChange::Assigned(a) => Some(SlotEffect::Reserve(a)),
            AssignmentChange::Released(a) => Some(SlotEffect::Release(a)),
            AssignmentChange::Unchanged => None,
        },
        UnitEvent::BinReassigned(_) => None,
    })
}

/// Activity entries for a batch of unit events, one per state change.
pub(crate) fn activities_for(unit: &InventoryUnit, events: &[UnitEvent]) -> Vec<NewActivity> {
    let mut bin = unit.current_bin_code().cloned();
    events
        .iter()
        .filter_map(|event| match event {
            UnitEvent::Transitioned(t) => {
                match &t.assignment {
                    AssignmentChange::Assigned(a) => bin = Some(a.bin_code.clone()),
                    AssignmentChange::Released(a) => bin = Some(a.bin_code.clone()),
                    AssignmentChange::Unchanged => {}
                }
                let mut description = format!("{}: {} -> {}", t.unit_id, t.from, t.to);
                if let Some(code) = &bin {
                    description.push_str(&format!(" ({code})"));
                }
                if let Some(overflow) = t.overflow_qty.filter(|q| *q > 0) {
                    description.push_str(&format!(", overflow {overflow}"));
                }
                Some(
                    NewActivity::new(t.actor.clone(), ActivityAction::for_state(t.to), description, t.occurred_at)
                        .unit(&t.unit_id)
                        .bin(bin.as_ref()),
                )
            }
            UnitEvent::BinReassigned(_) => None,
        })
        .collect()
}

#[derive(Debug)]
pub struct LifecycleTracker {
    units: Arc<UnitStore>,
    registry: Arc<BinRegistry>,
    allocator: AllocationEngine,
    ledger: Arc<dyn ActivityLedger>,
    clock: Arc<dyn Clock>,
    staging_bin: BinCode,
}

impl LifecycleTracker {
    pub fn new(
        units: Arc<UnitStore>,
        registry: Arc<BinRegistry>,
        allocator: AllocationEngine,
        ledger: Arc<dyn ActivityLedger>,
        clock: Arc<dyn Clock>,
        staging_bin: BinCode,
    ) -> Self {
        Self {
            units,
            registry,
            allocator,
            ledger,
            clock,
            staging_bin,
        }
    }

    /// Create a unit in `InTransit` or `Arrived`.
    pub fn register(
        &self,
        new: NewInventoryUnit,
        initial: UnitState,
        actor: &Actor,
    ) -> WarehouseResult<InventoryUnit> {
        let at = self.clock.now();
        let unit = InventoryUnit::register(new, initial, actor.clone(), at)?;
        let action = match initial {
            UnitState::InTransit => ActivityAction::UnitCreated,
            _ => ActivityAction::Arrived,
        };
        let entry = NewActivity::new(
            actor.clone(),
            action,
            format!(
                "{} created as {} ({} x{}, {})",
                unit.unit_id(),
                initial,
                unit.sku(),
                unit.quantity(),
                unit.source_ref()
            ),
            at,
        )
        .unit(unit.unit_id());

        let unit = self.units.insert_with(unit, |_| self.ledger.append(vec![entry]).map(|_| ()))?;
        tracing::info!(unit_id = %unit.unit_id(), state = %initial, actor = %actor, "unit registered");
        Ok(unit)
    }

    /// Allocate a bin and run `Arrived -> Accepted -> Stored [-> Flagged]`.
    ///
    /// The unit lock is held throughout. If the ledger rejects the batch the
    /// reservation is released before the error is returned.
    pub fn accept(
        &self,
        unit_id: &UnitId,
        actor: &Actor,
        expected: ExpectedVersion,
    ) -> WarehouseResult<AllocationDecision> {
        let handle = self.units.handle(unit_id)?;
        let mut unit = lock_unit(&handle)?;
        unit.ensure_version(expected)?;
        unit.check_transition(LifecycleEvent::Accept)?;

        let decision = self.allocator.allocate(&unit)?;
        let command = UnitCommand {
            unit_id: unit_id.clone(),
            actor: actor.clone(),
            occurred_at: self.clock.now(),
            action: UnitAction::Accept(AcceptOutcome::from_decision(&decision)),
        };

        let committed = unit.commit_with(&command, |unit, events| {
            let allocated = NewActivity::new(
                actor.clone(),
                ActivityAction::Allocated,
                match &decision.chosen_bin_code {
                    Some(code) => format!(
                        "{} allocated to {} ({}, reserved {}, overflow {})",
                        unit_id, code, decision.reason, decision.reserved_qty, decision.overflow_qty
                    ),
                    None => format!("{} has no bin ({}, overflow {})", unit_id, decision.reason, decision.overflow_qty),
                },
                command.occurred_at,
            )
            .unit(unit_id)
            .bin(decision.chosen_bin_code.as_ref());

            let mut entries = vec![allocated];
            entries.extend(activities_for(unit, events));
            self.ledger.append(entries).map(|_| ())
        });

        match committed {
            Ok(_) => {
                tracing::info!(
                    unit_id = %unit_id,
                    bin_code = ?decision.chosen_bin_code.as_ref().map(|c| c.as_str()),
                    reason = %decision.reason,
                    state = %unit.state(),
                    actor = %actor,
                    "unit accepted"
                );
                Ok(decision)
            }
            Err(err) => {
                if let Some(code) = &decision.chosen_bin_code {
                    if let Err(e) = self.registry.release(code, decision.reserved_qty) {
                        tracing::error!(unit_id = %unit_id, bin_code = %code, error = %e, "failed to roll back reservation");
                    }
                }
                tracing::warn!(unit_id = %unit_id, error = %err, "accept rolled back");
                Err(err)
            }
        }
    }

    /// Move a `Flagged` unit without a bin into the staging bin.
    pub fn assign_overflow(
        &self,
        unit_id: &UnitId,
        actor: &Actor,
        expected: ExpectedVersion,
    ) -> WarehouseResult<InventoryUnit> {
        let handle = self.units.handle(unit_id)?;
        let mut unit = lock_unit(&handle)?;
        unit.ensure_version(expected)?;

        let assignment = BinAssignment {
            bin_code: self.staging_bin.clone(),
            slot_qty: unit.quantity(),
        };
        let command = self.command(unit_id, actor, UnitAction::AssignOverflow(assignment));
        self.commit(&mut unit, &command)?;
        tracing::info!(unit_id = %unit_id, bin_code = %self.staging_bin, actor = %actor, "overflow assigned to staging");
        Ok(unit.clone())
    }

    /// Apply a simple or scan-confirmed transition. A repeated scan of a unit
    /// already in the target state succeeds without recording anything.
    pub fn transition(
        &self,
        unit_id: &UnitId,
        action: UnitAction,
        actor: &Actor,
        expected: ExpectedVersion,
    ) -> WarehouseResult<InventoryUnit> {
        let event = action.lifecycle_event();
        if matches!(
            event,
            LifecycleEvent::Accept | LifecycleEvent::AssignOverflow | LifecycleEvent::Reassign
        ) {
            return Err(WarehouseError::validation(format!(
                "'{event}' has its own operation and cannot be applied as a plain transition"
            )));
        }

        let handle = self.units.handle(unit_id)?;
        let mut unit = lock_unit(&handle)?;
        unit.ensure_version(expected)?;

        let from = unit.state();
        let command = self.command(unit_id, actor, action);
        let applied = self.commit(&mut unit, &command)?;
        if applied == 0 {
            tracing::debug!(unit_id = %unit_id, event = %event, state = %from, "repeated scan ignored");
        } else {
            tracing::info!(
                unit_id = %unit_id,
                from = %from,
                to = %unit.state(),
                actor = %actor,
                "unit transitioned"
            );
        }
        Ok(unit.clone())
    }

    fn command(&self, unit_id: &UnitId, actor: &Actor, action: UnitAction) -> UnitCommand {
        UnitCommand {
            unit_id: unit_id.clone(),
            actor: actor.clone(),
            occurred_at: self.clock.now(),
            action,
        }
    }

    /// Decide, apply the bin effect, record, then evolve. Returns the number
    /// of events applied.
    fn commit(&self, unit: &mut InventoryUnit, command: &UnitCommand) -> WarehouseResult<usize> {
        let events = unit.commit_with(command, |unit, events| {
            if events.is_empty() {
                return Ok(());
            }
            let entries = activities_for(unit, events);
            match slot_effect(events) {
                None => self.ledger.append(entries).map(|_| ()),
                Some(effect) => self.registry.with_bin(effect.bin_code(), |bin| {
                    effect.apply(bin)?;
                    if let Err(err) = self.ledger.append(entries) {
                        effect.revert(bin);
                        return Err(err);
                    }
                    Ok(())
                }),
            }
        })?;
        Ok(events.len())
    }
}
