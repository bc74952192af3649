//! Allocation Engine: plan against a registry snapshot, then reserve.
//!
//! Planning is lock-free; the reservation re-checks eligibility under the
//! bin's lock. If another allocation got there first the engine re-plans, up
//! to `max_attempts` times, before reporting `ConcurrentModification`.

use std::sync::Arc;

use solewms_warehouse::{
    AllocationDecision, AllocationReason, Candidate, InventoryUnit, WarehouseError, WarehouseResult,
    plan_allocation,
};

use crate::bin_registry::BinRegistry;

#[derive(Debug, Clone)]
pub struct AllocationEngine {
    registry: Arc<BinRegistry>,
    max_attempts: u32,
}

impl AllocationEngine {
    pub fn new(registry: Arc<BinRegistry>, max_attempts: u32) -> Self {
        Self {
            registry,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Choose a bin for `unit` and reserve it. `PartialFit` and `NoFit` are
    /// returned as decisions, not errors.
    pub fn allocate(&self, unit: &InventoryUnit) -> WarehouseResult<AllocationDecision> {
        let size_class = unit.size_class();
        let qty = unit.quantity();

        for attempt in 1..=self.max_attempts {
            let candidates: Vec<Candidate> = self
                .registry
                .find_candidates(size_class, qty)?
                .iter()
                .map(Candidate::from)
                .collect();
            let plan = plan_allocation(&candidates, qty);

            let Some(bin_code) = plan.bin_code.clone() else {
                let decision = AllocationDecision::from_plan(unit.unit_id().clone(), plan);
                tracing::warn!(
                    unit_id = %unit.unit_id(),
                    size_class = %size_class,
                    overflow_qty = decision.overflow_qty,
                    "no bin available"
                );
                return Ok(decision);
            };

            match self.registry.reserve_candidate(&bin_code, size_class, plan.reserve_qty) {
                Ok(_) => {
                    let decision = AllocationDecision::from_plan(unit.unit_id().clone(), plan);
                    match decision.reason {
                        AllocationReason::Fit => tracing::info!(
                            unit_id = %unit.unit_id(),
                            bin_code = %bin_code,
                            qty = decision.reserved_qty,
                            "allocated"
                        ),
                        _ => tracing::warn!(
                            unit_id = %unit.unit_id(),
                            bin_code = %bin_code,
                            reserved_qty = decision.reserved_qty,
                            overflow_qty = decision.overflow_qty,
                            "partial allocation"
                        ),
                    }
                    return Ok(decision);
                }
                Err(WarehouseError::CapacityExceeded { .. } | WarehouseError::ConcurrentModification(_)) => {
                    tracing::debug!(unit_id = %unit.unit_id(), bin_code = %bin_code, attempt, "reservation lost a race; re-planning");
                }
                Err(e) => return Err(e),
            }
        }

        Err(WarehouseError::concurrent(format!(
            "allocation for unit {} kept losing races after {} attempts",
            unit.unit_id(),
            self.max_attempts
        )))
    }
}
