//! Bin lifecycle administration: registration, maintenance, archiving.
//!
//! Every change that actually alters a bin is recorded in the activity
//! ledger while the bin is still locked; if the ledger refuses, the change is
//! undone.

use std::sync::Arc;

use solewms_core::Actor;
use solewms_warehouse::{ActivityAction, Bin, BinCode, NewActivity, SizeClass, WarehouseResult};

use crate::activity_ledger::ActivityLedger;
use crate::bin_registry::BinRegistry;
use crate::clock::Clock;

#[derive(Debug)]
pub struct BinAdmin {
    registry: Arc<BinRegistry>,
    ledger: Arc<dyn ActivityLedger>,
    clock: Arc<dyn Clock>,
}

impl BinAdmin {
    pub fn new(registry: Arc<BinRegistry>, ledger: Arc<dyn ActivityLedger>, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry,
            ledger,
            clock,
        }
    }

    fn entry(&self, actor: &Actor, action: ActivityAction, code: &BinCode, description: String) -> NewActivity {
        NewActivity::new(actor.clone(), action, description, self.clock.now()).bin(Some(code))
    }

    pub fn register_bin(
        &self,
        code: BinCode,
        size_class: SizeClass,
        capacity: u32,
        actor: &Actor,
    ) -> WarehouseResult<Bin> {
        self.register(Bin::new(code, size_class, capacity)?, actor)
    }

    /// Register a prepared bin (storage or staging).
    pub fn register(&self, bin: Bin, actor: &Actor) -> WarehouseResult<Bin> {
        self.registry.register_with(bin, |bin| {
            let entry = self.entry(
                actor,
                ActivityAction::BinRegistered,
                bin.code(),
                format!("bin {} registered ({}, capacity {})", bin.code(), bin.size_class(), bin.capacity()),
            );
            self.ledger.append(vec![entry]).map(|_| ())
        })
    }

    /// Idempotent; only a real change is recorded. Returns whether it changed.
    pub fn set_maintenance(&self, code: &BinCode, enabled: bool, actor: &Actor) -> WarehouseResult<bool> {
        self.registry.with_bin(code, |bin| {
            if !bin.set_maintenance(enabled) {
                return Ok(false);
            }
            let state = if enabled { "entered" } else { "left" };
            let entry = self.entry(
                actor,
                ActivityAction::BinMaintenance,
                code,
                format!("bin {code} {state} maintenance (occupied {})", bin.occupied()),
            );
            if let Err(err) = self.ledger.append(vec![entry]) {
                bin.set_maintenance(!enabled);
                return Err(err);
            }
            tracing::info!(bin_code = %code, enabled, actor = %actor, "bin maintenance changed");
            Ok(true)
        })
    }

    /// Archive an empty bin. Fails with `BinNotEmpty` otherwise.
    pub fn archive(&self, code: &BinCode, actor: &Actor) -> WarehouseResult<bool> {
        self.registry.with_bin(code, |bin| {
            if !bin.archive()? {
                return Ok(false);
            }
            let entry = self.entry(actor, ActivityAction::BinArchived, code, format!("bin {code} archived"));
            if let Err(err) = self.ledger.append(vec![entry]) {
                bin.restore();
                return Err(err);
            }
            tracing::info!(bin_code = %code, actor = %actor, "bin archived");
            Ok(true)
        })
    }

    pub fn restore(&self, code: &BinCode, actor: &Actor) -> WarehouseResult<bool> {
        self.registry.with_bin(code, |bin| {
            if !bin.restore() {
                return Ok(false);
            }
            let entry = self.entry(actor, ActivityAction::BinRestored, code, format!("bin {code} restored"));
            if let Err(err) = self.ledger.append(vec![entry]) {
                if let Err(e) = bin.archive() {
                    tracing::error!(bin_code = %code, error = %e, "failed to revert bin restore");
                }
                return Err(err);
            }
            tracing::info!(bin_code = %code, actor = %actor, "bin restored");
            Ok(true)
        })
    }
}
