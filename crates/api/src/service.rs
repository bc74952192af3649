//! In-process warehouse boundary: one method per external operation.
//!
//! `WarehouseService` owns the registry, unit store and ledger and wires the
//! engines to them. The HTTP layer in [`crate::app`] is a thin mapping onto
//! these methods.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use solewms_core::{Actor, ExpectedVersion, UnitId};
use solewms_events::Subscription;
use solewms_infra::{
    ActivityLedger, ActivityPage, AllocationEngine, BinAdmin, BinRegistry, Clock, InMemoryActivityLedger,
    LifecycleTracker, Pagination, ReassignmentEngine, SystemClock, UnitStore, WarehouseConfig,
};
use solewms_warehouse::{
    ActivityEntry, ActivityFilter, AllocationDecision, Bin, BinCode, BinKind, BinStatus, InventoryUnit, NewInventoryUnit,
    ReassignmentRecord, SizeClass, SwapPolicy, UnitAction, UnitState, WarehouseResult,
};

/// Attributes of a unit handed over by the receiving workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUnit {
    /// Explicit id (e.g. a pallet label); generated when absent.
    pub unit_id: Option<UnitId>,
    pub source_ref: String,
    pub sku: String,
    pub product_name: String,
    pub size_class: SizeClass,
    pub quantity: u32,
    pub created_by: Option<Actor>,
}

/// Dashboard counters. Bin counts and totals cover storage bins; the staging
/// bin's load is reported on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseSummary {
    pub bins_available: usize,
    pub bins_occupied: usize,
    pub bins_full: usize,
    pub bins_maintenance: usize,
    pub bins_archived: usize,
    pub total_capacity: u64,
    pub total_occupied: u64,
    pub staging_occupied: u64,
    pub units_by_state: BTreeMap<UnitState, usize>,
}

#[derive(Debug)]
pub struct WarehouseService {
    config: WarehouseConfig,
    registry: Arc<BinRegistry>,
    units: Arc<UnitStore>,
    ledger: Arc<dyn ActivityLedger>,
    lifecycle: LifecycleTracker,
    reassignment: ReassignmentEngine,
    bins: BinAdmin,
}

impl WarehouseService {
    /// In-memory ledger, system clock, staging bin registered.
    pub fn new(config: WarehouseConfig) -> WarehouseResult<Self> {
        Self::with_parts(config, Arc::new(InMemoryActivityLedger::new()), Arc::new(SystemClock))
    }

    pub fn with_parts(
        config: WarehouseConfig,
        ledger: Arc<dyn ActivityLedger>,
        clock: Arc<dyn Clock>,
    ) -> WarehouseResult<Self> {
        config.validate()?;

        let registry = Arc::new(BinRegistry::new());
        let units = Arc::new(UnitStore::new());
        let bins = BinAdmin::new(registry.clone(), ledger.clone(), clock.clone());
        bins.register(
            Bin::staging(config.staging_bin.clone(), config.staging_capacity)?,
            &Actor::system(),
        )?;

        let lifecycle = LifecycleTracker::new(
            units.clone(),
            registry.clone(),
            AllocationEngine::new(registry.clone(), config.allocation_max_attempts),
            ledger.clone(),
            clock.clone(),
            config.staging_bin.clone(),
        );
        let reassignment = ReassignmentEngine::new(
            units.clone(),
            registry.clone(),
            ledger.clone(),
            clock,
            SwapPolicy {
                strict: config.strict_reassignment,
            },
        );

        tracing::info!(
            staging_bin = %config.staging_bin,
            strict_reassignment = config.strict_reassignment,
            "warehouse service ready"
        );

        Ok(Self {
            config,
            registry,
            units,
            ledger,
            lifecycle,
            reassignment,
            bins,
        })
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    // -------------------------
    // Unit lifecycle
    // -------------------------

    /// Create a unit that has already arrived.
    pub fn create_inventory_unit(&self, request: CreateUnit) -> WarehouseResult<UnitId> {
        self.create(request, UnitState::Arrived)
    }

    /// Create a unit for an inbound shipment still on the road.
    pub fn register_in_transit(&self, request: CreateUnit) -> WarehouseResult<UnitId> {
        self.create(request, UnitState::InTransit)
    }

    fn create(&self, request: CreateUnit, initial: UnitState) -> WarehouseResult<UnitId> {
        let unit_id = match request.unit_id {
            Some(id) => id,
            None => self.units.next_unit_id()?,
        };
        let actor = request.created_by.unwrap_or_else(Actor::system);
        let unit = self.lifecycle.register(
            NewInventoryUnit {
                unit_id,
                sku: request.sku,
                product_name: request.product_name,
                size_class: request.size_class,
                quantity: request.quantity,
                source_ref: request.source_ref,
            },
            initial,
            &actor,
        )?;
        Ok(unit.unit_id().clone())
    }

    pub fn mark_arrived(&self, unit_id: &UnitId, actor: &Actor) -> WarehouseResult<InventoryUnit> {
        self.mark_arrived_expecting(unit_id, actor, ExpectedVersion::Any)
    }

    pub fn mark_arrived_expecting(
        &self,
        unit_id: &UnitId,
        actor: &Actor,
        expected: ExpectedVersion,
    ) -> WarehouseResult<InventoryUnit> {
        self.lifecycle.transition(unit_id, UnitAction::MarkArrived, actor, expected)
    }

    /// Allocate a bin and store the unit. `PartialFit`/`NoFit` come back as
    /// decisions with the unit `Flagged`.
    pub fn accept(&self, unit_id: &UnitId, actor: &Actor) -> WarehouseResult<AllocationDecision> {
        self.accept_expecting(unit_id, actor, ExpectedVersion::Any)
    }

    pub fn accept_expecting(
        &self,
        unit_id: &UnitId,
        actor: &Actor,
        expected: ExpectedVersion,
    ) -> WarehouseResult<AllocationDecision> {
        self.lifecycle.accept(unit_id, actor, expected)
    }

    pub fn assign_overflow(&self, unit_id: &UnitId, actor: &Actor) -> WarehouseResult<InventoryUnit> {
        self.assign_overflow_expecting(unit_id, actor, ExpectedVersion::Any)
    }

    pub fn assign_overflow_expecting(
        &self,
        unit_id: &UnitId,
        actor: &Actor,
        expected: ExpectedVersion,
    ) -> WarehouseResult<InventoryUnit> {
        self.lifecycle.assign_overflow(unit_id, actor, expected)
    }

    pub fn locate(&self, unit_id: &UnitId, actor: &Actor) -> WarehouseResult<InventoryUnit> {
        self.locate_expecting(unit_id, actor, ExpectedVersion::Any)
    }

    pub fn locate_expecting(
        &self,
        unit_id: &UnitId,
        actor: &Actor,
        expected: ExpectedVersion,
    ) -> WarehouseResult<InventoryUnit> {
        self.lifecycle.transition(unit_id, UnitAction::Locate, actor, expected)
    }

    pub fn confirm_pick(&self, unit_id: &UnitId, scanned_code: &str, actor: &Actor) -> WarehouseResult<InventoryUnit> {
        self.confirm_pick_expecting(unit_id, scanned_code, actor, ExpectedVersion::Any)
    }

    pub fn confirm_pick_expecting(
        &self,
        unit_id: &UnitId,
        scanned_code: &str,
        actor: &Actor,
        expected: ExpectedVersion,
    ) -> WarehouseResult<InventoryUnit> {
        let action = UnitAction::ConfirmPick {
            scanned: scanned_code.to_string(),
        };
        self.lifecycle.transition(unit_id, action, actor, expected)
    }

    pub fn hand_off(&self, unit_id: &UnitId, actor: &Actor) -> WarehouseResult<InventoryUnit> {
        self.hand_off_expecting(unit_id, actor, ExpectedVersion::Any)
    }

    pub fn hand_off_expecting(
        &self,
        unit_id: &UnitId,
        actor: &Actor,
        expected: ExpectedVersion,
    ) -> WarehouseResult<InventoryUnit> {
        self.lifecycle.transition(unit_id, UnitAction::HandOff, actor, expected)
    }

    pub fn confirm_receipt(
        &self,
        unit_id: &UnitId,
        scanned_code: &str,
        actor: &Actor,
    ) -> WarehouseResult<InventoryUnit> {
        self.confirm_receipt_expecting(unit_id, scanned_code, actor, ExpectedVersion::Any)
    }

    pub fn confirm_receipt_expecting(
        &self,
        unit_id: &UnitId,
        scanned_code: &str,
        actor: &Actor,
        expected: ExpectedVersion,
    ) -> WarehouseResult<InventoryUnit> {
        let action = UnitAction::ConfirmReceipt {
            scanned: scanned_code.to_string(),
        };
        self.lifecycle.transition(unit_id, action, actor, expected)
    }

    pub fn start_processing(&self, unit_id: &UnitId, actor: &Actor) -> WarehouseResult<InventoryUnit> {
        self.start_processing_expecting(unit_id, actor, ExpectedVersion::Any)
    }

    pub fn start_processing_expecting(
        &self,
        unit_id: &UnitId,
        actor: &Actor,
        expected: ExpectedVersion,
    ) -> WarehouseResult<InventoryUnit> {
        self.lifecycle.transition(unit_id, UnitAction::StartProcessing, actor, expected)
    }

    pub fn confirm_complete(
        &self,
        unit_id: &UnitId,
        scanned_code: &str,
        actor: &Actor,
    ) -> WarehouseResult<InventoryUnit> {
        self.confirm_complete_expecting(unit_id, scanned_code, actor, ExpectedVersion::Any)
    }

    pub fn confirm_complete_expecting(
        &self,
        unit_id: &UnitId,
        scanned_code: &str,
        actor: &Actor,
        expected: ExpectedVersion,
    ) -> WarehouseResult<InventoryUnit> {
        let action = UnitAction::ConfirmComplete {
            scanned: scanned_code.to_string(),
        };
        self.lifecycle.transition(unit_id, action, actor, expected)
    }

    pub fn reassign(
        &self,
        unit_a: &UnitId,
        unit_b: &UnitId,
        reason: &str,
        actor: &Actor,
    ) -> WarehouseResult<ReassignmentRecord> {
        self.reassignment.reassign(unit_a, unit_b, reason, actor)
    }

    // -------------------------
    // Bin administration
    // -------------------------

    pub fn register_bin(
        &self,
        bin_code: BinCode,
        size_class: SizeClass,
        capacity: u32,
        actor: &Actor,
    ) -> WarehouseResult<Bin> {
        self.bins.register_bin(bin_code, size_class, capacity, actor)
    }

    pub fn set_bin_maintenance(&self, bin_code: &BinCode, enabled: bool, actor: &Actor) -> WarehouseResult<bool> {
        self.bins.set_maintenance(bin_code, enabled, actor)
    }

    pub fn archive_bin(&self, bin_code: &BinCode, actor: &Actor) -> WarehouseResult<bool> {
        self.bins.archive(bin_code, actor)
    }

    pub fn restore_bin(&self, bin_code: &BinCode, actor: &Actor) -> WarehouseResult<bool> {
        self.bins.restore(bin_code, actor)
    }

    // -------------------------
    // Queries
    // -------------------------

    pub fn get_bins_by_size(&self, size_class: SizeClass) -> WarehouseResult<Vec<Bin>> {
        self.registry.bins_by_size(size_class)
    }

    pub fn list_bins(&self) -> WarehouseResult<Vec<Bin>> {
        self.registry.list()
    }

    pub fn get_bin(&self, bin_code: &BinCode) -> WarehouseResult<Bin> {
        self.registry.get(bin_code)
    }

    pub fn get_unit(&self, unit_id: &UnitId) -> WarehouseResult<InventoryUnit> {
        self.units.get(unit_id)
    }

    pub fn list_units(&self) -> WarehouseResult<Vec<InventoryUnit>> {
        self.units.list()
    }

    /// Newest first. `limit` defaults to the configured page size.
    pub fn get_activity(
        &self,
        filter: &ActivityFilter,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> WarehouseResult<ActivityPage> {
        let pagination = Pagination::new(self.config.page_limit(limit), offset.unwrap_or(0));
        self.ledger.query(filter, pagination)
    }

    pub fn get_reassignments(&self, unit_id: Option<&UnitId>) -> WarehouseResult<Vec<ReassignmentRecord>> {
        self.ledger.reassignments(unit_id)
    }

    pub fn subscribe_activity(&self) -> Subscription<ActivityEntry> {
        self.ledger.subscribe()
    }

    pub fn summary(&self) -> WarehouseResult<WarehouseSummary> {
        let mut summary = WarehouseSummary {
            units_by_state: self.units.count_by_state()?,
            ..Default::default()
        };
        for bin in self.registry.list()? {
            if bin.kind() == BinKind::Staging {
                summary.staging_occupied += u64::from(bin.occupied());
                continue;
            }
            if bin.is_archived() {
                summary.bins_archived += 1;
                continue;
            }
            match bin.status() {
                BinStatus::Available => summary.bins_available += 1,
                BinStatus::Occupied => summary.bins_occupied += 1,
                BinStatus::Full => summary.bins_full += 1,
                BinStatus::Maintenance => summary.bins_maintenance += 1,
            }
            summary.total_capacity += u64::from(bin.capacity());
            summary.total_occupied += u64::from(bin.occupied());
        }
        Ok(summary)
    }
}
