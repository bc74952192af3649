//! Inventory unit aggregate and its lifecycle state machine.
//!
//! ```text
//! InTransit -> Arrived -> Accepted -> Stored -> Located -> Picked -> HandedOff
//!                            |          |                              |
//!                            +-> Flagged <-+                        Received -> Processing
//!                                                                      |            |
//!                                                                      +-> Completed <-+
//! ```
//!
//! `Flagged` marks a unit whose allocation was a `PartialFit` (it holds a bin)
//! or a `NoFit` (it holds none). A flagged unit with a bin keeps moving like a
//! stored one; without a bin it waits for an overflow assignment.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use solewms_core::{Actor, Aggregate, AggregateRoot, ReassignmentId, UnitId};
use solewms_events::Event;

use crate::allocation::{AllocationDecision, AllocationReason};
use crate::bin::{BinCode, SizeClass};
use crate::error::{WarehouseError, WarehouseResult};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitState {
    InTransit,
    Arrived,
    Accepted,
    Stored,
    Located,
    Picked,
    HandedOff,
    /// Scanned in at the VAS station, eligible for processing.
    Received,
    Processing,
    Completed,
    Flagged,
}

impl UnitState {
    pub const ALL: [UnitState; 11] = [
        UnitState::InTransit,
        UnitState::Arrived,
        UnitState::Accepted,
        UnitState::Stored,
        UnitState::Located,
        UnitState::Picked,
        UnitState::HandedOff,
        UnitState::Received,
        UnitState::Processing,
        UnitState::Completed,
        UnitState::Flagged,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UnitState::InTransit => "InTransit",
            UnitState::Arrived => "Arrived",
            UnitState::Accepted => "Accepted",
            UnitState::Stored => "Stored",
            UnitState::Located => "Located",
            UnitState::Picked => "Picked",
            UnitState::HandedOff => "HandedOff",
            UnitState::Received => "Received",
            UnitState::Processing => "Processing",
            UnitState::Completed => "Completed",
            UnitState::Flagged => "Flagged",
        }
    }

    /// Stable event type for a transition into this state.
    pub fn event_type(self) -> &'static str {
        match self {
            UnitState::InTransit => "warehouse.unit.in_transit",
            UnitState::Arrived => "warehouse.unit.arrived",
            UnitState::Accepted => "warehouse.unit.accepted",
            UnitState::Stored => "warehouse.unit.stored",
            UnitState::Located => "warehouse.unit.located",
            UnitState::Picked => "warehouse.unit.picked",
            UnitState::HandedOff => "warehouse.unit.handed_off",
            UnitState::Received => "warehouse.unit.received",
            UnitState::Processing => "warehouse.unit.processing",
            UnitState::Completed => "warehouse.unit.completed",
            UnitState::Flagged => "warehouse.unit.flagged",
        }
    }
}

impl core::fmt::Display for UnitState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator/system events that drive the state machine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleEvent {
    MarkArrived,
    Accept,
    Store,
    Flag,
    AssignOverflow,
    Locate,
    ConfirmPick,
    HandOff,
    ConfirmReceipt,
    StartProcessing,
    ConfirmComplete,
    /// Bin swap; not a state change, only legal while the unit sits in a bin.
    Reassign,
}

impl LifecycleEvent {
    pub const ALL: [LifecycleEvent; 12] = [
        LifecycleEvent::MarkArrived,
        LifecycleEvent::Accept,
        LifecycleEvent::Store,
        LifecycleEvent::Flag,
        LifecycleEvent::AssignOverflow,
        LifecycleEvent::Locate,
        LifecycleEvent::ConfirmPick,
        LifecycleEvent::HandOff,
        LifecycleEvent::ConfirmReceipt,
        LifecycleEvent::StartProcessing,
        LifecycleEvent::ConfirmComplete,
        LifecycleEvent::Reassign,
    ];
}

impl core::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            LifecycleEvent::MarkArrived => "mark arrived",
            LifecycleEvent::Accept => "accept",
            LifecycleEvent::Store => "store",
            LifecycleEvent::Flag => "flag",
            LifecycleEvent::AssignOverflow => "assign overflow",
            LifecycleEvent::Locate => "locate",
            LifecycleEvent::ConfirmPick => "confirm pick",
            LifecycleEvent::HandOff => "hand off",
            LifecycleEvent::ConfirmReceipt => "confirm receipt",
            LifecycleEvent::StartProcessing => "start processing",
            LifecycleEvent::ConfirmComplete => "confirm complete",
            LifecycleEvent::Reassign => "reassign",
        };
        f.write_str(s)
    }
}

/// The transition table. `has_bin` is whether the unit currently holds a bin
/// assignment.
pub fn transition_target(from: UnitState, event: LifecycleEvent, has_bin: bool) -> Option<UnitState> {
    use LifecycleEvent as E;
    use UnitState::*;

    match (from, event) {
        (InTransit, E::MarkArrived) => Some(Arrived),
        (Arrived, E::Accept) => Some(Accepted),
        (Accepted, E::Store) => Some(Stored),
        (Accepted | Stored, E::Flag) => Some(Flagged),
        (Flagged, E::AssignOverflow) if !has_bin => Some(Stored),
        (Stored | Flagged, E::Locate) if has_bin => Some(Located),
        (Stored | Located | Flagged, E::ConfirmPick) if has_bin => Some(Picked),
        (Picked, E::HandOff) => Some(HandedOff),
        (HandedOff, E::ConfirmReceipt) => Some(Received),
        (Received, E::StartProcessing) => Some(Processing),
        (Received | Processing, E::ConfirmComplete) => Some(Completed),
        _ => None,
    }
}

/// Whether `from -> to` is an edge of the transition table for some event.
pub fn is_valid_edge(from: UnitState, to: UnitState) -> bool {
    LifecycleEvent::ALL.iter().any(|&event| {
        [true, false]
            .into_iter()
            .any(|has_bin| transition_target(from, event, has_bin) == Some(to))
    })
}

/// Where a unit sits and how much of the bin's occupancy it accounts for.
///
/// `slot_qty` equals the unit quantity after a full fit, the reserved part
/// after a partial fit, and travels with the assignment on a swap so bin
/// totals stay equal to the sum of their units' slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinAssignment {
    pub bin_code: BinCode,
    pub slot_qty: u32,
}

/// One entry of a unit's append-only state history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateStamp {
    pub state: UnitState,
    pub actor: Actor,
    pub timestamp: DateTime<Utc>,
}

/// Attributes supplied by the receiving workflow when a unit is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInventoryUnit {
    pub unit_id: UnitId,
    pub sku: String,
    pub product_name: String,
    pub size_class: SizeClass,
    pub quantity: u32,
    pub source_ref: String,
}

impl NewInventoryUnit {
    fn validate(&self) -> WarehouseResult<()> {
        if self.sku.trim().is_empty() {
            return Err(WarehouseError::validation("sku cannot be empty"));
        }
        if self.product_name.trim().is_empty() {
            return Err(WarehouseError::validation("product name cannot be empty"));
        }
        if self.source_ref.trim().is_empty() {
            return Err(WarehouseError::validation("source reference cannot be empty"));
        }
        if self.quantity == 0 {
            return Err(WarehouseError::validation("quantity must be positive"));
        }
        Ok(())
    }
}

/// Aggregate root: InventoryUnit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryUnit {
    unit_id: UnitId,
    sku: String,
    product_name: String,
    size_class: SizeClass,
    quantity: u32,
    source_ref: String,
    assignment: Option<BinAssignment>,
    overflow_qty: u32,
    state: UnitState,
    history: Vec<StateStamp>,
    version: u64,
}

impl InventoryUnit {
    /// Create a unit in `InTransit` or `Arrived`, with that state as the first
    /// history stamp.
    pub fn register(
        new: NewInventoryUnit,
        initial: UnitState,
        actor: Actor,
        at: DateTime<Utc>,
    ) -> WarehouseResult<Self> {
        if !matches!(initial, UnitState::InTransit | UnitState::Arrived) {
            return Err(WarehouseError::validation(format!(
                "units can only be registered as InTransit or Arrived, not {initial}"
            )));
        }
        new.validate()?;

        Ok(Self {
            unit_id: new.unit_id,
            sku: new.sku.trim().to_string(),
            product_name: new.product_name.trim().to_string(),
            size_class: new.size_class,
            quantity: new.quantity,
            source_ref: new.source_ref.trim().to_string(),
            assignment: None,
            overflow_qty: 0,
            state: initial,
            history: vec![StateStamp {
                state: initial,
                actor,
                timestamp: at,
            }],
            version: 1,
        })
    }

    pub fn unit_id(&self) -> &UnitId {
        &self.unit_id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn size_class(&self) -> SizeClass {
        self.size_class
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn source_ref(&self) -> &str {
        &self.source_ref
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    pub fn assignment(&self) -> Option<&BinAssignment> {
        self.assignment.as_ref()
    }

    pub fn current_bin_code(&self) -> Option<&BinCode> {
        self.assignment.as_ref().map(|a| &a.bin_code)
    }

    pub fn overflow_qty(&self) -> u32 {
        self.overflow_qty
    }

    pub fn state_history(&self) -> &[StateStamp] {
        &self.history
    }

    /// Scanned code matches the unit's SKU or its unit id (case-insensitive).
    pub fn matches_scan(&self, scanned: &str) -> bool {
        let scanned = scanned.trim();
        scanned.eq_ignore_ascii_case(&self.sku) || scanned.eq_ignore_ascii_case(self.unit_id.as_str())
    }

    /// Stored or later but not yet picked, and sitting in a bin.
    pub fn is_swappable(&self) -> bool {
        self.assignment.is_some()
            && matches!(
                self.state,
                UnitState::Stored | UnitState::Located | UnitState::Flagged
            )
    }

    fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.history.last().map(|s| s.timestamp)
    }

    /// Keep history strictly increasing even when two stamps share a clock
    /// reading.
    fn stamp_time(&self, previous: Option<DateTime<Utc>>, at: DateTime<Utc>) -> DateTime<Utc> {
        match previous {
            Some(prev) if at <= prev => prev + Duration::microseconds(1),
            _ => at,
        }
    }

    /// The state `event` would lead to, or the `IllegalTransition` it raises.
    pub fn check_transition(&self, event: LifecycleEvent) -> WarehouseResult<UnitState> {
        transition_target(self.state, event, self.assignment.is_some()).ok_or_else(|| {
            WarehouseError::IllegalTransition {
                unit_id: self.unit_id.clone(),
                from: self.state,
                event,
            }
        })
    }

    fn ensure_scan(&self, scanned: &str) -> WarehouseResult<()> {
        if self.matches_scan(scanned) {
            Ok(())
        } else {
            Err(WarehouseError::ScanMismatch {
                unit_id: self.unit_id.clone(),
                expected_sku: self.sku.clone(),
                scanned: scanned.to_string(),
            })
        }
    }
}

impl AggregateRoot for InventoryUnit {
    type Id = UnitId;

    fn id(&self) -> &Self::Id {
        &self.unit_id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// How an acceptance resolved, derived from the allocation decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptOutcome {
    pub reason: AllocationReason,
    pub assignment: Option<BinAssignment>,
    pub overflow_qty: u32,
}

impl AcceptOutcome {
    pub fn from_decision(decision: &AllocationDecision) -> Self {
        Self {
            reason: decision.reason,
            assignment: decision.chosen_bin_code.clone().map(|bin_code| BinAssignment {
                bin_code,
                slot_qty: decision.reserved_qty,
            }),
            overflow_qty: decision.overflow_qty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitAction {
    MarkArrived,
    Accept(AcceptOutcome),
    AssignOverflow(BinAssignment),
    Locate,
    ConfirmPick { scanned: String },
    HandOff,
    ConfirmReceipt { scanned: String },
    StartProcessing,
    ConfirmComplete { scanned: String },
    Reassign {
        to: BinAssignment,
        reassignment_id: ReassignmentId,
    },
}

impl UnitAction {
    pub fn lifecycle_event(&self) -> LifecycleEvent {
        match self {
            UnitAction::MarkArrived => LifecycleEvent::MarkArrived,
            UnitAction::Accept(_) => LifecycleEvent::Accept,
            UnitAction::AssignOverflow(_) => LifecycleEvent::AssignOverflow,
            UnitAction::Locate => LifecycleEvent::Locate,
            UnitAction::ConfirmPick { .. } => LifecycleEvent::ConfirmPick,
            UnitAction::HandOff => LifecycleEvent::HandOff,
            UnitAction::ConfirmReceipt { .. } => LifecycleEvent::ConfirmReceipt,
            UnitAction::StartProcessing => LifecycleEvent::StartProcessing,
            UnitAction::ConfirmComplete { .. } => LifecycleEvent::ConfirmComplete,
            UnitAction::Reassign { .. } => LifecycleEvent::Reassign,
        }
    }

    /// Scanned code and the state a repeated scan would already have reached.
    fn scan(&self) -> Option<(&str, UnitState)> {
        match self {
            UnitAction::ConfirmPick { scanned } => Some((scanned.as_str(), UnitState::Picked)),
            UnitAction::ConfirmReceipt { scanned } => Some((scanned.as_str(), UnitState::Received)),
            UnitAction::ConfirmComplete { scanned } => Some((scanned.as_str(), UnitState::Completed)),
            _ => None,
        }
    }
}

/// Command: apply `action` to `unit_id` on behalf of `actor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCommand {
    pub unit_id: UnitId,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
    pub action: UnitAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentChange {
    Unchanged,
    Assigned(BinAssignment),
    /// The unit left its bin; the slot quantity must be released.
    Released(BinAssignment),
}

/// Event: UnitTransitioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTransitioned {
    pub unit_id: UnitId,
    pub from: UnitState,
    pub to: UnitState,
    pub event: LifecycleEvent,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
    pub assignment: AssignmentChange,
    pub overflow_qty: Option<u32>,
}

/// Event: BinReassigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinReassigned {
    pub unit_id: UnitId,
    pub reassignment_id: ReassignmentId,
    pub from: BinAssignment,
    pub to: BinAssignment,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitEvent {
    Transitioned(UnitTransitioned),
    BinReassigned(BinReassigned),
}

impl Event for UnitEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UnitEvent::Transitioned(e) => e.to.event_type(),
            UnitEvent::BinReassigned(_) => "warehouse.unit.reassigned",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            UnitEvent::Transitioned(e) => e.occurred_at,
            UnitEvent::BinReassigned(e) => e.occurred_at,
        }
    }
}

impl Aggregate for InventoryUnit {
    type Command = UnitCommand;
    type Event = UnitEvent;
    type Error = WarehouseError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            UnitEvent::Transitioned(e) => {
                self.state = e.to;
                self.history.push(StateStamp {
                    state: e.to,
                    actor: e.actor.clone(),
                    timestamp: e.occurred_at,
                });
                match &e.assignment {
                    AssignmentChange::Unchanged => {}
                    AssignmentChange::Assigned(a) => self.assignment = Some(a.clone()),
                    AssignmentChange::Released(_) => self.assignment = None,
                }
                if let Some(overflow) = e.overflow_qty {
                    self.overflow_qty = overflow;
                }
            }
            UnitEvent::BinReassigned(e) => {
                self.assignment = Some(e.to.clone());
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if command.unit_id != self.unit_id {
            return Err(WarehouseError::validation("unit_id mismatch"));
        }

        if let Some((scanned, reached)) = command.action.scan() {
            self.ensure_scan(scanned)?;
            if self.state == reached {
                // Scanner double-fire.
                return Ok(vec![]);
            }
        }

        match &command.action {
            UnitAction::Accept(outcome) => self.handle_accept(command, outcome),
            UnitAction::AssignOverflow(assignment) => self.handle_assign_overflow(command, assignment),
            UnitAction::Reassign { to, reassignment_id } => {
                self.handle_reassign(command, to, *reassignment_id)
            }
            UnitAction::ConfirmPick { .. } => {
                let to = self.check_transition(LifecycleEvent::ConfirmPick)?;
                let released = self.assignment.clone().ok_or_else(|| {
                    WarehouseError::validation(format!("unit {} has no bin to pick from", self.unit_id))
                })?;
                Ok(vec![self.transitioned(
                    command,
                    LifecycleEvent::ConfirmPick,
                    self.state,
                    to,
                    self.last_timestamp(),
                    AssignmentChange::Released(released),
                    None,
                )])
            }
            action => {
                let event = action.lifecycle_event();
                let to = self.check_transition(event)?;
                Ok(vec![self.transitioned(
                    command,
                    event,
                    self.state,
                    to,
                    self.last_timestamp(),
                    AssignmentChange::Unchanged,
                    None,
                )])
            }
        }
    }
}

impl InventoryUnit {
    #[allow(clippy::too_many_arguments)]
    fn transitioned(
        &self,
        command: &UnitCommand,
        event: LifecycleEvent,
        from: UnitState,
        to: UnitState,
        prior: Option<DateTime<Utc>>,
        assignment: AssignmentChange,
        overflow_qty: Option<u32>,
    ) -> UnitEvent {
        UnitEvent::Transitioned(UnitTransitioned {
            unit_id: self.unit_id.clone(),
            from,
            to,
            event,
            actor: command.actor.clone(),
            occurred_at: self.stamp_time(prior, command.occurred_at),
            assignment,
            overflow_qty,
        })
    }

    fn event_time(event: &UnitEvent) -> DateTime<Utc> {
        event.occurred_at()
    }

    fn handle_accept(
        &self,
        command: &UnitCommand,
        outcome: &AcceptOutcome,
    ) -> WarehouseResult<Vec<UnitEvent>> {
        let accepted = self.check_transition(LifecycleEvent::Accept)?;

        match (outcome.reason, &outcome.assignment) {
            (AllocationReason::Fit, Some(a)) if a.slot_qty == self.quantity => {}
            (AllocationReason::PartialFit, Some(a)) if a.slot_qty > 0 && a.slot_qty < self.quantity => {}
            (AllocationReason::NoFit, None) => {}
            _ => {
                return Err(WarehouseError::validation(format!(
                    "inconsistent {} outcome for unit {} (quantity {})",
                    outcome.reason, self.unit_id, self.quantity
                )));
            }
        }

        let mut events = Vec::with_capacity(3);
        let first = self.transitioned(
            command,
            LifecycleEvent::Accept,
            self.state,
            accepted,
            self.last_timestamp(),
            AssignmentChange::Unchanged,
            None,
        );
        let mut last_at = Self::event_time(&first);
        let mut current = accepted;
        events.push(first);

        if let Some(assignment) = &outcome.assignment {
            let stored = self.transitioned(
                command,
                LifecycleEvent::Store,
                current,
                UnitState::Stored,
                Some(last_at),
                AssignmentChange::Assigned(assignment.clone()),
                None,
            );
            last_at = Self::event_time(&stored);
            current = UnitState::Stored;
            events.push(stored);
        }

        if outcome.reason != AllocationReason::Fit {
            let overflow = if outcome.assignment.is_some() {
                outcome.overflow_qty
            } else {
                self.quantity
            };
            events.push(self.transitioned(
                command,
                LifecycleEvent::Flag,
                current,
                UnitState::Flagged,
                Some(last_at),
                AssignmentChange::Unchanged,
                Some(overflow),
            ));
        }

        Ok(events)
    }

    fn handle_assign_overflow(
        &self,
        command: &UnitCommand,
        assignment: &BinAssignment,
    ) -> WarehouseResult<Vec<UnitEvent>> {
        let to = self.check_transition(LifecycleEvent::AssignOverflow)?;
        if assignment.slot_qty != self.quantity {
            return Err(WarehouseError::validation(format!(
                "overflow assignment for unit {} must hold its full quantity {}",
                self.unit_id, self.quantity
            )));
        }
        Ok(vec![self.transitioned(
            command,
            LifecycleEvent::AssignOverflow,
            self.state,
            to,
            self.last_timestamp(),
            AssignmentChange::Assigned(assignment.clone()),
            Some(0),
        )])
    }

    fn handle_reassign(
        &self,
        command: &UnitCommand,
        to: &BinAssignment,
        reassignment_id: ReassignmentId,
    ) -> WarehouseResult<Vec<UnitEvent>> {
        let from = match &self.assignment {
            Some(a) if self.is_swappable() => a.clone(),
            _ => {
                return Err(WarehouseError::IllegalTransition {
                    unit_id: self.unit_id.clone(),
                    from: self.state,
                    event: LifecycleEvent::Reassign,
                });
            }
        };
        Ok(vec![UnitEvent::BinReassigned(BinReassigned {
            unit_id: self.unit_id.clone(),
            reassignment_id,
            from,
            to: to.clone(),
            actor: command.actor.clone(),
            occurred_at: command.occurred_at,
        })])
    }
}
