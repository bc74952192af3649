//! Warehouse domain module: bins, slot allocation, unit lifecycle.
//!
//! This crate contains the business rules for footwear bin storage,
//! implemented purely as deterministic domain logic (no locks, no clocks,
//! no storage). The stateful, lock-protected services that drive these
//! rules live in `solewms-infra`.

pub mod activity;
pub mod allocation;
pub mod bin;
pub mod error;
pub mod reassignment;
pub mod unit;

pub use activity::{ActivityAction, ActivityEntry, ActivityFilter, NewActivity};
pub use allocation::{AllocationDecision, AllocationPlan, AllocationReason, Candidate, plan_allocation};
pub use bin::{Bin, BinCode, BinKind, BinStatus, SizeClass};
pub use error::{WarehouseError, WarehouseResult};
pub use reassignment::{ReassignmentRecord, SwapPlan, SwapPolicy, plan_swap};
pub use unit::{
    AcceptOutcome, AssignmentChange, BinAssignment, InventoryUnit, LifecycleEvent,
    NewInventoryUnit, StateStamp, UnitAction, UnitCommand, UnitEvent, UnitState,
    UnitTransitioned, BinReassigned, is_valid_edge, transition_target,
};
