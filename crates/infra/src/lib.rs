//! Stateful warehouse services: the lock-protected Bin Registry and unit
//! store, and the engines that drive the pure domain rules against them.

pub mod activity_ledger;
pub mod allocation_engine;
pub mod bin_admin;
pub mod bin_registry;
pub mod clock;
pub mod config;
pub mod lifecycle;
pub mod reassignment_engine;
pub mod unit_store;

mod integration_tests;

pub use activity_ledger::{ActivityLedger, ActivityPage, InMemoryActivityLedger, Pagination};
pub use allocation_engine::AllocationEngine;
pub use bin_admin::BinAdmin;
pub use bin_registry::BinRegistry;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{MAX_ACTIVITY_PAGE_LIMIT, WarehouseConfig};
pub use lifecycle::LifecycleTracker;
pub use reassignment_engine::ReassignmentEngine;
pub use unit_store::UnitStore;
