//! Warehouse boundary: the in-process service, its HTTP surface, and demo
//! floor seeding.

pub mod app;
pub mod demo;
pub mod service;

pub use service::{CreateUnit, WarehouseService, WarehouseSummary};
