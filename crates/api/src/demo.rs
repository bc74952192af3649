//! A small demo floor: one aisle of racking per size class plus a few
//! units waiting at the receiving dock.

use solewms_core::{Actor, UnitId};
use solewms_warehouse::{BinCode, SizeClass, WarehouseResult};

use crate::service::{CreateUnit, WarehouseService};

const DEMO_BINS: [(&str, SizeClass, u32); 8] = [
    ("A-01-01", SizeClass::S, 60),
    ("A-01-02", SizeClass::S, 40),
    ("B-01-01", SizeClass::M, 80),
    ("B-01-02", SizeClass::M, 50),
    ("B-02-01", SizeClass::M, 30),
    ("C-01-01", SizeClass::L, 50),
    ("D-01-01", SizeClass::XL, 30),
    ("E-01-01", SizeClass::XXL, 20),
];

const DEMO_UNITS: [(&str, &str, &str, SizeClass, u32, &str); 3] = [
    ("BP-001", "RUN-AIR-42", "Air Runner 42", SizeClass::M, 24, "ASN-1001"),
    ("BP-002", "TRL-GRIP-38", "Trail Grip 38", SizeClass::S, 12, "ASN-1001"),
    ("BP-003", "BOOT-WNT-45", "Winter Boot 45", SizeClass::XL, 8, "ASN-1002"),
];

/// Register the demo bins and receive the demo units in `Arrived`.
/// Returns the created unit ids.
pub fn seed_demo_floor(service: &WarehouseService) -> WarehouseResult<Vec<UnitId>> {
    let actor = Actor::new("demo seed")?;
    for (code, size_class, capacity) in DEMO_BINS {
        service.register_bin(BinCode::new(code)?, size_class, capacity, &actor)?;
    }

    let mut created = Vec::with_capacity(DEMO_UNITS.len());
    for (unit_id, sku, product_name, size_class, quantity, source_ref) in DEMO_UNITS {
        created.push(service.create_inventory_unit(CreateUnit {
            unit_id: Some(UnitId::new(unit_id)?),
            source_ref: source_ref.to_string(),
            sku: sku.to_string(),
            product_name: product_name.to_string(),
            size_class,
            quantity,
            created_by: Some(actor.clone()),
        })?);
    }

    tracing::info!(bins = DEMO_BINS.len(), units = created.len(), "demo floor seeded");
    Ok(created)
}
