//! In-memory store of inventory units, one mutex per unit.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use solewms_core::UnitId;
use solewms_warehouse::{InventoryUnit, UnitState, WarehouseError, WarehouseResult};

pub(crate) type UnitHandle = Arc<Mutex<InventoryUnit>>;

/// Prefix of generated unit ids ("IU-000001").
pub const GENERATED_ID_PREFIX: &str = "IU";

#[derive(Debug, Default)]
pub struct UnitStore {
    units: RwLock<BTreeMap<UnitId, UnitHandle>>,
    next_seq: AtomicU64,
}

pub(crate) fn lock_unit(handle: &UnitHandle) -> WarehouseResult<MutexGuard<'_, InventoryUnit>> {
    handle
        .lock()
        .map_err(|_| WarehouseError::poisoned("unit"))
}

impl UnitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next free generated id. Ids supplied by callers are skipped over.
    pub fn next_unit_id(&self) -> WarehouseResult<UnitId> {
        loop {
            let n = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
            let id = UnitId::sequential(GENERATED_ID_PREFIX, n)?;
            if !self.contains(&id) {
                return Ok(id);
            }
        }
    }

    pub fn contains(&self, unit_id: &UnitId) -> bool {
        self.units
            .read()
            .map(|units| units.contains_key(unit_id))
            .unwrap_or(false)
    }

    /// Insert a new unit and run `commit` while the map is write-locked. If
    /// `commit` fails the unit is not added.
    pub fn insert_with(
        &self,
        unit: InventoryUnit,
        commit: impl FnOnce(&InventoryUnit) -> WarehouseResult<()>,
    ) -> WarehouseResult<InventoryUnit> {
        let mut units = self
            .units
            .write()
            .map_err(|_| WarehouseError::poisoned("unit store"))?;
        if units.contains_key(unit.unit_id()) {
            return Err(WarehouseError::DuplicateUnit(unit.unit_id().clone()));
        }
        commit(&unit)?;
        units.insert(unit.unit_id().clone(), Arc::new(Mutex::new(unit.clone())));
        Ok(unit)
    }

    pub(crate) fn handle(&self, unit_id: &UnitId) -> WarehouseResult<UnitHandle> {
        let units = self
            .units
            .read()
            .map_err(|_| WarehouseError::poisoned("unit store"))?;
        units
            .get(unit_id)
            .cloned()
            .ok_or_else(|| WarehouseError::UnitNotFound(unit_id.clone()))
    }

    pub fn get(&self, unit_id: &UnitId) -> WarehouseResult<InventoryUnit> {
        let handle = self.handle(unit_id)?;
        let unit = lock_unit(&handle)?;
        Ok(unit.clone())
    }

    pub fn list(&self) -> WarehouseResult<Vec<InventoryUnit>> {
        let handles: Vec<UnitHandle> = {
            let units = self
                .units
                .read()
                .map_err(|_| WarehouseError::poisoned("unit store"))?;
            units.values().cloned().collect()
        };
        handles
            .iter()
            .map(|h| lock_unit(h).map(|u| u.clone()))
            .collect()
    }

    pub fn count_by_state(&self) -> WarehouseResult<BTreeMap<UnitState, usize>> {
        let mut counts = BTreeMap::new();
        for unit in self.list()? {
            *counts.entry(unit.state()).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use solewms_core::Actor;
    use solewms_warehouse::{NewInventoryUnit, SizeClass};

    fn test_unit(id: UnitId) -> InventoryUnit {
        InventoryUnit::register(
            NewInventoryUnit {
                unit_id: id,
                sku: "AD-SAMBA-042".to_string(),
                product_name: "Samba OG".to_string(),
                size_class: SizeClass::S,
                quantity: 6,
                source_ref: "SH-2026-11".to_string(),
            },
            UnitState::Arrived,
            Actor::system(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn generated_ids_skip_explicit_ones() {
        let store = UnitStore::new();
        store
            .insert_with(test_unit(UnitId::new("IU-000001").unwrap()), |_| Ok(()))
            .unwrap();
        assert_eq!(store.next_unit_id().unwrap().as_str(), "IU-000002");
    }

    #[test]
    fn duplicate_insert_is_rejected_and_failed_commit_inserts_nothing() {
        let store = UnitStore::new();
        let id = UnitId::new("BP-001").unwrap();
        store.insert_with(test_unit(id.clone()), |_| Ok(())).unwrap();
        assert!(matches!(
            store.insert_with(test_unit(id.clone()), |_| Ok(())),
            Err(WarehouseError::DuplicateUnit(_))
        ));

        let other = UnitId::new("BP-002").unwrap();
        let err = store
            .insert_with(test_unit(other.clone()), |_| Err(WarehouseError::Ledger("down".into())))
            .unwrap_err();
        assert!(matches!(err, WarehouseError::Ledger(_)));
        assert_eq!(store.get(&other).unwrap_err(), WarehouseError::UnitNotFound(other));
        assert_eq!(store.count_by_state().unwrap().get(&UnitState::Arrived), Some(&1));
    }
}
