//! Bin Registry: the live set of bins, one mutex per bin.
//!
//! The map itself sits behind a `RwLock` and is only written when bins are
//! registered. Every occupancy change goes through the owning bin's mutex, so
//! reservations on different bins never contend. When two bins must be held at
//! once they are locked in ascending `BinCode` order.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use solewms_warehouse::{Bin, BinCode, BinKind, SizeClass, WarehouseError, WarehouseResult, allocation};

type BinHandle = Arc<Mutex<Bin>>;

#[derive(Debug, Default)]
pub struct BinRegistry {
    bins: RwLock<BTreeMap<BinCode, BinHandle>>,
}

fn poisoned(what: &str) -> WarehouseError {
    WarehouseError::poisoned(what)
}

fn lock(handle: &BinHandle) -> WarehouseResult<MutexGuard<'_, Bin>> {
    handle.lock().map_err(|_| poisoned("bin"))
}

impl BinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bin. Fails with `DuplicateBin` if the code is taken.
    pub fn register(&self, bin: Bin) -> WarehouseResult<Bin> {
        self.register_with(bin, |_| Ok(()))
    }

    /// Add a bin and run `commit` while the map is still write-locked. If
    /// `commit` fails the bin is not added.
    pub fn register_with(
        &self,
        bin: Bin,
        commit: impl FnOnce(&Bin) -> WarehouseResult<()>,
    ) -> WarehouseResult<Bin> {
        let mut bins = self.bins.write().map_err(|_| poisoned("bin registry"))?;
        if bins.contains_key(bin.code()) {
            return Err(WarehouseError::DuplicateBin(bin.code().clone()));
        }
        commit(&bin)?;
        bins.insert(bin.code().clone(), Arc::new(Mutex::new(bin.clone())));
        tracing::info!(bin_code = %bin.code(), size_class = %bin.size_class(), capacity = bin.capacity(), "bin registered");
        Ok(bin)
    }

    fn handle(&self, code: &BinCode) -> WarehouseResult<BinHandle> {
        let bins = self.bins.read().map_err(|_| poisoned("bin registry"))?;
        bins.get(code)
            .cloned()
            .ok_or_else(|| WarehouseError::BinNotFound(code.clone()))
    }

    fn handles(&self) -> WarehouseResult<Vec<BinHandle>> {
        let bins = self.bins.read().map_err(|_| poisoned("bin registry"))?;
        Ok(bins.values().cloned().collect())
    }

    pub fn contains(&self, code: &BinCode) -> bool {
        self.bins
            .read()
            .map(|bins| bins.contains_key(code))
            .unwrap_or(false)
    }

    /// Snapshot of one bin.
    pub fn get(&self, code: &BinCode) -> WarehouseResult<Bin> {
        let handle = self.handle(code)?;
        let bin = lock(&handle)?;
        Ok(bin.clone())
    }

    /// Snapshot of every bin, ordered by code. Archived bins included.
    pub fn list(&self) -> WarehouseResult<Vec<Bin>> {
        self.handles()?
            .iter()
            .map(|h| lock(h).map(|b| b.clone()))
            .collect()
    }

    /// Non-archived storage bins of one size class, ordered by code. Staging
    /// bins are left out.
    pub fn bins_by_size(&self, size_class: SizeClass) -> WarehouseResult<Vec<Bin>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|b| b.kind() == BinKind::Storage && b.size_class() == size_class && !b.is_archived())
            .collect())
    }

    /// Bins eligible for `size_class`: storage bins, not archived, not in
    /// maintenance, exact size match, some room left. Ordered by remaining
    /// capacity descending, then code ascending.
    pub fn find_candidates(&self, size_class: SizeClass, required_qty: u32) -> WarehouseResult<Vec<Bin>> {
        let bins = self.list()?;
        let ranked = allocation::rank_candidates(&bins, size_class);
        tracing::debug!(
            size_class = %size_class,
            required_qty,
            candidates = ?ranked.iter().map(|c| c.bin_code.as_str()).collect::<Vec<_>>(),
            "allocation candidates"
        );

        let mut by_code: BTreeMap<BinCode, Bin> =
            bins.into_iter().map(|b| (b.code().clone(), b)).collect();
        Ok(ranked
            .iter()
            .filter_map(|c| by_code.remove(&c.bin_code))
            .collect())
    }

    /// Run `f` on one bin while holding its lock. If `f` fails it must leave
    /// the bin as it found it.
    pub fn with_bin<R>(
        &self,
        code: &BinCode,
        f: impl FnOnce(&mut Bin) -> WarehouseResult<R>,
    ) -> WarehouseResult<R> {
        let handle = self.handle(code)?;
        let mut bin = lock(&handle)?;
        f(&mut bin)
    }

    /// Hold both bins (in ascending code order) while `f` runs. When both
    /// codes are equal the bin is locked once and passed twice.
    pub fn with_pair<R>(
        &self,
        a: &BinCode,
        b: &BinCode,
        f: impl FnOnce(&Bin, &Bin) -> WarehouseResult<R>,
    ) -> WarehouseResult<R> {
        if a == b {
            let handle = self.handle(a)?;
            let bin = lock(&handle)?;
            return f(&bin, &bin);
        }

        let handle_a = self.handle(a)?;
        let handle_b = self.handle(b)?;
        let (first, second) = if a < b {
            (&handle_a, &handle_b)
        } else {
            (&handle_b, &handle_a)
        };
        let first = lock(first)?;
        let second = lock(second)?;

        if a < b { f(&first, &second) } else { f(&second, &first) }
    }

    /// Increment occupancy. Fails with `CapacityExceeded` past capacity.
    pub fn reserve(&self, code: &BinCode, qty: u32) -> WarehouseResult<Bin> {
        self.with_bin(code, |bin| {
            bin.reserve(qty)?;
            tracing::debug!(bin_code = %code, qty, occupied = bin.occupied(), "reserved");
            Ok(bin.clone())
        })
    }

    /// Reserve only if the bin is still a valid candidate for `size_class`;
    /// used by the allocator, which planned against an earlier snapshot.
    pub fn reserve_candidate(&self, code: &BinCode, size_class: SizeClass, qty: u32) -> WarehouseResult<Bin> {
        self.with_bin(code, |bin| {
            if !bin.is_candidate_for(size_class) {
                return Err(WarehouseError::concurrent(format!(
                    "bin {code} is no longer eligible for size {size_class}"
                )));
            }
            bin.reserve(qty)?;
            Ok(bin.clone())
        })
    }

    /// Decrement occupancy. Fails with `InvalidRelease` below zero.
    pub fn release(&self, code: &BinCode, qty: u32) -> WarehouseResult<Bin> {
        self.with_bin(code, |bin| {
            bin.release(qty)?;
            tracing::debug!(bin_code = %code, qty, occupied = bin.occupied(), "released");
            Ok(bin.clone())
        })
    }

    /// Idempotent. Returns whether the flag changed.
    pub fn set_maintenance(&self, code: &BinCode, enabled: bool) -> WarehouseResult<bool> {
        self.with_bin(code, |bin| Ok(bin.set_maintenance(enabled)))
    }

    pub fn archive(&self, code: &BinCode) -> WarehouseResult<bool> {
        self.with_bin(code, |bin| bin.archive())
    }

    pub fn restore(&self, code: &BinCode) -> WarehouseResult<bool> {
        self.with_bin(code, |bin| Ok(bin.restore()))
    }
}
