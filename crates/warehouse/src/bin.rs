//! Physical storage bins.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use solewms_core::{DomainError, Entity, ValueObject};

use crate::error::{WarehouseError, WarehouseResult};

/// Shoe-box size class a bin is racked for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SizeClass {
    S,
    M,
    L,
    XL,
    XXL,
}

impl SizeClass {
    pub const ALL: [SizeClass; 5] = [
        SizeClass::S,
        SizeClass::M,
        SizeClass::L,
        SizeClass::XL,
        SizeClass::XXL,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SizeClass::S => "S",
            SizeClass::M => "M",
            SizeClass::L => "L",
            SizeClass::XL => "XL",
            SizeClass::XXL => "XXL",
        }
    }
}

impl core::fmt::Display for SizeClass {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SizeClass {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "S" => Ok(SizeClass::S),
            "M" => Ok(SizeClass::M),
            "L" => Ok(SizeClass::L),
            "XL" => Ok(SizeClass::XL),
            "XXL" => Ok(SizeClass::XXL),
            other => Err(DomainError::validation(format!("unknown size class '{other}'"))),
        }
    }
}

impl ValueObject for SizeClass {}

/// Bin identity in `{zone}-{aisle}-{slot}` form, e.g. `A-01-05`.
///
/// Segments are upper-cased ASCII alphanumerics. Ordering is lexicographic on
/// the normalised code and is the lock order used when two bins are mutated
/// together.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BinCode(String);

impl BinCode {
    pub fn new(value: impl AsRef<str>) -> Result<Self, DomainError> {
        let value = value.as_ref().trim().to_ascii_uppercase();
        let segments: Vec<&str> = value.split('-').collect();
        if segments.len() != 3 {
            return Err(DomainError::invalid_id(format!(
                "BinCode: '{value}' must have the form ZONE-AISLE-SLOT"
            )));
        }
        if segments
            .iter()
            .any(|s| s.is_empty() || !s.chars().all(|c| c.is_ascii_alphanumeric()))
        {
            return Err(DomainError::invalid_id(format!(
                "BinCode: '{value}' has an empty or non-alphanumeric segment"
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn segment(&self, idx: usize) -> &str {
        self.0.split('-').nth(idx).unwrap_or_default()
    }

    pub fn zone(&self) -> &str {
        self.segment(0)
    }

    pub fn aisle(&self) -> &str {
        self.segment(1)
    }

    pub fn slot(&self) -> &str {
        self.segment(2)
    }
}

impl core::fmt::Display for BinCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BinCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for BinCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BinCode> for String {
    fn from(value: BinCode) -> Self {
        value.0
    }
}

impl ValueObject for BinCode {}

/// What a bin is used for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinKind {
    /// Regular racking, eligible for allocation.
    Storage,
    /// Overflow/staging area. Never offered as an allocation candidate.
    Staging,
}

/// Derived occupancy status, with the operator-set maintenance override.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinStatus {
    Available,
    Occupied,
    Full,
    Maintenance,
}

impl core::fmt::Display for BinStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            BinStatus::Available => "Available",
            BinStatus::Occupied => "Occupied",
            BinStatus::Full => "Full",
            BinStatus::Maintenance => "Maintenance",
        };
        f.write_str(s)
    }
}

/// A physical storage slot.
///
/// Invariant: `occupied <= capacity`. Mutators check before changing anything,
/// so a failed call leaves the bin untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bin {
    code: BinCode,
    size_class: SizeClass,
    kind: BinKind,
    capacity: u32,
    occupied: u32,
    maintenance: bool,
    archived: bool,
}

impl Bin {
    pub fn new(code: BinCode, size_class: SizeClass, capacity: u32) -> WarehouseResult<Self> {
        Self::with_kind(code, size_class, BinKind::Storage, capacity)
    }

    /// Staging bins are racked as XXL so any carton fits.
    pub fn staging(code: BinCode, capacity: u32) -> WarehouseResult<Self> {
        Self::with_kind(code, SizeClass::XXL, BinKind::Staging, capacity)
    }

    fn with_kind(
        code: BinCode,
        size_class: SizeClass,
        kind: BinKind,
        capacity: u32,
    ) -> WarehouseResult<Self> {
        if capacity == 0 {
            return Err(WarehouseError::validation(format!(
                "bin {code} capacity must be positive"
            )));
        }
        Ok(Self {
            code,
            size_class,
            kind,
            capacity,
            occupied: 0,
            maintenance: false,
            archived: false,
        })
    }

    pub fn code(&self) -> &BinCode {
        &self.code
    }

    pub fn size_class(&self) -> SizeClass {
        self.size_class
    }

    pub fn kind(&self) -> BinKind {
        self.kind
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn occupied(&self) -> u32 {
        self.occupied
    }

    pub fn remaining(&self) -> u32 {
        self.capacity - self.occupied
    }

    pub fn is_archived(&self) -> bool {
        self.archived
    }

    pub fn in_maintenance(&self) -> bool {
        self.maintenance
    }

    pub fn status(&self) -> BinStatus {
        if self.maintenance {
            BinStatus::Maintenance
        } else if self.occupied == 0 {
            BinStatus::Available
        } else if self.occupied == self.capacity {
            BinStatus::Full
        } else {
            BinStatus::Occupied
        }
    }

    /// Whether the allocator may offer this bin for `size_class`.
    pub fn is_candidate_for(&self, size_class: SizeClass) -> bool {
        self.kind == BinKind::Storage
            && !self.archived
            && !self.maintenance
            && self.size_class == size_class
            && self.remaining() > 0
    }

    /// Refuse new stock while archived or under maintenance. Existing
    /// occupancy is unaffected.
    pub fn ensure_accepts_stock(&self) -> WarehouseResult<()> {
        let reason = if self.archived {
            "archived"
        } else if self.maintenance {
            "under maintenance"
        } else {
            return Ok(());
        };
        Err(WarehouseError::BinUnavailable {
            bin_code: self.code.clone(),
            reason: reason.to_string(),
        })
    }

    pub fn reserve(&mut self, qty: u32) -> WarehouseResult<()> {
        if qty == 0 {
            return Err(WarehouseError::validation("reserve quantity must be positive"));
        }
        if qty > self.remaining() {
            return Err(WarehouseError::CapacityExceeded {
                bin_code: self.code.clone(),
                capacity: self.capacity,
                occupied: self.occupied,
                requested: qty,
            });
        }
        self.occupied += qty;
        Ok(())
    }

    pub fn release(&mut self, qty: u32) -> WarehouseResult<()> {
        if qty > self.occupied {
            return Err(WarehouseError::InvalidRelease {
                bin_code: self.code.clone(),
                occupied: self.occupied,
                requested: qty,
            });
        }
        self.occupied -= qty;
        Ok(())
    }

    /// Returns whether the flag actually changed.
    pub fn set_maintenance(&mut self, enabled: bool) -> bool {
        let changed = self.maintenance != enabled;
        self.maintenance = enabled;
        changed
    }

    pub fn archive(&mut self) -> WarehouseResult<bool> {
        if self.occupied > 0 {
            return Err(WarehouseError::BinNotEmpty {
                bin_code: self.code.clone(),
                occupied: self.occupied,
            });
        }
        let changed = !self.archived;
        self.archived = true;
        Ok(changed)
    }

    pub fn restore(&mut self) -> bool {
        let changed = self.archived;
        self.archived = false;
        changed
    }
}

impl Entity for Bin {
    type Id = BinCode;

    fn id(&self) -> &Self::Id {
        &self.code
    }
}
