use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use solewms_core::{Actor, ExpectedVersion, UnitId};
use solewms_warehouse::{
    ActivityAction, ActivityFilter, Bin, BinCode, BinKind, BinStatus, SizeClass, WarehouseError, WarehouseResult,
};

use crate::service::CreateUnit;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateUnitRequest {
    pub unit_id: Option<String>,
    pub source_ref: String,
    pub sku: String,
    pub product_name: String,
    pub size_class: SizeClass,
    pub quantity: u32,
    /// Register as `InTransit` instead of `Arrived`.
    #[serde(default)]
    pub in_transit: bool,
    pub actor: Option<String>,
}

impl CreateUnitRequest {
    pub fn into_command(self) -> WarehouseResult<CreateUnit> {
        Ok(CreateUnit {
            unit_id: self.unit_id.map(UnitId::new).transpose()?,
            source_ref: self.source_ref,
            sku: self.sku,
            product_name: self.product_name,
            size_class: self.size_class,
            quantity: self.quantity,
            created_by: self.actor.map(Actor::new).transpose()?,
        })
    }
}

/// Body of the plain (non-scan) transition endpoints. Optional; an empty
/// body means the system actor with no version check.
#[derive(Debug, Default, Deserialize)]
pub struct TransitionRequest {
    pub actor: Option<String>,
    pub expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub scanned_code: String,
    pub actor: Option<String>,
    pub expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ReassignRequest {
    pub unit_id_a: String,
    pub unit_id_b: String,
    pub reason: String,
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterBinRequest {
    pub bin_code: String,
    pub size_class: SizeClass,
    pub capacity: u32,
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MaintenanceRequest {
    pub enabled: bool,
    pub actor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActorRequest {
    pub actor: Option<String>,
}

// -------------------------
// Query DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct BinsQuery {
    pub size_class: Option<SizeClass>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReassignmentsQuery {
    pub unit_id: Option<String>,
}

/// `action` takes the ledger's snake_case verb, e.g. `handed_off`.
#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub actor: Option<String>,
    pub action: Option<String>,
    pub unit_id: Option<String>,
    pub bin_code: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ActivityQuery {
    pub fn filter(&self) -> WarehouseResult<ActivityFilter> {
        Ok(ActivityFilter {
            actor: self.actor.clone().map(Actor::new).transpose()?,
            action: self.action.as_deref().map(parse_activity_action).transpose()?,
            unit_id: self.unit_id.as_deref().map(UnitId::new).transpose()?,
            bin_code: self.bin_code.as_deref().map(BinCode::new).transpose()?,
            since: self.since,
            until: self.until,
        })
    }
}

// -------------------------
// Response DTOs
// -------------------------

/// A bin as shown in the bin tables, with its derived status.
#[derive(Debug, Serialize)]
pub struct BinView {
    pub bin_code: BinCode,
    pub size_class: SizeClass,
    pub kind: BinKind,
    pub capacity: u32,
    pub occupied: u32,
    pub remaining: u32,
    pub status: BinStatus,
    pub archived: bool,
}

impl From<&Bin> for BinView {
    fn from(bin: &Bin) -> Self {
        Self {
            bin_code: bin.code().clone(),
            size_class: bin.size_class(),
            kind: bin.kind(),
            capacity: bin.capacity(),
            occupied: bin.occupied(),
            remaining: bin.remaining(),
            status: bin.status(),
            archived: bin.is_archived(),
        }
    }
}

pub fn bin_views(bins: &[Bin]) -> Vec<BinView> {
    bins.iter().map(BinView::from).collect()
}

// -------------------------
// Parsing helpers
// -------------------------

pub fn actor_or_system(actor: Option<String>) -> WarehouseResult<Actor> {
    match actor {
        Some(name) => Ok(Actor::new(name)?),
        None => Ok(Actor::system()),
    }
}

pub fn expected_version(version: Option<u64>) -> ExpectedVersion {
    ExpectedVersion::from(version)
}

pub fn parse_activity_action(s: &str) -> WarehouseResult<ActivityAction> {
    const ACTIONS: [ActivityAction; 17] = [
        ActivityAction::UnitCreated,
        ActivityAction::Allocated,
        ActivityAction::Arrived,
        ActivityAction::Accepted,
        ActivityAction::Stored,
        ActivityAction::Located,
        ActivityAction::Picked,
        ActivityAction::HandedOff,
        ActivityAction::Received,
        ActivityAction::Processing,
        ActivityAction::Completed,
        ActivityAction::Flagged,
        ActivityAction::Reassigned,
        ActivityAction::BinRegistered,
        ActivityAction::BinMaintenance,
        ActivityAction::BinArchived,
        ActivityAction::BinRestored,
    ];
    let wanted = s.trim().to_ascii_lowercase();
    ACTIONS
        .into_iter()
        .find(|action| action.as_str() == wanted)
        .ok_or_else(|| WarehouseError::validation(format!("unknown activity action '{s}'")))
}
