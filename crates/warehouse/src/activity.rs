//! Activity ledger entries and query filters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use solewms_core::{Actor, UnitId};

use crate::bin::BinCode;
use crate::unit::UnitState;

/// The enumerated verb of an activity entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityAction {
    UnitCreated,
    Allocated,
    Arrived,
    Accepted,
    Stored,
    Located,
    Picked,
    HandedOff,
    Received,
    Processing,
    Completed,
    Flagged,
    Reassigned,
    BinRegistered,
    BinMaintenance,
    BinArchived,
    BinRestored,
}

impl ActivityAction {
    /// The verb recorded for a transition into `state`.
    pub fn for_state(state: UnitState) -> Self {
        match state {
            UnitState::InTransit => ActivityAction::UnitCreated,
            UnitState::Arrived => ActivityAction::Arrived,
            UnitState::Accepted => ActivityAction::Accepted,
            UnitState::Stored => ActivityAction::Stored,
            UnitState::Located => ActivityAction::Located,
            UnitState::Picked => ActivityAction::Picked,
            UnitState::HandedOff => ActivityAction::HandedOff,
            UnitState::Received => ActivityAction::Received,
            UnitState::Processing => ActivityAction::Processing,
            UnitState::Completed => ActivityAction::Completed,
            UnitState::Flagged => ActivityAction::Flagged,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityAction::UnitCreated => "unit_created",
            ActivityAction::Allocated => "allocated",
            ActivityAction::Arrived => "arrived",
            ActivityAction::Accepted => "accepted",
            ActivityAction::Stored => "stored",
            ActivityAction::Located => "located",
            ActivityAction::Picked => "picked",
            ActivityAction::HandedOff => "handed_off",
            ActivityAction::Received => "received",
            ActivityAction::Processing => "processing",
            ActivityAction::Completed => "completed",
            ActivityAction::Flagged => "flagged",
            ActivityAction::Reassigned => "reassigned",
            ActivityAction::BinRegistered => "bin_registered",
            ActivityAction::BinMaintenance => "bin_maintenance",
            ActivityAction::BinArchived => "bin_archived",
            ActivityAction::BinRestored => "bin_restored",
        }
    }
}

impl core::fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entry as submitted to the ledger, before it is numbered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub actor: Actor,
    pub action: ActivityAction,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub ref_unit_id: Option<UnitId>,
    pub ref_bin_code: Option<BinCode>,
}

impl NewActivity {
    pub fn new(
        actor: Actor,
        action: ActivityAction,
        description: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            actor,
            action,
            description: description.into(),
            timestamp,
            ref_unit_id: None,
            ref_bin_code: None,
        }
    }

    pub fn unit(mut self, unit_id: &UnitId) -> Self {
        self.ref_unit_id = Some(unit_id.clone());
        self
    }

    pub fn bin(mut self, bin_code: Option<&BinCode>) -> Self {
        self.ref_bin_code = bin_code.cloned();
        self
    }

    pub fn into_entry(self, id: u64) -> ActivityEntry {
        ActivityEntry {
            id,
            actor: self.actor,
            action: self.action,
            description: self.description,
            timestamp: self.timestamp,
            ref_unit_id: self.ref_unit_id,
            ref_bin_code: self.ref_bin_code,
        }
    }
}

/// One immutable line of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Monotonic, assigned by the ledger.
    pub id: u64,
    pub actor: Actor,
    pub action: ActivityAction,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub ref_unit_id: Option<UnitId>,
    pub ref_bin_code: Option<BinCode>,
}

/// Filters for `GetActivity`. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityFilter {
    pub actor: Option<Actor>,
    pub action: Option<ActivityAction>,
    pub unit_id: Option<UnitId>,
    pub bin_code: Option<BinCode>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl ActivityFilter {
    pub fn matches(&self, entry: &ActivityEntry) -> bool {
        if let Some(actor) = &self.actor {
            if &entry.actor != actor {
                return false;
            }
        }
        if let Some(action) = self.action {
            if entry.action != action {
                return false;
            }
        }
        if let Some(unit_id) = &self.unit_id {
            if entry.ref_unit_id.as_ref() != Some(unit_id) {
                return false;
            }
        }
        if let Some(bin_code) = &self.bin_code {
            if entry.ref_bin_code.as_ref() != Some(bin_code) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if entry.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if entry.timestamp > until {
                return false;
            }
        }
        true
    }
}
