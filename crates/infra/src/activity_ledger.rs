//! Activity Ledger: append-only audit trail plus the reassignment log.
//!
//! Entries are numbered monotonically under one lock and published to the
//! event bus once stored, before that lock is released, so every feed sees
//! ids in ascending order. A failed publish is logged and never undoes the
//! append.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use solewms_core::UnitId;
use solewms_events::{EventBus, InMemoryEventBus, Subscription};
use solewms_warehouse::{
    ActivityEntry, ActivityFilter, NewActivity, ReassignmentRecord, WarehouseError, WarehouseResult,
};

use crate::config::MAX_ACTIVITY_PAGE_LIMIT;

/// Pagination parameters for activity queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: limit.clamp(1, MAX_ACTIVITY_PAGE_LIMIT),
            offset,
        }
    }
}

/// One page of activity, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityPage {
    pub entries: Vec<ActivityEntry>,
    /// Entries matching the filter across all pages.
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

pub trait ActivityLedger: Send + Sync + core::fmt::Debug {
    /// Append a batch atomically: all entries get ids or none do.
    fn append(&self, entries: Vec<NewActivity>) -> WarehouseResult<Vec<ActivityEntry>>;

    /// Append a reassignment record and its activity entry atomically.
    fn append_reassignment(
        &self,
        record: ReassignmentRecord,
        entry: NewActivity,
    ) -> WarehouseResult<ActivityEntry>;

    fn query(&self, filter: &ActivityFilter, pagination: Pagination) -> WarehouseResult<ActivityPage>;

    /// Reassignment records, newest first, optionally only those involving `unit_id`.
    fn reassignments(&self, unit_id: Option<&UnitId>) -> WarehouseResult<Vec<ReassignmentRecord>>;

    /// Live feed of entries committed after this call.
    fn subscribe(&self) -> Subscription<ActivityEntry>;
}

#[derive(Debug, Default)]
struct LedgerState {
    entries: Vec<ActivityEntry>,
    reassignments: Vec<ReassignmentRecord>,
    last_id: u64,
}

impl LedgerState {
    fn number(&mut self, entries: Vec<NewActivity>) -> Vec<ActivityEntry> {
        entries
            .into_iter()
            .map(|e| {
                self.last_id += 1;
                e.into_entry(self.last_id)
            })
            .collect()
    }
}

#[derive(Debug)]
pub struct InMemoryActivityLedger<B = InMemoryEventBus<ActivityEntry>> {
    state: RwLock<LedgerState>,
    bus: B,
}

impl InMemoryActivityLedger {
    pub fn new() -> Self {
        Self::with_bus(InMemoryEventBus::new())
    }
}

impl Default for InMemoryActivityLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> InMemoryActivityLedger<B>
where
    B: EventBus<ActivityEntry>,
{
    pub fn with_bus(bus: B) -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
            bus,
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call with the state write lock held.
    fn publish(&self, entries: &[ActivityEntry]) {
        if let Err(e) = self.bus.publish_batch(entries) {
            let first = entries.first().map(|e| e.id);
            tracing::warn!(first_entry_id = ?first, count = entries.len(), error = ?e, "activity publish failed");
        }
    }
}

fn poisoned() -> WarehouseError {
    WarehouseError::poisoned("activity ledger")
}

impl<B> ActivityLedger for InMemoryActivityLedger<B>
where
    B: EventBus<ActivityEntry> + core::fmt::Debug,
{
    fn append(&self, entries: Vec<NewActivity>) -> WarehouseResult<Vec<ActivityEntry>> {
        if entries.is_empty() {
            return Ok(vec![]);
        }
        let mut state = self.state.write().map_err(|_| poisoned())?;
        let committed = state.number(entries);
        state.entries.extend(committed.iter().cloned());
        self.publish(&committed);
        Ok(committed)
    }

    fn append_reassignment(
        &self,
        record: ReassignmentRecord,
        entry: NewActivity,
    ) -> WarehouseResult<ActivityEntry> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        let mut numbered = state.number(vec![entry]);
        let committed = numbered
            .pop()
            .ok_or_else(|| WarehouseError::Ledger("reassignment entry was not numbered".to_string()))?;
        state.entries.push(committed.clone());
        state.reassignments.push(record);
        self.publish(std::slice::from_ref(&committed));
        Ok(committed)
    }

    fn query(&self, filter: &ActivityFilter, pagination: Pagination) -> WarehouseResult<ActivityPage> {
        let pagination = Pagination::new(pagination.limit, pagination.offset);
        let state = self.state.read().map_err(|_| poisoned())?;

        let mut matching: Vec<&ActivityEntry> =
            state.entries.iter().filter(|e| filter.matches(e)).collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let entries: Vec<ActivityEntry> = matching
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .cloned()
            .collect();
        let has_more = u64::from(pagination.offset) + (entries.len() as u64) < total;

        Ok(ActivityPage {
            entries,
            total,
            pagination,
            has_more,
        })
    }

    fn reassignments(&self, unit_id: Option<&UnitId>) -> WarehouseResult<Vec<ReassignmentRecord>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state
            .reassignments
            .iter()
            .rev()
            .filter(|r| unit_id.is_none_or(|id| r.involves(id)))
            .cloned()
            .collect())
    }

    fn subscribe(&self) -> Subscription<ActivityEntry> {
        self.bus.subscribe()
    }
}
