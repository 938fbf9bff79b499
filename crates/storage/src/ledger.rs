//! In-memory booking ledger
//!
//! Append-only. Records are keyed by a monotonically allocated [`RecordId`]
//! and indexed per resource so audit reads for one room never scan others.

use berth_core::error::{Error, Result};
use berth_core::traits::BookingLedger;
use berth_core::types::{BookingRecord, RecordId, ResourceId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicU64, Ordering};

type FxBuildHasher = BuildHasherDefault<FxHasher>;

/// Append-only in-memory ledger
///
/// Ids start at 1. Allocation and insertion are separate steps so a
/// write-ahead layer can put the id into its log record before the record
/// becomes visible here; an id whose log write failed is simply never
/// inserted (a gap).
pub struct MemoryLedger {
    records: DashMap<RecordId, BookingRecord, FxBuildHasher>,
    by_resource: DashMap<ResourceId, Vec<RecordId>, FxBuildHasher>,
    /// Next id to hand out
    next_id: AtomicU64,
}

impl MemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self {
            records: DashMap::with_hasher(FxBuildHasher::default()),
            by_resource: DashMap::with_hasher(FxBuildHasher::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate the next record id without storing anything
    pub fn allocate_id(&self) -> RecordId {
        RecordId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Peek at the id the next allocation will return
    pub fn next_id(&self) -> RecordId {
        RecordId::new(self.next_id.load(Ordering::SeqCst))
    }

    /// Store a record under a previously allocated (or recovered) id
    ///
    /// Fails with `DuplicateRecord` if the id is already used, and with
    /// `Corruption` for an id no successor can follow. Inserting an id at or
    /// beyond the allocation cursor moves the cursor past it, which is how
    /// recovery restores allocation state.
    pub fn insert(&self, id: RecordId, record: BookingRecord) -> Result<()> {
        let after = id
            .as_u64()
            .checked_add(1)
            .ok_or_else(|| Error::Corruption(format!("record id {} is out of range", id)))?;
        let resource_id = record.resource_id;
        match self.records.entry(id) {
            Entry::Occupied(_) => return Err(Error::DuplicateRecord(id)),
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
        self.by_resource.entry(resource_id).or_default().push(id);
        self.next_id.fetch_max(after, Ordering::SeqCst);
        Ok(())
    }

    /// Number of resources with at least one booking
    pub fn resource_count(&self) -> usize {
        self.by_resource.len()
    }
}

impl BookingLedger for MemoryLedger {
    fn append(&self, record: BookingRecord) -> Result<RecordId> {
        let id = self.allocate_id();
        self.insert(id, record)?;
        Ok(id)
    }

    fn get(&self, id: RecordId) -> Result<Option<BookingRecord>> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    fn bookings_for(&self, resource_id: ResourceId) -> Result<Vec<(RecordId, BookingRecord)>> {
        let mut ids = self
            .by_resource
            .get(&resource_id)
            .map(|ids| ids.value().clone())
            .unwrap_or_default();
        ids.sort();

        Ok(ids
            .into_iter()
            .filter_map(|id| self.records.get(&id).map(|r| (id, r.value().clone())))
            .collect())
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLedger")
            .field("records", &self.records.len())
            .field("next_id", &self.next_id())
            .finish()
    }
}
