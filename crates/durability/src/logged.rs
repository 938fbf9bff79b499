//! WAL-backed store and ledger
//!
//! [`LoggedStore`] and [`LoggedLedger`] wrap the in-memory backends and
//! write every state change to a shared [`Wal`] before it becomes visible.
//! They are meant to be used as a pair over the same WAL: a reservation's
//! version advance is made durable by the ledger's `BookingCommitted` entry,
//! not by the store.
//!
//! ## Reservation Sequence
//!
//! ```text
//! LoggedStore::compare_and_advance_with(id, expected, hook)
//!   1. take the resource's write guard
//!   2. IF version != expected: return Stale
//!   3. hook(new_version) → LoggedLedger::append
//!        a. allocate record id
//!        b. WAL.append(BookingCommitted)   ← DURABILITY POINT
//!        c. insert into MemoryLedger
//!   4. publish new_version, release guard
//! ```
//!
//! If 3b fails nothing is visible anywhere: the record id becomes a gap and
//! the version is never published.

use crate::wal::WalEntry;
use crate::writer::Wal;
use berth_core::error::{Error, Result};
use berth_core::traits::{Advance, BookingLedger, VersionedStore};
use berth_core::types::{BookingRecord, RecordId, Resource, ResourceId, Version};
use berth_storage::{MemoryLedger, ShardedStore};
use std::sync::Arc;

/// Versioned store that logs registrations and bare advances
pub struct LoggedStore {
    store: ShardedStore,
    wal: Arc<Wal>,
}

impl LoggedStore {
    /// Wrap a store (typically one rebuilt by recovery)
    pub fn new(store: ShardedStore, wal: Arc<Wal>) -> Self {
        Self { store, wal }
    }

    /// The in-memory store
    pub fn inner(&self) -> &ShardedStore {
        &self.store
    }
}

impl VersionedStore for LoggedStore {
    fn register(&self, resource: Resource) -> Result<()> {
        self.store.register_with(resource, |resource| {
            self.wal
                .append(&WalEntry::ResourceRegistered {
                    resource: resource.clone(),
                })
                .map_err(into_storage_error)
        })
    }

    fn get(&self, id: ResourceId) -> Result<Version> {
        self.store.get(id)
    }

    fn resource(&self, id: ResourceId) -> Result<Resource> {
        self.store.resource(id)
    }

    /// Delegates without logging; the hook is expected to log the advance
    /// (as [`LoggedLedger::append`] does)
    fn compare_and_advance_with<T, F>(
        &self,
        id: ResourceId,
        expected: Version,
        commit: F,
    ) -> Result<Advance<T>>
    where
        F: FnOnce(Version) -> Result<T>,
    {
        self.store.compare_and_advance_with(id, expected, commit)
    }

    fn compare_and_advance(&self, id: ResourceId, expected: Version) -> Result<Advance<()>> {
        self.store.compare_and_advance_with(id, expected, |version| {
            self.wal
                .append(&WalEntry::VersionAdvanced {
                    resource_id: id,
                    version,
                })
                .map_err(into_storage_error)
        })
    }
}

/// Booking ledger that logs each record, with its version, before storing it
pub struct LoggedLedger {
    ledger: MemoryLedger,
    wal: Arc<Wal>,
}

impl LoggedLedger {
    /// Wrap a ledger (typically one rebuilt by recovery)
    pub fn new(ledger: MemoryLedger, wal: Arc<Wal>) -> Self {
        Self { ledger, wal }
    }

    /// The in-memory ledger
    pub fn inner(&self) -> &MemoryLedger {
        &self.ledger
    }
}

impl BookingLedger for LoggedLedger {
    fn append(&self, record: BookingRecord) -> Result<RecordId> {
        let record_id = self.ledger.allocate_id();
        self.wal
            .append(&WalEntry::BookingCommitted {
                record_id,
                record: record.clone(),
            })
            .map_err(|e| match e {
                Error::Io(io) => Error::LedgerWriteFailed(io.to_string()),
                other => other,
            })?;

        self.ledger.insert(record_id, record)?;
        Ok(record_id)
    }

    fn get(&self, id: RecordId) -> Result<Option<BookingRecord>> {
        self.ledger.get(id)
    }

    fn bookings_for(&self, resource_id: ResourceId) -> Result<Vec<(RecordId, BookingRecord)>> {
        self.ledger.bookings_for(resource_id)
    }

    fn len(&self) -> usize {
        self.ledger.len()
    }
}

/// Medium failures outside a booking are reported as unavailable storage
fn into_storage_error(e: Error) -> Error {
    match e {
        Error::Io(io) => Error::unavailable(io.to_string()),
        other => other,
    }
}
