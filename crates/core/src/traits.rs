//! Storage abstractions consumed by the reservation coordinator
//!
//! The coordinator is written against these two traits only. Any storage
//! technology can back it as long as [`VersionedStore::compare_and_advance_with`]
//! is indivisible per resource.

use crate::error::Result;
use crate::types::{BookingRecord, RecordId, Resource, ResourceId, Version};

/// Result of a compare-and-advance attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance<T> {
    /// Expected version matched; the resource now holds `version`
    Advanced {
        /// The new (published) version
        version: Version,
        /// Value returned by the commit hook
        value: T,
    },
    /// Expected version did not match; nothing changed
    Stale {
        /// Version observed under the resource's guard
        current: Version,
    },
}

impl<T> Advance<T> {
    /// True if the advance was applied
    pub fn is_advanced(&self) -> bool {
        matches!(self, Advance::Advanced { .. })
    }
}

/// Durable storage of versioned resources
///
/// # Thread Safety
///
/// Implementations must make `compare_and_advance_with` indivisible with
/// respect to every other `get` and compare-and-advance on the same
/// resource: no observer may see a version between the check and the
/// publication of the increment. Operations on different resources must not
/// contend with each other.
pub trait VersionedStore: Send + Sync {
    /// Register a new resource
    ///
    /// Fails with `ResourceExists` if the id is taken.
    fn register(&self, resource: Resource) -> Result<()>;

    /// Current version of a resource
    ///
    /// Fails with `ResourceNotFound` if no such resource exists.
    fn get(&self, id: ResourceId) -> Result<Version>;

    /// Full resource record (version and payload)
    fn resource(&self, id: ResourceId) -> Result<Resource>;

    /// Atomically advance the version by one if it equals `expected`,
    /// running `commit` with the new version before publishing it
    ///
    /// If `commit` fails the new version is never published and the error is
    /// returned unchanged. `commit` runs while the resource is held, so it
    /// must not call back into this store for the same resource.
    fn compare_and_advance_with<T, F>(
        &self,
        id: ResourceId,
        expected: Version,
        commit: F,
    ) -> Result<Advance<T>>
    where
        F: FnOnce(Version) -> Result<T>;

    /// Atomically advance the version by one if it equals `expected`
    fn compare_and_advance(&self, id: ResourceId, expected: Version) -> Result<Advance<()>> {
        self.compare_and_advance_with(id, expected, |_| Ok(()))
    }
}

/// Append-only storage of committed bookings
pub trait BookingLedger: Send + Sync {
    /// Durably store a record and return its id
    fn append(&self, record: BookingRecord) -> Result<RecordId>;

    /// Look up a record by id
    fn get(&self, id: RecordId) -> Result<Option<BookingRecord>>;

    /// All records for a resource, ordered by record id
    fn bookings_for(&self, resource_id: ResourceId) -> Result<Vec<(RecordId, BookingRecord)>>;

    /// Number of records
    fn len(&self) -> usize;

    /// True if no record has been appended
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
