//! WAL (Write-Ahead Log) entry types
//!
//! This module defines all WAL entry types for the durability layer:
//! - ResourceRegistered: a resource was provisioned
//! - VersionAdvanced: a bare compare-and-advance outside any reservation
//! - BookingCommitted: a reservation committed
//!
//! CRITICAL: BookingCommitted carries both the booking and the version it
//! produced. That single entry is the durability point of a reservation, so
//! a version advance can never be recovered without its booking or the
//! other way round.

use berth_core::types::{BookingRecord, RecordId, Resource, ResourceId, Version};
use serde::{Deserialize, Serialize};

/// WAL entry types
///
/// Each entry represents a state-changing operation that must be persisted
/// before it becomes visible in memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum WalEntry {
    /// Resource provisioned with its starting version and payload
    ResourceRegistered {
        /// The resource as registered
        resource: Resource,
    },

    /// Version advanced without a booking
    VersionAdvanced {
        /// Resource advanced
        resource_id: ResourceId,
        /// Version after the advance
        version: Version,
    },

    /// Reservation committed
    ///
    /// Replay sets the resource to `record.version` and inserts the record.
    BookingCommitted {
        /// Ledger id of the booking
        record_id: RecordId,
        /// The booking, tagged with the version it produced
        record: BookingRecord,
    },
}
