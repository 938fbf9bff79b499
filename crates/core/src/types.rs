//! Core types for the reservation engine
//!
//! This module defines the fundamental types used throughout the system:
//! - [`ResourceId`]: Identity of a reservable resource (a room)
//! - [`Version`]: Monotonic counter advanced once per committed reservation
//! - [`Resource`]: A resource record as held by a versioned store
//! - [`ReservationRequest`] / [`BookingRecord`]: the input and the durable
//!   result of a reservation

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a reservable resource
///
/// Opaque to the protocol. Matches the integer room id of the booking schema.
///
/// # Examples
///
/// ```
/// use berth_core::types::ResourceId;
///
/// let id = ResourceId::new(101);
/// assert_eq!(id.as_u64(), 101);
/// assert_eq!(id.to_string(), "101");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Create a ResourceId from its raw value
    pub const fn new(id: u64) -> Self {
        ResourceId(id)
    }

    /// Raw value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ResourceId {
    fn from(id: u64) -> Self {
        ResourceId(id)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Version counter of a resource
///
/// Starts at the value chosen on registration and is incremented by exactly
/// one for every committed reservation. Never decreases, never skips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// Version assigned when a resource is registered without an explicit one
    pub const INITIAL: Version = Version(0);

    /// Create a version from its raw value
    pub const fn new(v: u64) -> Self {
        Version(v)
    }

    /// Raw value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// The version that follows this one
    ///
    /// Returns `None` on overflow.
    pub fn next(&self) -> Option<Version> {
        self.0.checked_add(1).map(Version)
    }
}

impl From<u64> for Version {
    fn from(v: u64) -> Self {
        Version(v)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Identity of the party making a reservation (the guest)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Requester(String);

impl Requester {
    /// Create a requester identity
    pub fn new(name: impl Into<String>) -> Self {
        Requester(name.into())
    }

    /// Name as given by the caller
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Requester {
    fn from(name: &str) -> Self {
        Requester(name.to_string())
    }
}

impl From<String> for Requester {
    fn from(name: String) -> Self {
        Requester(name)
    }
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check-in / check-out pair
///
/// Carried through to the ledger untouched. Ordering and overlap are not
/// validated here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First night
    pub check_in: NaiveDate,
    /// Departure day
    pub check_out: NaiveDate,
}

impl DateRange {
    /// Create a date range
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Self {
        Self {
            check_in,
            check_out,
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.check_in, self.check_out)
    }
}

/// Identifier the ledger assigns to an appended booking
///
/// Allocated monotonically. Gaps may occur if an append fails after the id
/// was allocated; consumers must not assume contiguity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(u64);

impl RecordId {
    /// Create a record id from its raw value
    pub const fn new(id: u64) -> Self {
        RecordId(id)
    }

    /// Raw value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A resource as held by a versioned store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Identity
    pub id: ResourceId,
    /// Current version
    pub version: Version,
    /// Descriptive attributes, opaque to the protocol
    pub payload: serde_json::Value,
}

impl Resource {
    /// Create a resource at [`Version::INITIAL`]
    pub fn new(id: ResourceId, payload: serde_json::Value) -> Self {
        Self::with_version(id, Version::INITIAL, payload)
    }

    /// Create a resource with an explicit starting version
    pub fn with_version(id: ResourceId, version: Version, payload: serde_json::Value) -> Self {
        Self {
            id,
            version,
            payload,
        }
    }
}

/// A request to reserve a resource
///
/// Lives only for the duration of one reserve call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRequest {
    /// Resource to reserve
    pub resource_id: ResourceId,
    /// Who is reserving
    pub requester: Requester,
    /// Requested stay
    pub dates: DateRange,
    /// Version the requester last observed
    pub expected_version: Version,
}

impl ReservationRequest {
    /// Create a request
    pub fn new(
        resource_id: ResourceId,
        expected_version: Version,
        requester: impl Into<Requester>,
        dates: DateRange,
    ) -> Self {
        Self {
            resource_id,
            requester: requester.into(),
            dates,
            expected_version,
        }
    }
}

/// An immutable, committed booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    /// Booked resource
    pub resource_id: ResourceId,
    /// Who booked it
    pub requester: Requester,
    /// Booked stay
    pub dates: DateRange,
    /// Resource version produced by this booking's commit
    pub version: Version,
    /// Commit timestamp (milliseconds since epoch)
    pub committed_at: i64,
}

impl BookingRecord {
    /// Build the record for `request` committed at `version`
    pub fn for_request(request: &ReservationRequest, version: Version) -> Self {
        Self {
            resource_id: request.resource_id,
            requester: request.requester.clone(),
            dates: request.dates,
            version,
            committed_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}
