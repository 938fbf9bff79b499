//! Public types for the Berth API.
//!
//! This module re-exports types from internal crates with a clean public
//! interface, and defines the room payload.

use serde::{Deserialize, Serialize};

// Identity and versioning
pub use berth_core::types::{RecordId, ResourceId, Version};

// Requests and bookings
pub use berth_core::types::{BookingRecord, DateRange, Requester, ReservationRequest, Resource};

// Reservation results
pub use berth_concurrency::{MetricsSnapshot, Reservation, ReservationOutcome};

// Durability
pub use berth_durability::{DurabilityMode, RecoveryResult};

/// A hotel room, stored as a resource's payload.
///
/// The protocol never reads these fields; they travel with the resource so
/// hosts can list and display what was booked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Room number as printed on the door
    pub number: String,
    /// Category, e.g. "double" or "suite"
    pub room_type: String,
    /// Nightly rate
    pub price_per_night: f64,
}

impl Room {
    /// Create a room description.
    pub fn new(number: impl Into<String>, room_type: impl Into<String>, price_per_night: f64) -> Self {
        Self {
            number: number.into(),
            room_type: room_type.into(),
            price_per_night,
        }
    }
}
