//! Convenient imports for Berth.
//!
//! This module re-exports the most commonly used types so you can get started
//! with a single import:
//!
//! ```ignore
//! use berth::prelude::*;
//!
//! let berth = Berth::open("./hotel")?;
//! berth.register_room(ResourceId::new(1), &Room::new("1", "single", 80.0))?;
//! ```

// Main entry point
pub use crate::database::{Berth, BerthBuilder, BerthMetrics};

// Configuration
pub use crate::config::BerthConfig;

// Error handling
pub use crate::error::{Error, Result};

// Core types
pub use crate::types::{
    BookingRecord, DateRange, DurabilityMode, RecordId, Requester, ReservationRequest, Resource,
    ResourceId, Room, Version,
};

// Reservation results
pub use crate::types::{Reservation, ReservationOutcome};

// Re-export serde_json for convenience
pub use serde_json::json;
