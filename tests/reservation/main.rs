//! Reservation Test Suite
//!
//! End-to-end tests of the optimistic reservation protocol through the
//! `Berth` facade and through the coordinator over custom backends.
//!
//! ## Key Verification Points
//!
//! 1. Exactly one of N same-version reservations commits
//! 2. Versions advance by exactly one per commit
//! 3. Every version advance has exactly one booking, and the reverse
//! 4. Failed bookings never advance a version
//! 5. Recovery rebuilds the same pairing from the log
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test reservation
//!
//! # Concurrency tests only
//! cargo test --test reservation concurrency::
//! ```

use berth::prelude::*;
use chrono::NaiveDate;

pub mod durability;
pub mod failures;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// Route library logs to the test harness (once per process)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// A stay of `nights` nights starting on the given day of March 2025
pub fn stay(day: u32, nights: u32) -> DateRange {
    let check_in = NaiveDate::from_ymd_opt(2025, 3, day).expect("valid day");
    DateRange::new(check_in, check_in + chrono::Days::new(nights as u64))
}

/// Standard room payload
pub fn room(number: u64) -> Room {
    Room::new(number.to_string(), "double", 135.0)
}

/// Ephemeral instance with rooms registered at the given versions
pub fn berth_with(rooms: &[(u64, u64)]) -> Berth {
    init_tracing();
    let berth = Berth::ephemeral().expect("ephemeral berth");
    for &(id, version) in rooms {
        register_at(&berth, id, version);
    }
    berth
}

/// Register a room with a starting version
pub fn register_at(berth: &Berth, id: u64, version: u64) {
    let payload = serde_json::to_value(room(id)).expect("room payload");
    berth
        .register(Resource::with_version(
            ResourceId::new(id),
            Version::new(version),
            payload,
        ))
        .expect("register room");
}

/// Request for `id` from `who`, expecting `version`
pub fn request(id: u64, version: u64, who: &str) -> ReservationRequest {
    ReservationRequest::new(ResourceId::new(id), Version::new(version), who, stay(10, 2))
}

/// Assert that version advances and bookings of a resource pair up:
/// the version sits `bookings` above `base`, and bookings carry
/// base+1, base+2, ... in record order.
pub fn assert_paired(berth: &Berth, id: u64, base: u64) {
    let id = ResourceId::new(id);
    let bookings = berth.bookings(id).expect("bookings");
    let version = berth.version(id).expect("version");

    assert_eq!(
        version.as_u64(),
        base + bookings.len() as u64,
        "version and booking count diverged for resource {}",
        id
    );
    for (i, (_, record)) in bookings.iter().enumerate() {
        assert_eq!(record.version.as_u64(), base + 1 + i as u64);
        assert_eq!(record.resource_id, id);
    }
}
