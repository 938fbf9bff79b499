//! # Berth
//!
//! Optimistic-concurrency reservation engine for shared, versioned resources
//! such as hotel rooms.
//!
//! Every resource carries a version. A reservation names the version its
//! caller last saw; it commits only if that version is still current, and
//! then advances the version by one and records the booking in the same
//! indivisible step. Concurrent reservations from the same view produce one
//! commit and report `Conflict` with the current version to everyone else.
//! No locks are held between reading a version and reserving.
//!
//! ## Quick Start
//!
//! ```ignore
//! use berth::prelude::*;
//!
//! let berth = Berth::open("./hotel")?;
//! let room = ResourceId::new(101);
//! berth.register_room(room, &Room::new("101", "double", 129.0))?;
//!
//! let seen = berth.version(room)?;
//! let request = ReservationRequest::new(room, seen, "alice", stay);
//! let outcome = berth.reserve(&request);
//! println!("{} ({})", outcome, outcome.status_code());
//! ```
//!
//! ## Progressive Disclosure
//!
//! 1. **Outcome** - Every result as a value: `berth.reserve(&req)`
//! 2. **Result** - Failures as errors, conflict as a value: `berth.try_reserve(&req)`
//! 3. **Strict** - Conflict as an error too: `berth.book(&req)`
//!
//! ## Crates
//!
//! - `berth-core` - types, errors and the storage traits
//! - `berth-storage` - in-memory versioned store and booking ledger
//! - `berth-concurrency` - the reservation coordinator
//! - `berth-durability` - write-ahead log and recovery

#![warn(missing_docs)]

mod config;
mod database;
mod error;
mod types;

pub mod prelude;

// Re-export main entry points
pub use config::{BerthConfig, DurabilityConfig, ModeName};
pub use database::{Berth, BerthBuilder, BerthMetrics, WAL_FILE_NAME};
pub use error::{Error, Result};

// Re-export types
pub use types::*;

// Building blocks for custom stores and ledgers
pub use berth_concurrency::ReservationCoordinator;
pub use berth_core::traits::{Advance, BookingLedger, VersionedStore};
