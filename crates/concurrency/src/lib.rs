//! Concurrency layer for Berth
//!
//! This crate implements the optimistic reservation protocol:
//! - ReservationCoordinator: read, compare, then compare-and-advance with the
//!   booking appended inside the advance
//! - Reservation / ReservationOutcome: committed, conflict, or failure
//! - CoordinatorMetrics: outcome counters
//!
//! The coordinator is generic over [`VersionedStore`] and [`BookingLedger`];
//! it never locks anything itself.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod metrics;
pub mod outcome;

pub use coordinator::ReservationCoordinator;
pub use metrics::{CoordinatorMetrics, MetricsSnapshot};
pub use outcome::{Reservation, ReservationOutcome};

// Re-export the storage traits from core for convenience
pub use berth_core::traits::{BookingLedger, VersionedStore};
