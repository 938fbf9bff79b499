//! Core types and storage abstractions for Berth
//!
//! This crate defines the vocabulary shared by every other crate:
//! - Identity and version types (`ResourceId`, `Version`, `RecordId`)
//! - Reservation input and booking output (`ReservationRequest`, `BookingRecord`)
//! - The error taxonomy (`Error`)
//! - The storage traits the coordinator consumes (`VersionedStore`, `BookingLedger`)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{Advance, BookingLedger, VersionedStore};
pub use types::{
    BookingRecord, DateRange, RecordId, Requester, ReservationRequest, Resource, ResourceId,
    Version,
};
