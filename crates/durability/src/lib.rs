//! Durability layer for Berth
//!
//! This crate implements write-ahead logging and recovery:
//! - WalEntry types: ResourceRegistered, VersionAdvanced, BookingCommitted
//! - Entry encoding/decoding with CRC32 checksums
//! - Durability modes: None, Strict, Batched (default)
//! - Wal: append with rollback of failed writes
//! - LoggedStore / LoggedLedger: log-before-apply wrappers over the
//!   in-memory backends
//! - Recovery: replay the WAL, truncating a torn tail

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod encoding;
pub mod logged;
pub mod mode;
pub mod recovery;
pub mod wal;
pub mod writer;

pub use encoding::{decode_entry, encode_entry, DecodeError};
pub use logged::{LoggedLedger, LoggedStore};
pub use mode::DurabilityMode;
pub use recovery::{recover, Recovered, RecoveryResult};
pub use wal::WalEntry;
pub use writer::{LogSink, Wal};
