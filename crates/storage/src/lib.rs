//! Storage layer for Berth
//!
//! This crate implements the in-memory backends for the core storage traits:
//! - ShardedStore: DashMap-sharded versioned resources with per-resource
//!   compare-and-advance
//! - MemoryLedger: append-only booking records with a per-resource index

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ledger;
pub mod sharded;

pub use ledger::MemoryLedger;
pub use sharded::ShardedStore;
