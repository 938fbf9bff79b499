//! Failure Injection Tests
//!
//! The coordinator over the logged store and ledger, with a log medium
//! that fails on command, and over a store that cannot be reached.

use crate::*;
use berth::{Advance, BookingLedger, ReservationCoordinator, VersionedStore};
use berth_durability::{recover, LogSink, LoggedLedger, LoggedStore, Wal};
use berth_storage::{MemoryLedger, ShardedStore};
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// =============================================================================
// Test doubles
// =============================================================================

/// Log medium held in memory, with switchable write and rollback failures
#[derive(Clone, Default)]
struct FlakyMedium {
    bytes: Arc<Mutex<Vec<u8>>>,
    fail_writes: Arc<AtomicBool>,
    fail_rollback: Arc<AtomicBool>,
}

impl LogSink for FlakyMedium {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            // A partial frame reaches the medium before the error
            self.bytes.lock().extend_from_slice(&bytes[..bytes.len() / 3]);
            return Err(io::Error::new(io::ErrorKind::Other, "device error"));
        }
        self.bytes.lock().extend_from_slice(bytes);
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        if self.fail_rollback.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "device gone"));
        }
        self.bytes.lock().truncate(len as usize);
        Ok(())
    }
}

type LoggedCoordinator = ReservationCoordinator<LoggedStore, LoggedLedger>;

fn logged_coordinator(medium: &FlakyMedium, rooms: &[(u64, u64)]) -> LoggedCoordinator {
    init_tracing();
    let wal = Arc::new(
        Wal::from_sink(Box::new(medium.clone()), 0, DurabilityMode::Strict).unwrap(),
    );
    let store = LoggedStore::new(ShardedStore::new(), Arc::clone(&wal));
    for &(id, version) in rooms {
        store
            .register(Resource::with_version(
                ResourceId::new(id),
                Version::new(version),
                serde_json::Value::Null,
            ))
            .unwrap();
    }
    let ledger = LoggedLedger::new(MemoryLedger::new(), wal);
    ReservationCoordinator::new(Arc::new(store), Arc::new(ledger))
}

/// Replay what the medium holds, as recovery would after a restart
fn replay(medium: &FlakyMedium) -> berth_durability::Recovered {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("replay.wal");
    std::fs::write(&path, medium.bytes.lock().as_slice()).unwrap();
    recover(&path).unwrap()
}

/// Store whose medium is unreachable
struct UnreachableStore;

impl VersionedStore for UnreachableStore {
    fn register(&self, _resource: Resource) -> berth_core::Result<()> {
        Err(berth_core::Error::unavailable("connection refused"))
    }

    fn get(&self, _id: ResourceId) -> berth_core::Result<Version> {
        Err(berth_core::Error::unavailable("connection refused"))
    }

    fn resource(&self, _id: ResourceId) -> berth_core::Result<Resource> {
        Err(berth_core::Error::unavailable("connection refused"))
    }

    fn compare_and_advance_with<T, F>(
        &self,
        _id: ResourceId,
        _expected: Version,
        _commit: F,
    ) -> berth_core::Result<Advance<T>>
    where
        F: FnOnce(Version) -> berth_core::Result<T>,
    {
        Err(berth_core::Error::unavailable("connection refused"))
    }
}

fn req(id: u64, version: u64) -> ReservationRequest {
    request(id, version, "mallory")
}

// =============================================================================
// Ledger write failures
// =============================================================================

#[test]
fn ledger_failure_does_not_advance_version() {
    let medium = FlakyMedium::default();
    let coordinator = logged_coordinator(&medium, &[(1, 3)]);
    medium.fail_writes.store(true, Ordering::SeqCst);

    let outcome = coordinator.reserve(&req(1, 3));
    assert!(matches!(outcome, ReservationOutcome::LedgerWriteFailed { .. }));
    assert_eq!(outcome.status_code(), 500);

    assert_eq!(coordinator.store().get(ResourceId::new(1)).unwrap(), Version::new(3));
    assert!(coordinator.ledger().is_empty());
}

#[test]
fn ledger_failure_is_rolled_back_on_the_medium() {
    let medium = FlakyMedium::default();
    let coordinator = logged_coordinator(&medium, &[(1, 0)]);
    assert!(coordinator.reserve(&req(1, 0)).is_committed());
    let good_len = medium.bytes.lock().len();

    medium.fail_writes.store(true, Ordering::SeqCst);
    assert!(coordinator.reserve(&req(1, 1)).is_failure());
    assert_eq!(medium.bytes.lock().len(), good_len);

    // Recovery sees exactly the committed history
    let recovered = replay(&medium);
    assert_eq!(recovered.store.get(ResourceId::new(1)).unwrap(), Version::new(1));
    assert_eq!(recovered.ledger.len(), 1);
    assert_eq!(recovered.result.truncated_bytes, 0);
}

#[test]
fn service_resumes_after_transient_failure() {
    let medium = FlakyMedium::default();
    let coordinator = logged_coordinator(&medium, &[(1, 0)]);

    medium.fail_writes.store(true, Ordering::SeqCst);
    assert!(coordinator.reserve(&req(1, 0)).is_failure());
    medium.fail_writes.store(false, Ordering::SeqCst);

    // The same view is still current and now commits
    assert_eq!(coordinator.reserve(&req(1, 0)).version(), Some(Version::new(1)));

    let recovered = replay(&medium);
    let bookings = recovered.ledger.bookings_for(ResourceId::new(1)).unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].1.version, Version::new(1));
}

#[test]
fn failed_record_id_becomes_a_gap() {
    let medium = FlakyMedium::default();
    let coordinator = logged_coordinator(&medium, &[(1, 0)]);

    let first = match coordinator.try_reserve(&req(1, 0)).unwrap() {
        Reservation::Committed { record_id, .. } => record_id,
        other => panic!("expected commit, got {:?}", other),
    };

    medium.fail_writes.store(true, Ordering::SeqCst);
    assert!(coordinator.try_reserve(&req(1, 1)).is_err());
    medium.fail_writes.store(false, Ordering::SeqCst);

    let second = match coordinator.try_reserve(&req(1, 1)).unwrap() {
        Reservation::Committed { record_id, .. } => record_id,
        other => panic!("expected commit, got {:?}", other),
    };

    assert!(second.as_u64() > first.as_u64() + 1);
    assert_eq!(coordinator.ledger().len(), 2);
}

// =============================================================================
// Rollback failures
// =============================================================================

#[test]
fn failed_rollback_reports_inconsistent_storage() {
    let medium = FlakyMedium::default();
    let coordinator = logged_coordinator(&medium, &[(1, 3)]);
    medium.fail_writes.store(true, Ordering::SeqCst);
    medium.fail_rollback.store(true, Ordering::SeqCst);

    let outcome = coordinator.reserve(&req(1, 3));
    assert!(matches!(
        outcome,
        ReservationOutcome::StorageUnavailable {
            inconsistent: true,
            ..
        }
    ));
    assert_eq!(outcome.status_code(), 503);
    assert_eq!(coordinator.store().get(ResourceId::new(1)).unwrap(), Version::new(3));
    assert!(coordinator.ledger().is_empty());
}

#[test]
fn poisoned_log_refuses_further_bookings() {
    let medium = FlakyMedium::default();
    let coordinator = logged_coordinator(&medium, &[(1, 0), (2, 0)]);
    medium.fail_writes.store(true, Ordering::SeqCst);
    medium.fail_rollback.store(true, Ordering::SeqCst);
    coordinator.reserve(&req(1, 0));

    // Medium recovers, but the log tail is still unknown
    medium.fail_writes.store(false, Ordering::SeqCst);
    medium.fail_rollback.store(false, Ordering::SeqCst);

    let outcome = coordinator.reserve(&req(2, 0));
    assert!(matches!(
        outcome,
        ReservationOutcome::StorageUnavailable {
            inconsistent: true,
            ..
        }
    ));
    assert_eq!(coordinator.store().get(ResourceId::new(2)).unwrap(), Version::INITIAL);
    assert_eq!(coordinator.metrics().failures, 2);
}

#[test]
fn torn_tail_left_by_failed_rollback_is_dropped_on_recovery() {
    let medium = FlakyMedium::default();
    let coordinator = logged_coordinator(&medium, &[(1, 0)]);
    assert!(coordinator.reserve(&req(1, 0)).is_committed());

    medium.fail_writes.store(true, Ordering::SeqCst);
    medium.fail_rollback.store(true, Ordering::SeqCst);
    coordinator.reserve(&req(1, 1));

    let recovered = replay(&medium);
    assert!(recovered.result.truncated_bytes > 0);
    assert_eq!(recovered.store.get(ResourceId::new(1)).unwrap(), Version::new(1));
    assert_eq!(recovered.ledger.len(), 1);
}

// =============================================================================
// Unreachable store
// =============================================================================

#[test]
fn unreachable_store_is_not_a_conflict() {
    init_tracing();
    let coordinator =
        ReservationCoordinator::new(Arc::new(UnreachableStore), Arc::new(MemoryLedger::new()));

    let outcome = coordinator.reserve(&req(1, 0));
    assert!(!outcome.is_conflict());
    assert_eq!(
        outcome,
        ReservationOutcome::StorageUnavailable {
            reason: "connection refused".into(),
            inconsistent: false
        }
    );
    assert!(coordinator.ledger().is_empty());
}

#[test]
fn unreachable_store_through_facade_error() {
    let coordinator =
        ReservationCoordinator::new(Arc::new(UnreachableStore), Arc::new(MemoryLedger::new()));

    let err: berth::Error = coordinator.try_reserve(&req(1, 0)).unwrap_err().into();
    assert!(!err.is_conflict());
    assert!(!err.is_retryable());
    assert!(matches!(err, berth::Error::StorageUnavailable { .. }));
}
