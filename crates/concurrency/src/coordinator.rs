//! Reservation coordinator
//!
//! Runs the optimistic protocol for one request at a time, over any
//! [`VersionedStore`] and [`BookingLedger`]:
//!
//! ## Reservation Sequence
//!
//! ```text
//! 1. store.get(id)                       ← fast path, may be stale already
//! 2. IF version != expected: Conflict(version)
//! 3. store.compare_and_advance_with(id, expected, |v| ledger.append(booking@v))
//!      Stale { current }  → Conflict(current)   (lost the race after step 1)
//!      Advanced           → Committed(v, record_id)
//!      Err(e)             → e, version not published
//! ```
//!
//! Step 3 is the decisive check. The coordinator never writes on the
//! strength of its own read and never retries.

use crate::metrics::{CoordinatorMetrics, MetricsSnapshot};
use crate::outcome::{Reservation, ReservationOutcome};
use berth_core::error::Result;
use berth_core::traits::{Advance, BookingLedger, VersionedStore};
use berth_core::types::{BookingRecord, ReservationRequest};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Executes reservations against a store and a ledger
///
/// Holds no state of its own beyond outcome counters; clone the `Arc`s to
/// share the backends with other components. `Send + Sync` whenever the
/// backends are, so one coordinator can serve every thread.
pub struct ReservationCoordinator<S, L> {
    store: Arc<S>,
    ledger: Arc<L>,
    metrics: CoordinatorMetrics,
}

impl<S, L> ReservationCoordinator<S, L>
where
    S: VersionedStore,
    L: BookingLedger,
{
    /// Create a coordinator over shared backends
    pub fn new(store: Arc<S>, ledger: Arc<L>) -> Self {
        Self {
            store,
            ledger,
            metrics: CoordinatorMetrics::new(),
        }
    }

    /// The versioned store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The booking ledger
    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    /// Outcome counters so far
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Attempt a reservation
    ///
    /// # Returns
    /// - `Ok(Committed)` when the version advanced and the booking was recorded
    /// - `Ok(Conflict)` when `expected_version` was stale; nothing changed
    /// - `Err(ResourceNotFound)` for an unknown resource
    /// - `Err(StorageUnavailable | LedgerWriteFailed | ..)` on storage
    ///   failure; the version was not advanced unless the error reports
    ///   `inconsistent`
    pub fn try_reserve(&self, request: &ReservationRequest) -> Result<Reservation> {
        let result = self.execute(request);
        self.observe(request, &result);
        result
    }

    /// Attempt a reservation, reporting every result as an outcome
    pub fn reserve(&self, request: &ReservationRequest) -> ReservationOutcome {
        self.try_reserve(request).into()
    }

    fn execute(&self, request: &ReservationRequest) -> Result<Reservation> {
        let id = request.resource_id;
        let expected = request.expected_version;

        let current = self.store.get(id)?;
        if current != expected {
            return Ok(Reservation::Conflict {
                current_version: current,
            });
        }

        let ledger = &self.ledger;
        let advance = self.store.compare_and_advance_with(id, expected, |version| {
            ledger.append(BookingRecord::for_request(request, version))
        })?;

        Ok(match advance {
            Advance::Advanced { version, value } => Reservation::Committed {
                new_version: version,
                record_id: value,
            },
            Advance::Stale { current } => Reservation::Conflict {
                current_version: current,
            },
        })
    }

    fn observe(&self, request: &ReservationRequest, result: &Result<Reservation>) {
        let id = request.resource_id;
        match result {
            Ok(Reservation::Committed {
                new_version,
                record_id,
            }) => {
                self.metrics.record_commit();
                debug!(
                    resource_id = %id,
                    version = %new_version,
                    record_id = %record_id,
                    requester = %request.requester,
                    "Reservation committed"
                );
            }
            Ok(Reservation::Conflict { current_version }) => {
                self.metrics.record_conflict();
                debug!(
                    resource_id = %id,
                    expected = %request.expected_version,
                    current = %current_version,
                    "Reservation conflict"
                );
            }
            Err(e) if e.is_not_found() => {
                self.metrics.record_not_found();
                debug!(resource_id = %id, "Reservation for unknown resource");
            }
            Err(e) if e.is_inconsistent() => {
                self.metrics.record_failure();
                error!(
                    resource_id = %id,
                    error = %e,
                    "Reservation failed and storage may hold a partial commit"
                );
            }
            Err(e) => {
                self.metrics.record_failure();
                warn!(resource_id = %id, error = %e, "Reservation failed");
            }
        }
    }
}
