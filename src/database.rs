//! Main entry point for Berth.
//!
//! This module provides the `Berth` struct, which owns the store, the
//! booking ledger and the write-ahead log, and runs reservations against
//! them.

use crate::config::BerthConfig;
use crate::error::{Error, Result};
use crate::types::Room;
use berth_concurrency::{Reservation, ReservationCoordinator, ReservationOutcome};
use berth_core::traits::{BookingLedger, VersionedStore};
use berth_core::types::{BookingRecord, RecordId, ReservationRequest, Resource, ResourceId, Version};
use berth_durability::{
    recover, DurabilityMode, LoggedLedger, LoggedStore, Recovered, RecoveryResult, Wal,
};
use berth_storage::{MemoryLedger, ShardedStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// File name of the write-ahead log inside the data directory.
pub const WAL_FILE_NAME: &str = "berth.wal";

/// The Berth reservation engine.
///
/// Create an instance using [`Berth::open`], [`Berth::ephemeral`] or
/// [`Berth::builder`]. All methods take `&self`; share one instance across
/// threads with an `Arc`.
///
/// # Example
///
/// ```ignore
/// use berth::prelude::*;
///
/// let berth = Berth::open("./hotel")?;
/// let room = ResourceId::new(101);
/// berth.register_room(room, &Room::new("101", "double", 129.0))?;
///
/// let version = berth.version(room)?;
/// let request = ReservationRequest::new(room, version, "alice", stay);
/// match berth.reserve(&request) {
///     ReservationOutcome::Committed { new_version, record_id } => { /* booked */ }
///     ReservationOutcome::Conflict { current_version } => { /* refresh, ask again */ }
///     other => return Err(other.to_string().into()),
/// }
/// ```
pub struct Berth {
    coordinator: ReservationCoordinator<LoggedStore, LoggedLedger>,
    wal: Arc<Wal>,
    data_dir: Option<PathBuf>,
    recovery: RecoveryResult,
}

impl Berth {
    /// Open an instance backed by the given directory.
    ///
    /// Uses default settings (buffered durability mode). Replays any log
    /// already in the directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::builder().path(path).open()
    }

    /// Create an ephemeral instance with no disk I/O.
    ///
    /// Creates no files, cannot recover after a crash and loses all data
    /// when dropped. Use this for tests and demos.
    pub fn ephemeral() -> Result<Self> {
        Self::builder().no_durability().open()
    }

    /// Create a builder for configuration.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let berth = Berth::builder()
    ///     .path("./hotel")
    ///     .strict()
    ///     .open()?;
    /// ```
    pub fn builder() -> BerthBuilder {
        BerthBuilder::new()
    }

    /// Open an instance described by a configuration file's contents.
    pub fn from_config(config: &BerthConfig) -> Result<Self> {
        let mut builder = BerthBuilder::new().durability(config.durability_mode()?);
        if let Some(dir) = &config.data_dir {
            builder = builder.path(dir);
        }
        builder.open()
    }

    /// Register a resource with its starting version and payload.
    pub fn register(&self, resource: Resource) -> Result<()> {
        self.coordinator.store().register(resource).map_err(Error::from)
    }

    /// Register a room at the initial version.
    pub fn register_room(&self, id: ResourceId, room: &Room) -> Result<()> {
        let payload = serde_json::to_value(room)?;
        self.register(Resource::new(id, payload))
    }

    /// Full resource record.
    pub fn resource(&self, id: ResourceId) -> Result<Resource> {
        self.coordinator.store().resource(id).map_err(Error::from)
    }

    /// Room description of a resource registered with [`Berth::register_room`].
    pub fn room(&self, id: ResourceId) -> Result<Room> {
        let resource = self.resource(id)?;
        Ok(serde_json::from_value(resource.payload)?)
    }

    /// Current version of a resource.
    ///
    /// This is the value a caller passes back as `expected_version`.
    pub fn version(&self, id: ResourceId) -> Result<Version> {
        self.coordinator.store().get(id).map_err(Error::from)
    }

    /// Attempt a reservation, reporting every result as an outcome.
    pub fn reserve(&self, request: &ReservationRequest) -> ReservationOutcome {
        self.coordinator.reserve(request)
    }

    /// Attempt a reservation.
    ///
    /// A stale `expected_version` is `Ok(Reservation::Conflict)`, not an error.
    pub fn try_reserve(&self, request: &ReservationRequest) -> Result<Reservation> {
        self.coordinator.try_reserve(request).map_err(Error::from)
    }

    /// Attempt a reservation, treating a conflict as an error.
    ///
    /// Returns the new version and the booking's record id.
    pub fn book(&self, request: &ReservationRequest) -> Result<(Version, RecordId)> {
        match self.try_reserve(request)? {
            Reservation::Committed {
                new_version,
                record_id,
            } => Ok((new_version, record_id)),
            Reservation::Conflict { current_version } => Err(Error::Conflict {
                resource_id: request.resource_id,
                current_version,
            }),
        }
    }

    /// Bookings of a resource, oldest first.
    pub fn bookings(&self, id: ResourceId) -> Result<Vec<(RecordId, BookingRecord)>> {
        self.coordinator.ledger().bookings_for(id).map_err(Error::from)
    }

    /// One booking by record id.
    pub fn booking(&self, id: RecordId) -> Result<BookingRecord> {
        self.coordinator
            .ledger()
            .get(id)?
            .ok_or_else(|| Error::NotFound(format!("booking {}", id)))
    }

    /// Force all logged commits to disk.
    ///
    /// In buffered mode, syncs are batched and a background flusher syncs
    /// an idle tail within the interval. Call `flush()` to ensure every
    /// reported commit is persisted now. Dropping the instance also flushes.
    pub fn flush(&self) -> Result<()> {
        self.wal.flush().map_err(Error::from)
    }

    /// Get the data directory, `None` when ephemeral.
    pub fn path(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Get the current durability mode.
    pub fn durability_mode(&self) -> DurabilityMode {
        self.wal.mode()
    }

    /// Check if this is an ephemeral (no-disk) instance.
    pub fn is_ephemeral(&self) -> bool {
        self.data_dir.is_none()
    }

    /// What was replayed from the log at open.
    pub fn recovery(&self) -> &RecoveryResult {
        &self.recovery
    }

    /// Get reservation and storage metrics.
    pub fn metrics(&self) -> BerthMetrics {
        let outcomes = self.coordinator.metrics();
        BerthMetrics {
            reservations_committed: outcomes.committed,
            reservations_conflicted: outcomes.conflicts,
            reservations_not_found: outcomes.not_found,
            reservations_failed: outcomes.failures,
            commit_rate: outcomes.commit_rate(),
            operations: outcomes.total(),
            resources: self.coordinator.store().inner().resource_count(),
            bookings: self.coordinator.ledger().len(),
            wal_bytes: self.wal.len(),
        }
    }

    fn assemble(recovered: Recovered, wal: Wal, data_dir: Option<PathBuf>) -> Self {
        let wal = Arc::new(wal);
        let store = LoggedStore::new(recovered.store, Arc::clone(&wal));
        let ledger = LoggedLedger::new(recovered.ledger, Arc::clone(&wal));
        Self {
            coordinator: ReservationCoordinator::new(Arc::new(store), Arc::new(ledger)),
            wal,
            data_dir,
            recovery: recovered.result,
        }
    }
}

impl Drop for Berth {
    fn drop(&mut self) {
        if let Err(e) = self.wal.flush() {
            warn!(error = %e, "Final WAL flush on close failed");
        }
    }
}

impl std::fmt::Debug for Berth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Berth")
            .field("data_dir", &self.data_dir)
            .field("durability", &self.wal.mode())
            .field("resources", &self.coordinator.store().inner().resource_count())
            .field("bookings", &self.coordinator.ledger().len())
            .finish()
    }
}

/// Reservation and storage metrics.
#[derive(Debug, Clone)]
pub struct BerthMetrics {
    /// Reservations committed
    pub reservations_committed: u64,
    /// Reservations rejected as stale
    pub reservations_conflicted: u64,
    /// Reservations for unknown resources
    pub reservations_not_found: u64,
    /// Reservations that hit a storage or ledger failure
    pub reservations_failed: u64,
    /// Commit success rate (0.0 - 1.0)
    pub commit_rate: f64,
    /// Total reservation attempts
    pub operations: u64,
    /// Registered resources
    pub resources: usize,
    /// Bookings in the ledger
    pub bookings: usize,
    /// Bytes in the write-ahead log
    pub wal_bytes: u64,
}

/// Builder for instance configuration.
///
/// # Example
///
/// ```ignore
/// // Production: disk-backed with durability
/// let berth = Berth::builder()
///     .path("./hotel")
///     .buffered()  // Default
///     .open()?;
///
/// // Unit testing: no disk at all
/// let berth = Berth::ephemeral()?;
/// ```
#[derive(Debug, Clone)]
pub struct BerthBuilder {
    path: Option<PathBuf>,
    durability: DurabilityMode,
}

impl BerthBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            path: None,
            durability: DurabilityMode::default(),
        }
    }

    /// Set the data directory.
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the durability mode directly.
    pub fn durability(mut self, mode: DurabilityMode) -> Self {
        self.durability = mode;
        self
    }

    /// Use no-durability mode (no WAL writes).
    ///
    /// With a path, an existing log is still replayed at open, but nothing
    /// new is logged. Without a path, nothing touches the disk.
    pub fn no_durability(self) -> Self {
        self.durability(DurabilityMode::None)
    }

    /// Use buffered mode (default, recommended for production).
    ///
    /// Default flush interval: 100ms or 1000 writes.
    pub fn buffered(self) -> Self {
        self.durability(DurabilityMode::buffered_default())
    }

    /// Use buffered mode with custom parameters.
    ///
    /// # Arguments
    ///
    /// * `flush_interval_ms` - Maximum time between fsyncs
    /// * `max_pending_writes` - Maximum writes before forced fsync
    pub fn buffered_with(self, flush_interval_ms: u64, max_pending_writes: usize) -> Self {
        self.durability(DurabilityMode::Batched {
            interval_ms: flush_interval_ms,
            batch_size: max_pending_writes,
        })
    }

    /// Use strict mode (safest, slowest).
    ///
    /// Syncs to disk on every commit. No reported booking is lost on crash.
    pub fn strict(self) -> Self {
        self.durability(DurabilityMode::Strict)
    }

    /// Open the instance.
    ///
    /// Without a path only [`DurabilityMode::None`] is accepted.
    pub fn open(self) -> Result<Berth> {
        if let DurabilityMode::Batched { batch_size: 0, .. } = self.durability {
            return Err(Error::Config("batch size must be at least 1".into()));
        }

        let Some(dir) = self.path else {
            if self.durability.requires_wal() {
                return Err(Error::Config(format!(
                    "durability mode '{}' requires a data directory",
                    self.durability.description()
                )));
            }
            let empty = Recovered {
                store: ShardedStore::new(),
                ledger: MemoryLedger::new(),
                result: RecoveryResult::default(),
            };
            return Ok(Berth::assemble(empty, Wal::disabled(), None));
        };

        std::fs::create_dir_all(&dir)?;
        let wal_path = dir.join(WAL_FILE_NAME);
        let recovered = recover(&wal_path)?;
        let wal = Wal::open(&wal_path, self.durability)?;

        info!(
            path = %dir.display(),
            mode = self.durability.description(),
            resources = recovered.store.resource_count(),
            bookings = recovered.ledger.len(),
            "Opened berth"
        );

        Ok(Berth::assemble(recovered, wal, Some(dir)))
    }
}

impl Default for BerthBuilder {
    fn default() -> Self {
        Self::new()
    }
}
