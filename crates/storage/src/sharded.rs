//! Sharded versioned storage
//!
//! DashMap by ResourceId, one RwLock cell per resource.
//!
//! # Design
//!
//! - DashMap: 16-way sharded by default, guards held only long enough to
//!   clone the resource's cell handle or insert a new one
//! - Per-resource RwLock: `get` takes the read side, compare-and-advance the
//!   write side, so readers never observe a version mid-commit
//! - Registration inserts a hidden cell and runs its hook under that cell's
//!   write guard, after the shard guard is released
//! - Different resources never contend beyond the brief DashMap lookup

use berth_core::error::{Error, Result};
use berth_core::traits::{Advance, VersionedStore};
use berth_core::types::{Resource, ResourceId, Version};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use std::sync::Arc;

type FxBuildHasher = BuildHasherDefault<FxHasher>;

/// Mutable state of a single resource
#[derive(Debug)]
struct CellState {
    version: Version,
    payload: serde_json::Value,
    /// False while the registration hook runs, and forever if it failed
    live: bool,
}

/// Per-resource cell
///
/// The RwLock is the synchronization point for every version read and
/// advance on this resource.
#[derive(Debug)]
struct ResourceCell {
    state: RwLock<CellState>,
}

impl ResourceCell {
    fn pending(resource: Resource) -> Self {
        Self {
            state: RwLock::new(CellState {
                version: resource.version,
                payload: resource.payload,
                live: false,
            }),
        }
    }
}

/// Sharded in-memory versioned store
///
/// # Thread Safety
///
/// All operations are thread-safe:
/// - get(): read guard on the resource's cell
/// - compare_and_advance_with(): write guard on the resource's cell for the
///   whole check / commit / publish sequence
/// - register_with(): write guard on the new cell while the hook runs; the
///   shard is only locked for the insert
/// - Different resources never contend
///
/// # Example
///
/// ```
/// use berth_core::{Advance, Resource, ResourceId, Version, VersionedStore};
/// use berth_storage::ShardedStore;
///
/// let store = ShardedStore::new();
/// let id = ResourceId::new(1);
/// store.register(Resource::with_version(id, Version::new(3), serde_json::Value::Null)).unwrap();
///
/// let advance = store.compare_and_advance(id, Version::new(3)).unwrap();
/// assert!(advance.is_advanced());
/// assert_eq!(store.get(id).unwrap(), Version::new(4));
/// ```
pub struct ShardedStore {
    cells: DashMap<ResourceId, Arc<ResourceCell>, FxBuildHasher>,
}

impl ShardedStore {
    /// Create new sharded store
    pub fn new() -> Self {
        Self {
            cells: DashMap::with_hasher(FxBuildHasher::default()),
        }
    }

    /// Number of registered resources
    ///
    /// Counts a registration whose hook is still running.
    pub fn resource_count(&self) -> usize {
        self.cells.len()
    }

    /// Check if a resource exists
    pub fn contains(&self, id: ResourceId) -> bool {
        self.get(id).is_ok()
    }

    /// Set a resource's version directly (used during recovery)
    ///
    /// Bypasses the compare step. Never call this on a store that is serving
    /// reservations.
    pub fn set_version(&self, id: ResourceId, version: Version) -> Result<()> {
        let cell = self.cell(id)?;
        let mut state = cell.state.write();
        if !state.live {
            return Err(Error::ResourceNotFound(id));
        }
        state.version = version;
        Ok(())
    }

    /// Register a resource, running `hook` while the id is held
    ///
    /// The id is claimed in the map first, so a concurrent registration of
    /// the same id fails with `ResourceExists`. The hook then runs without
    /// the shard guard; readers of this id wait on the cell and everything
    /// else proceeds. If the hook fails the claim is withdrawn and the
    /// resource never becomes visible.
    pub fn register_with<F>(&self, resource: Resource, hook: F) -> Result<()>
    where
        F: FnOnce(&Resource) -> Result<()>,
    {
        let id = resource.id;
        let cell = Arc::new(ResourceCell::pending(resource.clone()));
        let mut state = cell.state.write();

        match self.cells.entry(id) {
            Entry::Occupied(_) => return Err(Error::ResourceExists(id)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&cell));
            }
        }

        match hook(&resource) {
            Ok(()) => {
                state.live = true;
                Ok(())
            }
            Err(e) => {
                drop(state);
                self.cells
                    .remove_if(&id, |_, claimed| Arc::ptr_eq(claimed, &cell));
                Err(e)
            }
        }
    }

    /// Clone the cell handle out of the map so the shard guard is released
    /// before the resource's own lock is taken
    fn cell(&self, id: ResourceId) -> Result<Arc<ResourceCell>> {
        self.cells
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(Error::ResourceNotFound(id))
    }
}

impl VersionedStore for ShardedStore {
    fn register(&self, resource: Resource) -> Result<()> {
        self.register_with(resource, |_| Ok(()))
    }

    #[inline]
    fn get(&self, id: ResourceId) -> Result<Version> {
        let cell = self.cell(id)?;
        let state = cell.state.read();
        if !state.live {
            return Err(Error::ResourceNotFound(id));
        }
        Ok(state.version)
    }

    fn resource(&self, id: ResourceId) -> Result<Resource> {
        let cell = self.cell(id)?;
        let state = cell.state.read();
        if !state.live {
            return Err(Error::ResourceNotFound(id));
        }
        Ok(Resource::with_version(id, state.version, state.payload.clone()))
    }

    fn compare_and_advance_with<T, F>(
        &self,
        id: ResourceId,
        expected: Version,
        commit: F,
    ) -> Result<Advance<T>>
    where
        F: FnOnce(Version) -> Result<T>,
    {
        let cell = self.cell(id)?;
        let mut state = cell.state.write();
        if !state.live {
            return Err(Error::ResourceNotFound(id));
        }

        if state.version != expected {
            return Ok(Advance::Stale {
                current: state.version,
            });
        }

        let next = state.version.next().ok_or(Error::VersionOverflow {
            resource_id: id,
            version: state.version,
        })?;

        // Publish only after the hook succeeds; the write guard keeps every
        // reader on the old version until then.
        let value = commit(next)?;
        state.version = next;

        Ok(Advance::Advanced {
            version: next,
            value,
        })
    }
}

impl Default for ShardedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShardedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedStore")
            .field("resource_count", &self.resource_count())
            .finish()
    }
}
