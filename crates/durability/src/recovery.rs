//! Crash recovery by WAL replay
//!
//! ## Recovery Sequence
//!
//! 1. Read the whole log file (a missing file is an empty log)
//! 2. Decode frames in order, applying each to a fresh store and ledger
//! 3. At the first frame that does not decode, look for an intact frame
//!    further on. None means a torn tail: truncate the file there. One
//!    means damage inside the log: fail with `Corruption` and leave the
//!    file as it is
//! 4. Report what was replayed
//!
//! ## Key Principle
//!
//! After recovery the store and ledger correspond to a **prefix of the
//! committed history**. A booking and its version advance live in one
//! frame, so the prefix never holds one without the other.
//!
//! A frame that decodes cleanly but does not fit the state rebuilt so far
//! (a version that is not exactly current + 1, a duplicate registration)
//! cannot be explained by a torn write and fails recovery with `Corruption`.

use crate::encoding::{decode_entry, DecodeError};
use crate::wal::WalEntry;
use berth_core::error::{Error, Result};
use berth_core::traits::VersionedStore;
use berth_core::types::{ResourceId, Version};
use berth_storage::{MemoryLedger, ShardedStore};
use rustc_hash::FxHashMap;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Recovery result
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Frames applied
    pub entries_replayed: usize,
    /// Resources rebuilt
    pub resources: usize,
    /// Bookings rebuilt
    pub bookings: usize,
    /// Bare version advances replayed
    pub bare_advances: usize,
    /// Bytes cut from the end of the log
    pub truncated_bytes: u64,
    /// Why replay stopped early, if it did
    pub stopped_at: Option<String>,
}

impl RecoveryResult {
    /// One-line summary for logs
    pub fn summary(&self) -> String {
        let mut s = format!(
            "replayed {} entries ({} resources, {} bookings, {} bare advances)",
            self.entries_replayed, self.resources, self.bookings, self.bare_advances
        );
        if self.truncated_bytes > 0 {
            s.push_str(&format!(", truncated {} tail bytes", self.truncated_bytes));
        }
        s
    }
}

/// State rebuilt from the log
#[derive(Debug)]
pub struct Recovered {
    /// Resources at their last committed versions
    pub store: ShardedStore,
    /// Every committed booking
    pub ledger: MemoryLedger,
    /// What happened
    pub result: RecoveryResult,
}

/// Rebuild store and ledger from the log at `path`
///
/// Truncates a torn or corrupt tail in place so the next writer appends
/// after the last good frame. A damaged frame with intact frames after it
/// is not a tail and fails with `Corruption`, touching nothing.
pub fn recover(path: impl AsRef<Path>) -> Result<Recovered> {
    let path = path.as_ref();
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No WAL file found at {}", path.display());
            Vec::new()
        }
        Err(e) => return Err(Error::Io(e)),
    };

    info!("Starting recovery from {} ({} bytes)", path.display(), bytes.len());

    let mut replay = Replay::default();
    let mut offset = 0usize;

    while offset < bytes.len() {
        match decode_entry(&bytes[offset..]) {
            Ok((entry, used)) => {
                replay.apply(entry)?;
                offset += used;
            }
            Err(e) => {
                if let Some(intact) = intact_frame_after(&bytes, offset) {
                    error!(
                        "Damaged entry at offset {} ({}) is followed by an intact entry at offset {}",
                        offset, e, intact
                    );
                    return Err(Error::Corruption(format!(
                        "damaged entry at offset {} ({}) is followed by intact entries",
                        offset, e
                    )));
                }
                log_stop(&e, offset);
                replay.result.stopped_at = Some(format!("offset {}: {}", offset, e));
                break;
            }
        }
    }

    if offset < bytes.len() {
        let truncated = (bytes.len() - offset) as u64;
        OpenOptions::new()
            .write(true)
            .open(path)?
            .set_len(offset as u64)?;
        replay.result.truncated_bytes = truncated;
    }

    let Replay {
        store,
        ledger,
        result,
        ..
    } = replay;
    info!("{}", result.summary());

    Ok(Recovered {
        store,
        ledger,
        result,
    })
}

/// Offset of the first decodable frame after a damaged one at `offset`
///
/// The damaged frame's own length header cannot be trusted, so every later
/// offset is tried.
fn intact_frame_after(bytes: &[u8], offset: usize) -> Option<usize> {
    (offset + 1..bytes.len()).find(|&at| decode_entry(&bytes[at..]).is_ok())
}

fn log_stop(e: &DecodeError, offset: usize) {
    match e {
        DecodeError::Incomplete { .. } => {
            warn!("Torn entry at offset {}: {}; discarding tail", offset, e)
        }
        _ => warn!("Corrupt entry at offset {}: {}; discarding tail", offset, e),
    }
}

#[derive(Default)]
struct Replay {
    store: ShardedStore,
    ledger: MemoryLedger,
    /// Version per resource as rebuilt so far
    versions: FxHashMap<ResourceId, Version>,
    result: RecoveryResult,
}

impl Replay {
    fn apply(&mut self, entry: WalEntry) -> Result<()> {
        match entry {
            WalEntry::ResourceRegistered { resource } => {
                let id = resource.id;
                let version = resource.version;
                self.store.register(resource).map_err(|e| match e {
                    Error::ResourceExists(id) => {
                        Error::Corruption(format!("resource {} registered twice", id))
                    }
                    other => other,
                })?;
                self.versions.insert(id, version);
                self.result.resources += 1;
            }
            WalEntry::VersionAdvanced {
                resource_id,
                version,
            } => {
                self.advance(resource_id, version)?;
                self.result.bare_advances += 1;
            }
            WalEntry::BookingCommitted { record_id, record } => {
                self.advance(record.resource_id, record.version)?;
                self.ledger.insert(record_id, record).map_err(|e| match e {
                    Error::DuplicateRecord(id) => {
                        Error::Corruption(format!("booking {} logged twice", id))
                    }
                    other => other,
                })?;
                self.result.bookings += 1;
            }
        }
        self.result.entries_replayed += 1;
        Ok(())
    }

    fn advance(&mut self, id: ResourceId, version: Version) -> Result<()> {
        let current = *self.versions.get(&id).ok_or_else(|| {
            Error::Corruption(format!("advance of unregistered resource {}", id))
        })?;

        if current.next() != Some(version) {
            return Err(Error::Corruption(format!(
                "resource {} advanced from {} to {}",
                id, current, version
            )));
        }

        self.store.set_version(id, version)?;
        self.versions.insert(id, version);
        Ok(())
    }
}
