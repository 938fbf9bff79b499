//! When the WAL reaches stable storage
//!
//! A booking and its version advance always travel in the same log entry,
//! so every mode preserves atomic pairing. The modes differ only in how many
//! recent commits a crash may lose.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Durability mode for WAL writes
///
/// | Mode | fsync | Lost on crash |
/// |------|-------|---------------|
/// | None | never, no file | everything |
/// | Batched | every `batch_size` appends or `interval_ms` | one batch or interval |
/// | Strict | every append | nothing acknowledged |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DurabilityMode {
    /// In-memory only; the WAL is bypassed
    None,

    /// fsync before every append returns
    Strict,

    /// fsync once `batch_size` appends are pending, or once the oldest
    /// pending append is `interval_ms` old
    ///
    /// A background flusher enforces the interval while appends are idle.
    Batched {
        /// Maximum time between fsyncs in milliseconds
        interval_ms: u64,
        /// Maximum writes between fsyncs
        batch_size: usize,
    },
}

impl DurabilityMode {
    /// False only for `None`
    pub fn requires_wal(&self) -> bool {
        !matches!(self, DurabilityMode::None)
    }

    /// Whether `pending` unsynced appends must be synced now, given the time
    /// since the last fsync
    pub fn sync_due(&self, pending: usize, since_sync: Duration) -> bool {
        if pending == 0 {
            return false;
        }
        match self {
            DurabilityMode::None => false,
            DurabilityMode::Strict => true,
            DurabilityMode::Batched {
                interval_ms,
                batch_size,
            } => pending >= *batch_size || since_sync >= Duration::from_millis(*interval_ms),
        }
    }

    /// Period of the background flusher, for modes that need one
    pub fn flush_interval(&self) -> Option<Duration> {
        match self {
            DurabilityMode::Batched { interval_ms, .. } => {
                Some(Duration::from_millis((*interval_ms).max(1)))
            }
            _ => None,
        }
    }

    /// Short description for logs
    pub fn description(&self) -> &'static str {
        match self {
            DurabilityMode::None => "in-memory, nothing logged",
            DurabilityMode::Strict => "fsync on every commit",
            DurabilityMode::Batched { .. } => "batched fsync",
        }
    }

    /// `Batched { interval_ms: 100, batch_size: 1000 }`
    pub fn buffered_default() -> Self {
        DurabilityMode::Batched {
            interval_ms: 100,
            batch_size: 1000,
        }
    }
}

impl Default for DurabilityMode {
    fn default() -> Self {
        Self::buffered_default()
    }
}
