//! Error types shared across the workspace
//!
//! `Conflict` is deliberately absent: a stale expected version is an
//! ordinary protocol outcome and is reported through return values, not
//! through [`Error`].

use crate::types::{RecordId, ResourceId, Version};
use thiserror::Error;

/// Result alias for storage and protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by stores, ledgers and the coordinator
#[derive(Debug, Error)]
pub enum Error {
    /// No resource with this id exists
    #[error("resource not found: {0}")]
    ResourceNotFound(ResourceId),

    /// Registration of an id that already exists
    #[error("resource already exists: {0}")]
    ResourceExists(ResourceId),

    /// The storage medium cannot be reached
    ///
    /// `inconsistent` is set when a failed write could not be undone and
    /// storage may hold a partially applied commit.
    #[error("storage unavailable: {reason}")]
    StorageUnavailable {
        /// What failed
        reason: String,
        /// Partial application could not be ruled out
        inconsistent: bool,
    },

    /// The ledger append failed and was undone
    #[error("ledger write failed: {0}")]
    LedgerWriteFailed(String),

    /// The ledger already holds a record under this id
    #[error("duplicate booking record {0}")]
    DuplicateRecord(RecordId),

    /// Advancing would overflow the version counter
    #[error("version counter exhausted for resource {resource_id} at {version}")]
    VersionOverflow {
        /// Resource whose counter is exhausted
        resource_id: ResourceId,
        /// Current version
        version: Version,
    },

    /// I/O error from the durable medium
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding failure
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Persistent data is damaged beyond tail truncation
    #[error("corruption: {0}")]
    Corruption(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Shorthand for a consistent `StorageUnavailable`
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Error::StorageUnavailable {
            reason: reason.into(),
            inconsistent: false,
        }
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ResourceNotFound(_))
    }

    /// Check if this error reports an unreachable or failing medium
    ///
    /// Raw I/O errors count: they surface from the medium itself.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Error::StorageUnavailable { .. } | Error::Io(_))
    }

    /// Check if storage may hold a partially applied commit
    pub fn is_inconsistent(&self) -> bool {
        matches!(
            self,
            Error::StorageUnavailable {
                inconsistent: true,
                ..
            }
        )
    }
}
