//! Unified error types for Berth.
//!
//! This module provides a clean error type that wraps internal errors
//! and presents a consistent interface to users.

use berth_core::types::{ResourceId, Version};
use thiserror::Error;

/// All Berth errors.
///
/// This is the canonical error type for all facade operations. A stale
/// reservation is only an error when requested through [`Berth::book`];
/// everywhere else it is an ordinary result.
///
/// [`Berth::book`]: crate::Berth::book
#[derive(Debug, Error)]
pub enum Error {
    /// Resource or booking not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Resource id already registered
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Reservation made against a stale version
    #[error("conflict on resource {resource_id}: current version is {current_version}")]
    Conflict {
        /// Contended resource
        resource_id: ResourceId,
        /// Version to retry with
        current_version: Version,
    },

    /// Storage cannot be reached
    #[error("storage unavailable: {reason}")]
    StorageUnavailable {
        /// What failed
        reason: String,
        /// A partial commit could not be ruled out
        inconsistent: bool,
    },

    /// Booking could not be recorded; nothing was committed
    #[error("ledger write failed: {0}")]
    LedgerWriteFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Persistent data is damaged
    #[error("corruption: {0}")]
    Corruption(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Internal error (bug or invariant violation)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for Berth operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is retryable.
    ///
    /// Retryable errors (conflicts) may succeed on retry with a fresh version.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Check if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Check if storage may hold a partially applied commit.
    pub fn is_serious(&self) -> bool {
        matches!(
            self,
            Error::StorageUnavailable {
                inconsistent: true,
                ..
            } | Error::Corruption(_)
                | Error::Internal(_)
        )
    }
}

// Convert from internal core errors
impl From<berth_core::Error> for Error {
    fn from(e: berth_core::Error) -> Self {
        use berth_core::Error as CoreError;
        match e {
            CoreError::ResourceNotFound(id) => Error::NotFound(format!("resource {}", id)),
            CoreError::ResourceExists(id) => Error::AlreadyExists(format!("resource {}", id)),
            CoreError::StorageUnavailable {
                reason,
                inconsistent,
            } => Error::StorageUnavailable {
                reason,
                inconsistent,
            },
            CoreError::LedgerWriteFailed(reason) => Error::LedgerWriteFailed(reason),
            CoreError::DuplicateRecord(id) => {
                Error::Internal(format!("booking record {} allocated twice", id))
            }
            CoreError::VersionOverflow {
                resource_id,
                version,
            } => Error::Internal(format!(
                "version counter of resource {} exhausted at {}",
                resource_id, version
            )),
            CoreError::Io(io_err) => Error::Io(io_err),
            CoreError::Serialization(msg) => Error::Serialization(msg),
            CoreError::Corruption(msg) => Error::Corruption(msg),
            CoreError::Config(msg) => Error::Config(msg),
        }
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Convert from TOML parse errors
impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
