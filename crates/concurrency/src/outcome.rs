//! Reservation results
//!
//! [`Reservation`] is what a reservation produces when storage behaves:
//! either it committed or the caller's version was stale. Failures travel
//! as [`berth_core::Error`]. [`ReservationOutcome`] flattens both into the
//! single closed set a host reports back to its caller.

use berth_core::error::{Error, Result};
use berth_core::types::{RecordId, ResourceId, Version};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol result of a reservation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reservation {
    /// Version advanced and booking recorded
    Committed {
        /// Version after the commit
        new_version: Version,
        /// Ledger id of the booking
        record_id: RecordId,
    },
    /// Caller's expected version was stale; nothing changed
    Conflict {
        /// Version the resource actually holds
        current_version: Version,
    },
}

impl Reservation {
    /// Check if the reservation committed
    pub fn is_committed(&self) -> bool {
        matches!(self, Reservation::Committed { .. })
    }

    /// Check if the reservation was rejected as stale
    pub fn is_conflict(&self) -> bool {
        matches!(self, Reservation::Conflict { .. })
    }
}

/// Terminal state of one reservation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReservationOutcome {
    /// Version advanced and booking recorded
    Committed {
        /// Version after the commit
        new_version: Version,
        /// Ledger id of the booking
        record_id: RecordId,
    },
    /// Caller's expected version was stale
    Conflict {
        /// Version the resource actually holds
        current_version: Version,
    },
    /// No such resource
    ResourceNotFound {
        /// The id that was requested
        resource_id: ResourceId,
    },
    /// Storage could not be reached
    StorageUnavailable {
        /// What failed
        reason: String,
        /// A partial commit could not be ruled out
        inconsistent: bool,
    },
    /// The booking could not be recorded; the version was not advanced
    LedgerWriteFailed {
        /// What failed
        reason: String,
    },
}

impl ReservationOutcome {
    /// Transport status for this outcome
    ///
    /// 200 committed, 409 conflict, 404 not found, 503 storage unavailable,
    /// 500 ledger failure.
    pub fn status_code(&self) -> u16 {
        match self {
            ReservationOutcome::Committed { .. } => 200,
            ReservationOutcome::Conflict { .. } => 409,
            ReservationOutcome::ResourceNotFound { .. } => 404,
            ReservationOutcome::StorageUnavailable { .. } => 503,
            ReservationOutcome::LedgerWriteFailed { .. } => 500,
        }
    }

    /// Check if the reservation committed
    pub fn is_committed(&self) -> bool {
        matches!(self, ReservationOutcome::Committed { .. })
    }

    /// Check if the reservation was rejected as stale
    pub fn is_conflict(&self) -> bool {
        matches!(self, ReservationOutcome::Conflict { .. })
    }

    /// Check if this outcome reports an infrastructure failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ReservationOutcome::StorageUnavailable { .. }
                | ReservationOutcome::LedgerWriteFailed { .. }
        )
    }

    /// Version after a commit, or the current version on conflict
    pub fn version(&self) -> Option<Version> {
        match self {
            ReservationOutcome::Committed { new_version, .. } => Some(*new_version),
            ReservationOutcome::Conflict { current_version } => Some(*current_version),
            _ => None,
        }
    }
}

impl From<Reservation> for ReservationOutcome {
    fn from(reservation: Reservation) -> Self {
        match reservation {
            Reservation::Committed {
                new_version,
                record_id,
            } => ReservationOutcome::Committed {
                new_version,
                record_id,
            },
            Reservation::Conflict { current_version } => {
                ReservationOutcome::Conflict { current_version }
            }
        }
    }
}

impl From<Error> for ReservationOutcome {
    fn from(error: Error) -> Self {
        match error {
            Error::ResourceNotFound(resource_id) => {
                ReservationOutcome::ResourceNotFound { resource_id }
            }
            Error::StorageUnavailable {
                reason,
                inconsistent,
            } => ReservationOutcome::StorageUnavailable {
                reason,
                inconsistent,
            },
            Error::LedgerWriteFailed(reason) => ReservationOutcome::LedgerWriteFailed { reason },
            // The booking itself could not be encoded or stored
            e @ (Error::Serialization(_) | Error::DuplicateRecord(_)) => {
                ReservationOutcome::LedgerWriteFailed {
                    reason: e.to_string(),
                }
            }
            other => ReservationOutcome::StorageUnavailable {
                reason: other.to_string(),
                inconsistent: false,
            },
        }
    }
}

impl From<Result<Reservation>> for ReservationOutcome {
    fn from(result: Result<Reservation>) -> Self {
        match result {
            Ok(reservation) => reservation.into(),
            Err(e) => e.into(),
        }
    }
}

impl fmt::Display for ReservationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReservationOutcome::Committed {
                new_version,
                record_id,
            } => write!(f, "committed at {} as {}", new_version, record_id),
            ReservationOutcome::Conflict { current_version } => {
                write!(f, "conflict: current version is {}", current_version)
            }
            ReservationOutcome::ResourceNotFound { resource_id } => {
                write!(f, "resource {} not found", resource_id)
            }
            ReservationOutcome::StorageUnavailable { reason, .. } => {
                write!(f, "storage unavailable: {}", reason)
            }
            ReservationOutcome::LedgerWriteFailed { reason } => {
                write!(f, "ledger write failed: {}", reason)
            }
        }
    }
}
