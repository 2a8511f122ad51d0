//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`FlameWatchError`]
//! via `From`. Malformed telemetry is *not* an error: the topic router reports it
//! as a [`RejectReason`](crate::telemetry::RejectReason) so that it can never
//! propagate out of the ingestion pipeline.

use crate::zone::ZoneStatus;

/// Boxed error used for opaque infrastructure failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error returned by application services and port implementations.
#[derive(Debug, thiserror::Error)]
pub enum FlameWatchError {
    /// Input rejected by a domain invariant.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A referenced zone, node or alarm does not exist.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// A uniqueness constraint was hit (e.g. duplicate device address).
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// Internal consistency check failed; serialization was bypassed somewhere.
    #[error(transparent)]
    InvariantViolation(#[from] InvariantViolation),

    /// The publish/subscribe link is unavailable.
    #[error("transport unavailable")]
    Transport(#[source] BoxError),

    /// The persistent store failed.
    #[error("storage error")]
    Storage(#[source] BoxError),
}

impl FlameWatchError {
    /// Whether this error is a lookup miss.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether this error is a uniqueness conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Domain invariant failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("device address must not be empty")]
    EmptyAddress,

    #[error("device address contains a reserved topic character: {0:?}")]
    InvalidAddress(String),

    #[error("threshold must be a finite number, got {0}")]
    InvalidThreshold(f64),

    #[error("an active node must be assigned to a zone")]
    ActiveNodeWithoutZone,

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("cannot move zone from {from} to {to}")]
    InvalidTransition { from: ZoneStatus, to: ZoneStatus },
}

/// A lookup that found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// A record with the same unique key already exists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} with {key} {value} already exists")]
pub struct ConflictError {
    pub entity: &'static str,
    pub key: &'static str,
    pub value: String,
}

/// An internal invariant does not hold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("zone {zone_id} has {count} open alarms")]
    MultipleOpenAlarms { zone_id: String, count: usize },

    #[error("zone {zone_id} is active but has an open alarm")]
    OpenAlarmOnActiveZone { zone_id: String },
}
