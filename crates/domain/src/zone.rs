//! Zone — a monitored physical area with its own alarm thresholds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::alarm::TriggerCause;
use crate::error::{FlameWatchError, ValidationError};
use crate::id::ZoneId;
use crate::time::{Timestamp, now};

/// Default temperature threshold, in degrees.
pub const DEFAULT_TEMP_THRESHOLD: f64 = 50.0;
/// Default smoke threshold, in the sensor's unit.
pub const DEFAULT_SMOKE_THRESHOLD: f64 = 500.0;

/// Safety state of a zone.
///
/// A zone carries at most one alarm cause at a time: the cause lives *inside*
/// the [`Alarm`](Self::Alarm) variant, so "safe and alarming" is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "cause", rename_all = "snake_case")]
pub enum ZoneStatus {
    /// Armed and safe.
    Active,
    /// Disabled or without any active node.
    Inactive,
    /// Alarming for the given cause.
    Alarm(TriggerCause),
}

impl ZoneStatus {
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// The current alarm cause, if alarming.
    #[must_use]
    pub fn alarm_cause(self) -> Option<TriggerCause> {
        match self {
            Self::Alarm(cause) => Some(cause),
            Self::Active | Self::Inactive => None,
        }
    }
}

impl fmt::Display for ZoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Inactive => f.write_str("inactive"),
            Self::Alarm(cause) => write!(f, "alarm:{cause}"),
        }
    }
}

/// Unparseable zone status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown zone status {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for ZoneStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => other
                .strip_prefix("alarm:")
                .and_then(|cause| cause.parse().ok())
                .map(Self::Alarm)
                .ok_or_else(|| UnknownStatus(other.to_string())),
        }
    }
}

/// Per-zone alarm thresholds. Comparisons are strict (`>`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub temperature: f64,
    pub smoke: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMP_THRESHOLD,
            smoke: DEFAULT_SMOKE_THRESHOLD,
        }
    }
}

impl Thresholds {
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidThreshold`] for NaN or infinite values.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for value in [self.temperature, self.smoke] {
            if !value.is_finite() {
                return Err(ValidationError::InvalidThreshold(value));
            }
        }
        Ok(())
    }
}

/// A monitored area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub description: String,
    pub thresholds: Thresholds,
    pub status: ZoneStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Zone {
    /// Create a builder for constructing a [`Zone`].
    #[must_use]
    pub fn builder() -> ZoneBuilder {
        ZoneBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`FlameWatchError::Validation`] when `name` is empty or a threshold
    /// is not finite.
    pub fn validate(&self) -> Result<(), FlameWatchError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        self.thresholds.validate()?;
        Ok(())
    }

    /// Change status and bump `updated_at`. Returns the previous status.
    pub fn set_status(&mut self, status: ZoneStatus, at: Timestamp) -> ZoneStatus {
        let previous = std::mem::replace(&mut self.status, status);
        self.updated_at = at;
        previous
    }
}

/// Step-by-step builder for [`Zone`].
#[derive(Debug, Default)]
pub struct ZoneBuilder {
    id: Option<ZoneId>,
    name: Option<String>,
    description: Option<String>,
    thresholds: Option<Thresholds>,
    status: Option<ZoneStatus>,
}

impl ZoneBuilder {
    #[must_use]
    pub fn id(mut self, id: ZoneId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = Some(thresholds);
        self
    }

    #[must_use]
    pub fn status(mut self, status: ZoneStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Consume the builder, validate, and return a [`Zone`].
    ///
    /// New zones start [`ZoneStatus::Active`] unless told otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`FlameWatchError::Validation`] if `name` is missing or a threshold is invalid.
    pub fn build(self) -> Result<Zone, FlameWatchError> {
        let ts = now();
        let zone = Zone {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            thresholds: self.thresholds.unwrap_or_default(),
            status: self.status.unwrap_or(ZoneStatus::Active),
            created_at: ts,
            updated_at: ts,
        };
        zone.validate()?;
        Ok(zone)
    }
}
