//! Alarm — a record of one hazard period for a zone.
//!
//! An alarm is *open* while `end_time` is `None`. Once closed it never changes
//! again; [`Alarm::close`] on a closed alarm is a no-op.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::id::{AlarmId, ZoneId};
use crate::time::Timestamp;

/// Why an alarm opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerCause {
    Manual,
    Temperature,
    Smoke,
    Flame,
}

impl TriggerCause {
    /// Stable lowercase name used in storage and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Temperature => "temperature",
            Self::Smoke => "smoke",
            Self::Flame => "flame",
        }
    }
}

impl fmt::Display for TriggerCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown trigger cause name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown trigger cause {0:?}")]
pub struct UnknownCause(pub String);

impl FromStr for TriggerCause {
    type Err = UnknownCause;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "temperature" => Ok(Self::Temperature),
            "smoke" => Ok(Self::Smoke),
            "flame" => Ok(Self::Flame),
            other => Err(UnknownCause(other.to_string())),
        }
    }
}

/// An open or closed hazard period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: AlarmId,
    pub zone_id: ZoneId,
    pub cause: TriggerCause,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
}

impl Alarm {
    /// Open a new alarm for `zone_id` starting at `at`.
    #[must_use]
    pub fn open(zone_id: ZoneId, cause: TriggerCause, at: Timestamp) -> Self {
        Self {
            id: AlarmId::new(),
            zone_id,
            cause,
            start_time: at,
            end_time: None,
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Close the alarm at `at`. Returns `false` if it was already closed.
    pub fn close(&mut self, at: Timestamp) -> bool {
        if self.end_time.is_some() {
            return false;
        }
        self.end_time = Some(at);
        true
    }
}

/// Selection criteria for alarm queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct AlarmFilter {
    pub zone_id: Option<ZoneId>,
    /// Only alarms whose `end_time` is null.
    #[serde(default)]
    pub open_only: bool,
}

impl AlarmFilter {
    /// Open alarms of a single zone.
    #[must_use]
    pub fn open_in(zone_id: ZoneId) -> Self {
        Self {
            zone_id: Some(zone_id),
            open_only: true,
        }
    }

    /// Whether `alarm` satisfies this filter.
    #[must_use]
    pub fn matches(&self, alarm: &Alarm) -> bool {
        self.zone_id.is_none_or(|id| id == alarm.zone_id) && (!self.open_only || alarm.is_open())
    }
}
