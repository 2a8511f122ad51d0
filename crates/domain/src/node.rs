//! Node — a sensor/actuator device identified by its hardware address.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::address::DeviceAddress;
use crate::error::{FlameWatchError, ValidationError};
use crate::id::{NodeId, ZoneId};
use crate::telemetry::SensorReading;
use crate::time::{Timestamp, now};

/// Lifecycle status of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Known but not yet assigned to a zone.
    #[default]
    Provisioning,
    /// Assigned to a zone and reporting.
    Active,
    /// Detached, or its zone was deleted.
    Inactive,
}

impl NodeStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Provisioning => "provisioning",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown node status name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown node status {0:?}")]
pub struct UnknownNodeStatus(pub String);

impl FromStr for NodeStatus {
    type Err = UnknownNodeStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "provisioning" => Ok(Self::Provisioning),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(UnknownNodeStatus(other.to_string())),
        }
    }
}

/// Latest sensor values. Each field is `None` until the first reading of that kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Readings {
    pub temperature: Option<f64>,
    pub smoke_level: Option<f64>,
    pub flame_detected: Option<bool>,
}

impl Readings {
    /// Overwrite only the field carried by `reading`.
    pub fn apply(&mut self, reading: SensorReading) {
        match reading {
            SensorReading::Temperature(value) => self.temperature = Some(value),
            SensorReading::Smoke(value) => self.smoke_level = Some(value),
            SensorReading::Flame(detected) => self.flame_detected = Some(detected),
        }
    }
}

/// A sensor/actuator device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub address: DeviceAddress,
    pub zone_id: Option<ZoneId>,
    pub status: NodeStatus,
    pub last_seen: Option<Timestamp>,
    pub readings: Readings,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Node {
    /// A freshly discovered node: provisioning, no zone, seen now.
    #[must_use]
    pub fn provisioned(address: DeviceAddress, at: Timestamp) -> Self {
        Self {
            id: NodeId::new(),
            address,
            zone_id: None,
            status: NodeStatus::Provisioning,
            last_seen: Some(at),
            readings: Readings::default(),
            created_at: at,
            updated_at: at,
        }
    }

    /// A node registered by an operator before it ever reported.
    #[must_use]
    pub fn registered(address: DeviceAddress) -> Self {
        let mut node = Self::provisioned(address, now());
        node.last_seen = None;
        node
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ActiveNodeWithoutZone`] if the node is active
    /// but not assigned to any zone.
    pub fn validate(&self) -> Result<(), FlameWatchError> {
        if self.status == NodeStatus::Active && self.zone_id.is_none() {
            return Err(ValidationError::ActiveNodeWithoutZone.into());
        }
        Ok(())
    }

    /// Whether readings from this node should be evaluated against zone thresholds.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.status == NodeStatus::Active && self.zone_id.is_some()
    }

    /// Join `zone_id` and become active.
    pub fn assign(&mut self, zone_id: ZoneId, at: Timestamp) {
        self.zone_id = Some(zone_id);
        self.status = NodeStatus::Active;
        self.updated_at = at;
    }

    /// Leave the current zone and become inactive. Returns the zone left, if any.
    pub fn detach(&mut self, at: Timestamp) -> Option<ZoneId> {
        self.status = NodeStatus::Inactive;
        self.updated_at = at;
        self.zone_id.take()
    }
}
