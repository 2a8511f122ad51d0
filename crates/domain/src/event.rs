//! Event — an immutable record of something that happened.
//!
//! Events are published on the in-process bus whenever the registry or the
//! alarm state machine changes something an operator may want to watch.

use serde::{Deserialize, Serialize};

use crate::address::DeviceAddress;
use crate::alarm::TriggerCause;
use crate::id::{AlarmId, EventId, NodeId, ZoneId};
use crate::time::{Timestamp, now};
use crate::zone::ZoneStatus;

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    NodeDiscovered {
        node_id: NodeId,
        address: DeviceAddress,
        /// `true` when the node was not known before.
        new: bool,
    },
    NodeAssigned {
        node_id: NodeId,
        zone_id: ZoneId,
    },
    NodeDetached {
        node_id: NodeId,
        zone_id: ZoneId,
    },
    AlarmRaised {
        zone_id: ZoneId,
        alarm_id: AlarmId,
        cause: TriggerCause,
    },
    AlarmResolved {
        zone_id: ZoneId,
        /// Number of alarms closed.
        closed: usize,
    },
    ZoneStatusChanged {
        zone_id: ZoneId,
        from: ZoneStatus,
        to: ZoneStatus,
    },
    ZoneDeleted {
        zone_id: ZoneId,
    },
}

/// A timestamped [`EventKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    /// Stamp `kind` with a fresh id and the current time.
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            id: EventId::new(),
            timestamp: now(),
            kind,
        }
    }

    /// Zone this event concerns, if any.
    #[must_use]
    pub fn zone_id(&self) -> Option<ZoneId> {
        match &self.kind {
            EventKind::NodeDiscovered { .. } => None,
            EventKind::NodeAssigned { zone_id, .. }
            | EventKind::NodeDetached { zone_id, .. }
            | EventKind::AlarmRaised { zone_id, .. }
            | EventKind::AlarmResolved { zone_id, .. }
            | EventKind::ZoneStatusChanged { zone_id, .. }
            | EventKind::ZoneDeleted { zone_id } => Some(*zone_id),
        }
    }
}

impl From<EventKind> for Event {
    fn from(kind: EventKind) -> Self {
        Self::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_serialize_kind_inline_with_type_tag() {
        let zone_id = ZoneId::new();
        let event = Event::new(EventKind::ZoneStatusChanged {
            zone_id,
            from: ZoneStatus::Active,
            to: ZoneStatus::Alarm(TriggerCause::Flame),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "zone_status_changed");
        assert_eq!(json["zone_id"], zone_id.to_string());
        assert_eq!(json["to"]["state"], "alarm");
        assert_eq!(json["to"]["cause"], "flame");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn should_deserialize_what_it_serializes() {
        let event = Event::new(EventKind::AlarmResolved {
            zone_id: ZoneId::new(),
            closed: 1,
        });
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn should_expose_zone_of_zone_events_only() {
        let zone_id = ZoneId::new();
        let deleted = Event::new(EventKind::ZoneDeleted { zone_id });
        assert_eq!(deleted.zone_id(), Some(zone_id));

        let discovered = Event::new(EventKind::NodeDiscovered {
            node_id: NodeId::new(),
            address: DeviceAddress::parse("AA").unwrap(),
            new: true,
        });
        assert_eq!(discovered.zone_id(), None);
    }
}
