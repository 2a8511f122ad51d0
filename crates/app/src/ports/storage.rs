//! Storage port — repository traits for persistence.
//!
//! Repositories provide atomic single-record reads and writes only. Callers
//! that read-modify-write shared records serialize themselves (see
//! [`KeyedLocks`](crate::keyed_lock::KeyedLocks)).

use std::future::Future;
use std::sync::Arc;

use flamewatch_domain::address::DeviceAddress;
use flamewatch_domain::alarm::{Alarm, AlarmFilter};
use flamewatch_domain::error::FlameWatchError;
use flamewatch_domain::id::{AlarmId, NodeId, ZoneId};
use flamewatch_domain::node::{Node, Readings};
use flamewatch_domain::time::Timestamp;
use flamewatch_domain::zone::Zone;

/// Repository for persisting and querying [`Zone`]s.
pub trait ZoneRepository {
    /// Create a new zone in storage.
    fn create(&self, zone: Zone) -> impl Future<Output = Result<Zone, FlameWatchError>> + Send;

    /// Get a zone by its unique identifier.
    fn get_by_id(
        &self,
        id: ZoneId,
    ) -> impl Future<Output = Result<Option<Zone>, FlameWatchError>> + Send;

    /// Get all zones.
    fn get_all(&self) -> impl Future<Output = Result<Vec<Zone>, FlameWatchError>> + Send;

    /// Overwrite an existing zone. Fails with `NotFound` if it does not exist.
    fn update(&self, zone: Zone) -> impl Future<Output = Result<Zone, FlameWatchError>> + Send;

    /// Delete a zone. Fails with `NotFound` if it does not exist.
    fn delete(&self, id: ZoneId) -> impl Future<Output = Result<(), FlameWatchError>> + Send;
}

/// Repository for persisting and querying [`Node`]s.
pub trait NodeRepository {
    /// Create a new node.
    ///
    /// Fails with [`FlameWatchError::Conflict`] when another node already
    /// owns the same device address.
    fn create(&self, node: Node) -> impl Future<Output = Result<Node, FlameWatchError>> + Send;

    /// Get a node by its unique identifier.
    fn get_by_id(
        &self,
        id: NodeId,
    ) -> impl Future<Output = Result<Option<Node>, FlameWatchError>> + Send;

    /// Get all nodes.
    fn get_all(&self) -> impl Future<Output = Result<Vec<Node>, FlameWatchError>> + Send;

    /// Find the node owning `address`.
    fn find_by_address(
        &self,
        address: &DeviceAddress,
    ) -> impl Future<Output = Result<Option<Node>, FlameWatchError>> + Send;

    /// Find every node assigned to `zone_id`.
    fn find_by_zone(
        &self,
        zone_id: ZoneId,
    ) -> impl Future<Output = Result<Vec<Node>, FlameWatchError>> + Send;

    /// Overwrite an existing node. Fails with `NotFound` if it does not exist.
    fn update(&self, node: Node) -> impl Future<Output = Result<Node, FlameWatchError>> + Send;

    /// Record that a node was heard from.
    ///
    /// Writes only `readings`, `last_seen` and `updated_at`; zone membership
    /// and status are left as stored. Returns the node as stored afterwards.
    /// Fails with `NotFound` if it does not exist.
    fn record_contact(
        &self,
        id: NodeId,
        readings: Readings,
        seen_at: Timestamp,
    ) -> impl Future<Output = Result<Node, FlameWatchError>> + Send;
}

/// Repository for persisting and querying [`Alarm`]s.
///
/// The store accepts any number of open alarms per zone; the state machine
/// is what keeps it at one.
pub trait AlarmRepository {
    /// Persist a new alarm.
    fn create(&self, alarm: Alarm) -> impl Future<Output = Result<Alarm, FlameWatchError>> + Send;

    /// Get an alarm by its unique identifier.
    fn get_by_id(
        &self,
        id: AlarmId,
    ) -> impl Future<Output = Result<Option<Alarm>, FlameWatchError>> + Send;

    /// Alarms matching `filter`, newest first.
    fn find(
        &self,
        filter: AlarmFilter,
    ) -> impl Future<Output = Result<Vec<Alarm>, FlameWatchError>> + Send;

    /// Overwrite an existing alarm. Fails with `NotFound` if it does not exist.
    fn update(&self, alarm: Alarm) -> impl Future<Output = Result<Alarm, FlameWatchError>> + Send;
}

impl<T: ZoneRepository + Send + Sync> ZoneRepository for Arc<T> {
    fn create(&self, zone: Zone) -> impl Future<Output = Result<Zone, FlameWatchError>> + Send {
        (**self).create(zone)
    }

    fn get_by_id(
        &self,
        id: ZoneId,
    ) -> impl Future<Output = Result<Option<Zone>, FlameWatchError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Zone>, FlameWatchError>> + Send {
        (**self).get_all()
    }

    fn update(&self, zone: Zone) -> impl Future<Output = Result<Zone, FlameWatchError>> + Send {
        (**self).update(zone)
    }

    fn delete(&self, id: ZoneId) -> impl Future<Output = Result<(), FlameWatchError>> + Send {
        (**self).delete(id)
    }
}

impl<T: NodeRepository + Send + Sync> NodeRepository for Arc<T> {
    fn create(&self, node: Node) -> impl Future<Output = Result<Node, FlameWatchError>> + Send {
        (**self).create(node)
    }

    fn get_by_id(
        &self,
        id: NodeId,
    ) -> impl Future<Output = Result<Option<Node>, FlameWatchError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Node>, FlameWatchError>> + Send {
        (**self).get_all()
    }

    fn find_by_address(
        &self,
        address: &DeviceAddress,
    ) -> impl Future<Output = Result<Option<Node>, FlameWatchError>> + Send {
        (**self).find_by_address(address)
    }

    fn find_by_zone(
        &self,
        zone_id: ZoneId,
    ) -> impl Future<Output = Result<Vec<Node>, FlameWatchError>> + Send {
        (**self).find_by_zone(zone_id)
    }

    fn update(&self, node: Node) -> impl Future<Output = Result<Node, FlameWatchError>> + Send {
        (**self).update(node)
    }

    fn record_contact(
        &self,
        id: NodeId,
        readings: Readings,
        seen_at: Timestamp,
    ) -> impl Future<Output = Result<Node, FlameWatchError>> + Send {
        (**self).record_contact(id, readings, seen_at)
    }
}

impl<T: AlarmRepository + Send + Sync> AlarmRepository for Arc<T> {
    fn create(&self, alarm: Alarm) -> impl Future<Output = Result<Alarm, FlameWatchError>> + Send {
        (**self).create(alarm)
    }

    fn get_by_id(
        &self,
        id: AlarmId,
    ) -> impl Future<Output = Result<Option<Alarm>, FlameWatchError>> + Send {
        (**self).get_by_id(id)
    }

    fn find(
        &self,
        filter: AlarmFilter,
    ) -> impl Future<Output = Result<Vec<Alarm>, FlameWatchError>> + Send {
        (**self).find(filter)
    }

    fn update(&self, alarm: Alarm) -> impl Future<Output = Result<Alarm, FlameWatchError>> + Send {
        (**self).update(alarm)
    }
}
