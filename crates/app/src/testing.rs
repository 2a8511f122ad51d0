//! In-memory fakes shared by the unit tests of this crate.
//!
//! Reads yield to the scheduler before returning so that concurrent tests
//! actually interleave between a read and the following write.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

use flamewatch_domain::address::DeviceAddress;
use flamewatch_domain::alarm::{Alarm, AlarmFilter};
use flamewatch_domain::command::NodeCommand;
use flamewatch_domain::error::{ConflictError, FlameWatchError, NotFoundError};
use flamewatch_domain::event::{Event, EventKind};
use flamewatch_domain::id::{AlarmId, NodeId, ZoneId};
use flamewatch_domain::node::{Node, Readings};
use flamewatch_domain::time::Timestamp;
use flamewatch_domain::zone::Zone;

use crate::ports::{
    AlarmRepository, CommandPublisher, EventPublisher, NodeRepository, ZoneRepository,
};

fn storage_down() -> FlameWatchError {
    FlameWatchError::Storage("store unavailable".into())
}

#[derive(Default)]
pub struct InMemoryZoneRepo {
    store: Mutex<HashMap<ZoneId, Zone>>,
}

impl ZoneRepository for InMemoryZoneRepo {
    async fn create(&self, zone: Zone) -> Result<Zone, FlameWatchError> {
        self.store.lock().unwrap().insert(zone.id, zone.clone());
        Ok(zone)
    }

    async fn get_by_id(&self, id: ZoneId) -> Result<Option<Zone>, FlameWatchError> {
        let found = self.store.lock().unwrap().get(&id).cloned();
        tokio::task::yield_now().await;
        Ok(found)
    }

    async fn get_all(&self) -> Result<Vec<Zone>, FlameWatchError> {
        Ok(self.store.lock().unwrap().values().cloned().collect())
    }

    async fn update(&self, zone: Zone) -> Result<Zone, FlameWatchError> {
        let mut store = self.store.lock().unwrap();
        let slot = store.get_mut(&zone.id).ok_or_else(|| NotFoundError {
            entity: "Zone",
            id: zone.id.to_string(),
        })?;
        *slot = zone.clone();
        Ok(zone)
    }

    async fn delete(&self, id: ZoneId) -> Result<(), FlameWatchError> {
        self.store
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| {
                NotFoundError {
                    entity: "Zone",
                    id: id.to_string(),
                }
                .into()
            })
    }
}

#[derive(Default)]
pub struct InMemoryNodeRepo {
    store: Mutex<HashMap<NodeId, Node>>,
    contact_gate: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
}

impl InMemoryNodeRepo {
    /// Pause the next contact write before it lands.
    ///
    /// The first handle is notified once the write is parked; notifying the
    /// second lets it through.
    pub fn hold_next_contact(&self) -> (Arc<Notify>, Arc<Notify>) {
        let parked = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.contact_gate.lock().unwrap() = Some((Arc::clone(&parked), Arc::clone(&release)));
        (parked, release)
    }
}

impl NodeRepository for InMemoryNodeRepo {
    async fn create(&self, node: Node) -> Result<Node, FlameWatchError> {
        node.validate()?;
        let mut store = self.store.lock().unwrap();
        if store.values().any(|n| n.address == node.address) {
            return Err(ConflictError {
                entity: "Node",
                key: "address",
                value: node.address.to_string(),
            }
            .into());
        }
        store.insert(node.id, node.clone());
        Ok(node)
    }

    async fn get_by_id(&self, id: NodeId) -> Result<Option<Node>, FlameWatchError> {
        let found = self.store.lock().unwrap().get(&id).cloned();
        tokio::task::yield_now().await;
        Ok(found)
    }

    async fn get_all(&self) -> Result<Vec<Node>, FlameWatchError> {
        Ok(self.store.lock().unwrap().values().cloned().collect())
    }

    async fn find_by_address(
        &self,
        address: &DeviceAddress,
    ) -> Result<Option<Node>, FlameWatchError> {
        let found = self
            .store
            .lock()
            .unwrap()
            .values()
            .find(|n| &n.address == address)
            .cloned();
        tokio::task::yield_now().await;
        Ok(found)
    }

    async fn find_by_zone(&self, zone_id: ZoneId) -> Result<Vec<Node>, FlameWatchError> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .values()
            .filter(|n| n.zone_id == Some(zone_id))
            .cloned()
            .collect())
    }

    async fn update(&self, node: Node) -> Result<Node, FlameWatchError> {
        node.validate()?;
        let mut store = self.store.lock().unwrap();
        let slot = store.get_mut(&node.id).ok_or_else(|| NotFoundError {
            entity: "Node",
            id: node.id.to_string(),
        })?;
        *slot = node.clone();
        Ok(node)
    }

    async fn record_contact(
        &self,
        id: NodeId,
        readings: Readings,
        seen_at: Timestamp,
    ) -> Result<Node, FlameWatchError> {
        let gate = self.contact_gate.lock().unwrap().take();
        if let Some((parked, release)) = gate {
            parked.notify_one();
            release.notified().await;
        }
        let mut store = self.store.lock().unwrap();
        let slot = store.get_mut(&id).ok_or_else(|| NotFoundError {
            entity: "Node",
            id: id.to_string(),
        })?;
        slot.readings = readings;
        slot.last_seen = Some(seen_at);
        slot.updated_at = seen_at;
        Ok(slot.clone())
    }
}

#[derive(Default)]
pub struct InMemoryAlarmRepo {
    store: Mutex<Vec<Alarm>>,
    pub fail_creates: AtomicBool,
}

impl InMemoryAlarmRepo {
    /// Insert a row directly, bypassing the state machine.
    pub fn insert_raw(&self, alarm: Alarm) {
        self.store.lock().unwrap().push(alarm);
    }

    pub fn open_count(&self, zone_id: ZoneId) -> usize {
        let filter = AlarmFilter::open_in(zone_id);
        self.store
            .lock()
            .unwrap()
            .iter()
            .filter(|a| filter.matches(a))
            .count()
    }

    pub fn all(&self) -> Vec<Alarm> {
        self.store.lock().unwrap().clone()
    }
}

impl AlarmRepository for InMemoryAlarmRepo {
    async fn create(&self, alarm: Alarm) -> Result<Alarm, FlameWatchError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(storage_down());
        }
        self.store.lock().unwrap().push(alarm.clone());
        Ok(alarm)
    }

    async fn get_by_id(&self, id: AlarmId) -> Result<Option<Alarm>, FlameWatchError> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn find(&self, filter: AlarmFilter) -> Result<Vec<Alarm>, FlameWatchError> {
        let mut found: Vec<Alarm> = self
            .store
            .lock()
            .unwrap()
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        tokio::task::yield_now().await;
        Ok(found)
    }

    async fn update(&self, alarm: Alarm) -> Result<Alarm, FlameWatchError> {
        let mut store = self.store.lock().unwrap();
        let slot = store
            .iter_mut()
            .find(|a| a.id == alarm.id)
            .ok_or_else(|| NotFoundError {
                entity: "Alarm",
                id: alarm.id.to_string(),
            })?;
        *slot = alarm.clone();
        Ok(alarm)
    }
}

/// Records every command instead of sending it.
#[derive(Default)]
pub struct RecordingPublisher {
    sent: Mutex<Vec<(DeviceAddress, NodeCommand)>>,
    pub offline: AtomicBool,
}

impl RecordingPublisher {
    pub fn sent(&self) -> Vec<(DeviceAddress, NodeCommand)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self, command: NodeCommand) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, c)| *c == command)
            .count()
    }
}

impl CommandPublisher for RecordingPublisher {
    async fn publish(
        &self,
        address: &DeviceAddress,
        command: NodeCommand,
    ) -> Result<(), FlameWatchError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(FlameWatchError::Transport("link down".into()));
        }
        self.sent.lock().unwrap().push((address.clone(), command));
        Ok(())
    }
}

/// Records every published event.
#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<Event>>,
}

impl RecordingEvents {
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.kind.clone())
            .collect()
    }
}

impl EventPublisher for RecordingEvents {
    async fn publish(&self, event: Event) -> Result<(), FlameWatchError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}
