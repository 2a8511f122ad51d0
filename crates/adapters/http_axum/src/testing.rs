//! In-memory wiring for handler tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, header};
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use flamewatch_app::alarm_state_machine::ZoneAlarmStateMachine;
use flamewatch_app::event_bus::InProcessEventBus;
use flamewatch_app::ports::{AlarmRepository, CommandPublisher, NodeRepository, ZoneRepository};
use flamewatch_app::services::node_service::NodeService;
use flamewatch_app::services::zone_service::ZoneService;
use flamewatch_domain::address::DeviceAddress;
use flamewatch_domain::alarm::{Alarm, AlarmFilter};
use flamewatch_domain::command::NodeCommand;
use flamewatch_domain::error::{ConflictError, FlameWatchError, NotFoundError};
use flamewatch_domain::id::{AlarmId, NodeId, ZoneId};
use flamewatch_domain::node::{Node, Readings};
use flamewatch_domain::time::Timestamp;
use flamewatch_domain::zone::{Thresholds, Zone};

use crate::state::AppState;

#[derive(Default)]
pub struct MemZones(Mutex<HashMap<ZoneId, Zone>>);

impl ZoneRepository for MemZones {
    async fn create(&self, zone: Zone) -> Result<Zone, FlameWatchError> {
        self.0.lock().unwrap().insert(zone.id, zone.clone());
        Ok(zone)
    }
    async fn get_by_id(&self, id: ZoneId) -> Result<Option<Zone>, FlameWatchError> {
        Ok(self.0.lock().unwrap().get(&id).cloned())
    }
    async fn get_all(&self) -> Result<Vec<Zone>, FlameWatchError> {
        Ok(self.0.lock().unwrap().values().cloned().collect())
    }
    async fn update(&self, zone: Zone) -> Result<Zone, FlameWatchError> {
        match self.0.lock().unwrap().get_mut(&zone.id) {
            Some(slot) => {
                *slot = zone.clone();
                Ok(zone)
            }
            None => Err(missing("Zone", zone.id)),
        }
    }
    async fn delete(&self, id: ZoneId) -> Result<(), FlameWatchError> {
        self.0
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| missing("Zone", id))
    }
}

#[derive(Default)]
pub struct MemNodes(Mutex<HashMap<NodeId, Node>>);

impl NodeRepository for MemNodes {
    async fn create(&self, node: Node) -> Result<Node, FlameWatchError> {
        let mut nodes = self.0.lock().unwrap();
        if nodes.values().any(|n| n.address == node.address) {
            return Err(ConflictError {
                entity: "Node",
                key: "address",
                value: node.address.to_string(),
            }
            .into());
        }
        nodes.insert(node.id, node.clone());
        Ok(node)
    }
    async fn get_by_id(&self, id: NodeId) -> Result<Option<Node>, FlameWatchError> {
        Ok(self.0.lock().unwrap().get(&id).cloned())
    }
    async fn get_all(&self) -> Result<Vec<Node>, FlameWatchError> {
        Ok(self.0.lock().unwrap().values().cloned().collect())
    }
    async fn find_by_address(
        &self,
        address: &DeviceAddress,
    ) -> Result<Option<Node>, FlameWatchError> {
        let nodes = self.0.lock().unwrap();
        Ok(nodes.values().find(|n| &n.address == address).cloned())
    }
    async fn find_by_zone(&self, zone_id: ZoneId) -> Result<Vec<Node>, FlameWatchError> {
        let nodes = self.0.lock().unwrap();
        Ok(nodes
            .values()
            .filter(|n| n.zone_id == Some(zone_id))
            .cloned()
            .collect())
    }
    async fn update(&self, node: Node) -> Result<Node, FlameWatchError> {
        match self.0.lock().unwrap().get_mut(&node.id) {
            Some(slot) => {
                *slot = node.clone();
                Ok(node)
            }
            None => Err(missing("Node", node.id)),
        }
    }
    async fn record_contact(
        &self,
        id: NodeId,
        readings: Readings,
        seen_at: Timestamp,
    ) -> Result<Node, FlameWatchError> {
        match self.0.lock().unwrap().get_mut(&id) {
            Some(slot) => {
                slot.readings = readings;
                slot.last_seen = Some(seen_at);
                slot.updated_at = seen_at;
                Ok(slot.clone())
            }
            None => Err(missing("Node", id)),
        }
    }
}

#[derive(Default)]
pub struct MemAlarms(Mutex<HashMap<AlarmId, Alarm>>);

impl AlarmRepository for MemAlarms {
    async fn create(&self, alarm: Alarm) -> Result<Alarm, FlameWatchError> {
        self.0.lock().unwrap().insert(alarm.id, alarm.clone());
        Ok(alarm)
    }
    async fn get_by_id(&self, id: AlarmId) -> Result<Option<Alarm>, FlameWatchError> {
        Ok(self.0.lock().unwrap().get(&id).cloned())
    }
    async fn find(&self, filter: AlarmFilter) -> Result<Vec<Alarm>, FlameWatchError> {
        let mut found: Vec<Alarm> = self
            .0
            .lock()
            .unwrap()
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(found)
    }
    async fn update(&self, alarm: Alarm) -> Result<Alarm, FlameWatchError> {
        match self.0.lock().unwrap().get_mut(&alarm.id) {
            Some(slot) => {
                *slot = alarm.clone();
                Ok(alarm)
            }
            None => Err(missing("Alarm", alarm.id)),
        }
    }
}

/// Records every command instead of sending it.
#[derive(Default)]
pub struct RecordingPublisher(Mutex<Vec<(String, String)>>);

impl CommandPublisher for RecordingPublisher {
    async fn publish(
        &self,
        address: &DeviceAddress,
        command: NodeCommand,
    ) -> Result<(), FlameWatchError> {
        self.0
            .lock()
            .unwrap()
            .push((address.to_string(), command.to_string()));
        Ok(())
    }
}

fn missing(entity: &'static str, id: impl ToString) -> FlameWatchError {
    NotFoundError {
        entity,
        id: id.to_string(),
    }
    .into()
}

/// A fully wired router over in-memory repositories.
pub struct TestApp {
    router: Router,
    publisher: Arc<RecordingPublisher>,
}

impl TestApp {
    pub fn new() -> Self {
        let zones = Arc::new(MemZones::default());
        let nodes = Arc::new(MemNodes::default());
        let alarms = Arc::new(MemAlarms::default());
        let publisher = Arc::new(RecordingPublisher::default());
        let event_bus = Arc::new(InProcessEventBus::new(64));

        let machine = Arc::new(ZoneAlarmStateMachine::new(
            Arc::clone(&zones),
            Arc::clone(&nodes),
            Arc::clone(&alarms),
            Arc::clone(&publisher),
            Arc::clone(&event_bus),
        ));
        let state = AppState::new(
            ZoneService::new(zones, alarms, Thresholds::default()),
            NodeService::new(nodes),
            machine,
            event_bus,
        );

        Self {
            router: crate::router::build(state),
            publisher,
        }
    }

    pub fn commands(&self) -> Vec<(String, String)> {
        self.publisher.0.lock().unwrap().clone()
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Response {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> Response {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> Response {
        self.send(Method::DELETE, uri, None).await
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        };
        self.router.clone().oneshot(request.unwrap()).await.unwrap()
    }
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
