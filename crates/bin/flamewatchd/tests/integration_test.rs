//! End-to-end tests for the full flamewatchd stack.
//!
//! Each test spins up the complete application (in-memory `SQLite`, real repos,
//! real state machine and pipeline, real axum router). Telemetry is fed
//! straight into the pipeline as the MQTT loop would; administration goes
//! through the HTTP layer via `tower::ServiceExt::oneshot` — no TCP port is
//! bound and no broker is needed.

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use flamewatch_adapter_http_axum::router;
use flamewatch_adapter_http_axum::state::AppState;
use flamewatch_adapter_storage_sqlite_sqlx::alarm_repo::SqliteAlarmRepository;
use flamewatch_adapter_storage_sqlite_sqlx::node_repo::SqliteNodeRepository;
use flamewatch_adapter_storage_sqlite_sqlx::pool::Config;
use flamewatch_adapter_storage_sqlite_sqlx::zone_repo::SqliteZoneRepository;
use flamewatch_app::alarm_state_machine::ZoneAlarmStateMachine;
use flamewatch_app::event_bus::InProcessEventBus;
use flamewatch_app::pipeline::TelemetryPipeline;
use flamewatch_app::ports::{CommandPublisher, IngestOutcome, TelemetryHandler};
use flamewatch_app::services::node_service::NodeService;
use flamewatch_app::services::zone_service::ZoneService;
use flamewatch_domain::address::DeviceAddress;
use flamewatch_domain::alarm::TriggerCause;
use flamewatch_domain::command::NodeCommand;
use flamewatch_domain::error::FlameWatchError;
use flamewatch_domain::zone::Thresholds;

const NODE: &str = "AA:BB:CC:DD:EE:01";

/// Records every command instead of sending it to a broker.
#[derive(Default)]
struct RecordingPublisher(Mutex<Vec<(String, NodeCommand)>>);

impl CommandPublisher for RecordingPublisher {
    async fn publish(
        &self,
        address: &DeviceAddress,
        command: NodeCommand,
    ) -> Result<(), FlameWatchError> {
        self.0
            .lock()
            .unwrap()
            .push((address.to_string(), command));
        Ok(())
    }
}

type Pipeline = TelemetryPipeline<
    Arc<SqliteZoneRepository>,
    Arc<SqliteNodeRepository>,
    Arc<SqliteAlarmRepository>,
    Arc<RecordingPublisher>,
    Arc<InProcessEventBus>,
>;

struct Stack {
    router: axum::Router,
    pipeline: Arc<Pipeline>,
    publisher: Arc<RecordingPublisher>,
}

/// Build a fully-wired stack backed by an in-memory `SQLite` database.
async fn stack() -> Stack {
    let db = Config {
        database_url: "sqlite::memory:".to_string(),
        max_connections: 1,
    }
    .build()
    .await
    .expect("in-memory database should initialise");
    let pool = db.pool().clone();

    let zones = Arc::new(SqliteZoneRepository::new(pool.clone()));
    let nodes = Arc::new(SqliteNodeRepository::new(pool.clone()));
    let alarms = Arc::new(SqliteAlarmRepository::new(pool));
    let publisher = Arc::new(RecordingPublisher::default());
    let event_bus = Arc::new(InProcessEventBus::new(256));

    let machine = Arc::new(ZoneAlarmStateMachine::new(
        Arc::clone(&zones),
        Arc::clone(&nodes),
        Arc::clone(&alarms),
        Arc::clone(&publisher),
        Arc::clone(&event_bus),
    ));
    let pipeline = Arc::new(TelemetryPipeline::new(
        Arc::clone(&nodes),
        Arc::clone(&machine),
        Arc::clone(&event_bus),
    ));
    let state = AppState::new(
        ZoneService::new(zones, alarms, Thresholds::default()),
        NodeService::new(nodes),
        machine,
        event_bus,
    );

    Stack {
        router: router::build(state),
        pipeline,
        publisher,
    }
}

impl Stack {
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

    async fn get_json(&self, uri: &str) -> Value {
        let resp = self.send(Method::GET, uri, None).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {uri}");
        json_body(resp).await
    }

    async fn post_json(&self, uri: &str, body: Value) -> Value {
        let resp = self.send(Method::POST, uri, Some(body)).await;
        assert!(resp.status().is_success(), "POST {uri}: {}", resp.status());
        json_body(resp).await
    }

    async fn telemetry(&self, topic: &str, payload: &str) -> IngestOutcome {
        self.pipeline.handle(topic, payload.as_bytes()).await
    }

    fn commands(&self) -> Vec<(String, NodeCommand)> {
        self.publisher.0.lock().unwrap().clone()
    }

    /// A zone with one assigned node, returning the zone id.
    async fn armed_zone(&self) -> String {
        let zone = self
            .post_json(
                "/api/zones",
                json!({"name": "Server room", "temp_threshold": 50.0}),
            )
            .await;
        let zone_id = zone["id"].as_str().unwrap().to_string();
        self.post_json(
            "/api/nodes",
            json!({"mac_address": NODE, "zone_id": zone_id}),
        )
        .await;
        zone_id
    }
}

async fn json_body(resp: Response) -> Value {
    serde_json::from_slice(&resp.into_body().collect().await.unwrap().to_bytes()).unwrap()
}

fn sensor(kind: &str) -> String {
    format!("devices/{NODE}/sensor/{kind}")
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_return_ok_when_health_check_called() {
    let stack = stack().await;
    let resp = stack.send(Method::GET, "/health", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Alarm lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_raise_temperature_alarm_once_and_resolve_it() {
    let stack = stack().await;
    let zone_id = stack.armed_zone().await;

    // Over threshold: the zone alarms and the node is actuated.
    let outcome = stack.telemetry(&sensor("temp"), "55.0").await;
    assert!(matches!(
        outcome,
        IngestOutcome::Recorded {
            raised: Some(TriggerCause::Temperature),
            ..
        }
    ));
    let zone = stack.get_json(&format!("/api/zones/{zone_id}")).await;
    assert_eq!(zone["status"], json!({"state": "alarm", "cause": "temperature"}));
    let open = stack
        .get_json(&format!("/api/alarms?zone_id={zone_id}&open=true"))
        .await;
    assert_eq!(open.as_array().unwrap().len(), 1);
    assert_eq!(open[0]["cause"], "temperature");
    assert!(open[0]["end_time"].is_null());
    assert_eq!(
        stack.commands(),
        vec![(NODE.to_string(), NodeCommand::ActuateAlarm)]
    );

    // Still hot: no second alarm, no duplicate command.
    let outcome = stack.telemetry(&sensor("temp"), "60.0").await;
    assert!(matches!(outcome, IngestOutcome::Recorded { raised: None, .. }));
    let alarms = stack
        .get_json(&format!("/api/zones/{zone_id}/alarms"))
        .await;
    assert_eq!(alarms.as_array().unwrap().len(), 1);
    assert_eq!(stack.commands().len(), 1);

    // Administrative resolve closes the alarm and stops the node.
    let resolved = stack
        .post_json(&format!("/api/zones/{zone_id}/resolve"), Value::Null)
        .await;
    assert_eq!(resolved["zone"]["status"]["state"], "active");
    let alarms = stack
        .get_json(&format!("/api/zones/{zone_id}/alarms"))
        .await;
    assert!(!alarms[0]["end_time"].is_null());
    assert_eq!(
        stack.commands().last(),
        Some(&(NODE.to_string(), NodeCommand::StopAlarm))
    );
}

#[tokio::test]
async fn should_not_resolve_when_readings_fall_back() {
    let stack = stack().await;
    let zone_id = stack.armed_zone().await;

    stack.telemetry(&sensor("temp"), "55.0").await;
    stack.telemetry(&sensor("temp"), "20.0").await;

    let zone = stack.get_json(&format!("/api/zones/{zone_id}")).await;
    assert_eq!(zone["status"]["state"], "alarm");
}

#[tokio::test]
async fn should_alarm_on_flame_when_sensor_reports_zero() {
    let stack = stack().await;
    let zone_id = stack.armed_zone().await;

    stack.telemetry(&sensor("flame"), "1").await;
    let zone = stack.get_json(&format!("/api/zones/{zone_id}")).await;
    assert_eq!(zone["status"]["state"], "active");

    stack.telemetry(&sensor("flame"), "0").await;
    let zone = stack.get_json(&format!("/api/zones/{zone_id}")).await;
    assert_eq!(zone["status"], json!({"state": "alarm", "cause": "flame"}));
}

#[tokio::test]
async fn should_override_sensor_alarm_with_manual_trigger() {
    let stack = stack().await;
    let zone_id = stack.armed_zone().await;
    stack.telemetry(&sensor("smoke"), "900").await;

    let body = stack
        .post_json(&format!("/api/zones/{zone_id}/trigger"), Value::Null)
        .await;

    assert_eq!(body["outcome"], "overridden");
    let open = stack
        .get_json(&format!("/api/alarms?zone_id={zone_id}&open=true"))
        .await;
    assert_eq!(open.as_array().unwrap().len(), 1);
    assert_eq!(open[0]["cause"], "manual");
}

// ---------------------------------------------------------------------------
// Discovery and provisioning
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_provision_node_once_on_repeated_discovery() {
    let stack = stack().await;
    let topic = format!("devices/{NODE}/discovery");

    let first = stack.telemetry(&topic, "online").await;
    let second = stack.telemetry(&topic, "online").await;

    assert!(matches!(first, IngestOutcome::Discovered { created: true, .. }));
    assert!(matches!(second, IngestOutcome::Discovered { created: false, .. }));
    let nodes = stack.get_json("/api/nodes").await;
    assert_eq!(nodes.as_array().unwrap().len(), 1);
    assert_eq!(nodes[0]["status"], "provisioning");
    assert_eq!(nodes[0]["address"], NODE);
}

#[tokio::test]
async fn should_store_reading_of_unassigned_node_without_alarm() {
    let stack = stack().await;

    let outcome = stack.telemetry(&sensor("temp"), "99.0").await;

    assert!(matches!(outcome, IngestOutcome::Recorded { raised: None, .. }));
    let nodes = stack.get_json("/api/nodes").await;
    assert_eq!(nodes[0]["readings"]["temperature"], 99.0);
    assert!(stack.commands().is_empty());
}

#[tokio::test]
async fn should_reject_malformed_telemetry_without_side_effects() {
    let stack = stack().await;

    let bad_root = stack.telemetry("sensors/AA/sensor/temp", "55.0").await;
    let bad_value = stack.telemetry(&sensor("temp"), "hot").await;

    assert!(matches!(bad_root, IngestOutcome::Rejected(_)));
    assert!(matches!(bad_value, IngestOutcome::Rejected(_)));
    let nodes = stack.get_json("/api/nodes").await;
    assert!(nodes.as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Zone deletion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_close_alarms_and_detach_nodes_when_zone_deleted() {
    let stack = stack().await;
    let zone_id = stack.armed_zone().await;
    stack.telemetry(&sensor("temp"), "55.0").await;

    let resp = stack
        .send(Method::DELETE, &format!("/api/zones/{zone_id}"), None)
        .await;

    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let nodes = stack.get_json("/api/nodes").await;
    assert_eq!(nodes[0]["status"], "inactive");
    assert!(nodes[0]["zone_id"].is_null());
    let open = stack.get_json("/api/alarms?open=true").await;
    assert!(open.as_array().unwrap().is_empty());
    assert_eq!(
        stack.commands().last(),
        Some(&(NODE.to_string(), NodeCommand::StopAlarm))
    );

    // Readings from the detached node no longer alarm anything.
    let outcome = stack.telemetry(&sensor("temp"), "80.0").await;
    assert!(matches!(outcome, IngestOutcome::Recorded { raised: None, .. }));
}
