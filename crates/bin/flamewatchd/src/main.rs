//! # flamewatchd — flamewatch daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars) and initialize logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct repository implementations (adapters)
//! - Construct the zone alarm state machine and the telemetry pipeline,
//!   injecting repositories and the MQTT transport via port traits
//! - Start the MQTT connection loop feeding the pipeline
//! - Build the axum router, bind to a TCP port and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use flamewatch_adapter_http_axum::router;
use flamewatch_adapter_http_axum::state::AppState;
use flamewatch_adapter_mqtt::MqttIntegration;
use flamewatch_adapter_storage_sqlite_sqlx::alarm_repo::SqliteAlarmRepository;
use flamewatch_adapter_storage_sqlite_sqlx::node_repo::SqliteNodeRepository;
use flamewatch_adapter_storage_sqlite_sqlx::pool;
use flamewatch_adapter_storage_sqlite_sqlx::zone_repo::SqliteZoneRepository;
use flamewatch_app::alarm_state_machine::ZoneAlarmStateMachine;
use flamewatch_app::event_bus::InProcessEventBus;
use flamewatch_app::pipeline::TelemetryPipeline;
use flamewatch_app::services::node_service::NodeService;
use flamewatch_app::services::zone_service::ZoneService;

const EVENT_BUS_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Database
    let db = pool::Config {
        database_url: config.database.url.clone(),
        max_connections: config.database.max_connections,
    }
    .build()
    .await
    .context("failed to initialise database")?;
    let pool = db.pool().clone();

    // Repositories
    let zones = Arc::new(SqliteZoneRepository::new(pool.clone()));
    let nodes = Arc::new(SqliteNodeRepository::new(pool.clone()));
    let alarms = Arc::new(SqliteAlarmRepository::new(pool));

    // Event bus
    let event_bus = Arc::new(InProcessEventBus::new(EVENT_BUS_CAPACITY));

    // Transport, state machine and ingestion
    let mut mqtt = MqttIntegration::new(config.mqtt.clone());
    let machine = Arc::new(ZoneAlarmStateMachine::new(
        Arc::clone(&zones),
        Arc::clone(&nodes),
        Arc::clone(&alarms),
        mqtt.transport(),
        Arc::clone(&event_bus),
    ));
    let pipeline = Arc::new(TelemetryPipeline::new(
        Arc::clone(&nodes),
        Arc::clone(&machine),
        Arc::clone(&event_bus),
    ));
    mqtt.start_background(pipeline);

    // HTTP
    let state = AppState::new(
        ZoneService::new(zones, alarms, config.zones.thresholds()),
        NodeService::new(nodes),
        machine,
        event_bus,
    );
    let app = router::build(state);

    let bind_addr = config.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(%bind_addr, "flamewatchd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    mqtt.teardown();
    tracing::info!("flamewatchd stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown requested");
}
