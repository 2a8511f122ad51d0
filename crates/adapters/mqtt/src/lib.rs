//! # flamewatch-adapter-mqtt
//!
//! MQTT transport for device telemetry and node commands, built on rumqttc.
//!
//! ## Topics
//!
//! | Direction | Topic | Payload |
//! |-----------|-------|---------|
//! | in | `devices/<address>/discovery` | `online` |
//! | in | `devices/<address>/sensor/<temp\|smoke\|flame>` | reading as text |
//! | out | `devices/<address>/command` | `actuate_alarm` / `stop_alarm` |
//!
//! Inbound messages go to a [`TelemetryHandler`]; outbound commands are sent
//! through [`MqttTransport`], which implements
//! [`CommandPublisher`](flamewatch_app::ports::CommandPublisher).
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `flamewatch-app` and `flamewatch-domain`.

mod config;
mod error;
mod event_loop;
mod transport;

pub use config::MqttConfig;
pub use error::MqttError;
pub use transport::MqttTransport;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use rumqttc::{AsyncClient, EventLoop, MqttOptions};
use tokio::task::JoinHandle;

use flamewatch_app::ports::TelemetryHandler;

use crate::event_loop::LinkState;

/// Owns the broker connection and its background task.
pub struct MqttIntegration {
    config: MqttConfig,
    transport: MqttTransport,
    eventloop: Option<EventLoop>,
    handle: Option<JoinHandle<()>>,
}

impl MqttIntegration {
    /// Prepare a client for the configured broker. Nothing connects until
    /// [`start_background`](Self::start_background) is called.
    #[must_use]
    pub fn new(config: MqttConfig) -> Self {
        let mut options =
            MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
        options.set_keep_alive(config.keep_alive());

        let (client, eventloop) = AsyncClient::new(options, config.request_capacity.max(1));
        let transport = MqttTransport::new(client, Arc::new(AtomicBool::new(false)));

        Self {
            config,
            transport,
            eventloop: Some(eventloop),
            handle: None,
        }
    }

    /// A handle for publishing commands. Cheap to clone.
    #[must_use]
    pub fn transport(&self) -> MqttTransport {
        self.transport.clone()
    }

    /// Spawn the connection loop, feeding every inbound message to `handler`.
    ///
    /// Calling it a second time does nothing.
    pub fn start_background<H>(&mut self, handler: Arc<H>)
    where
        H: TelemetryHandler + Send + Sync + 'static,
    {
        let Some(eventloop) = self.eventloop.take() else {
            tracing::warn!("MQTT integration already started");
            return;
        };

        let link = LinkState {
            client: self.transport.client(),
            connected: self.transport.connected(),
            max_in_flight: self.config.max_in_flight,
            reconnect_delay: self.config.reconnect_delay(),
        };
        self.handle = Some(tokio::spawn(event_loop::run(eventloop, link, handler)));

        tracing::info!(
            host = %self.config.broker_host,
            port = self.config.broker_port,
            max_in_flight = self.config.max_in_flight,
            "MQTT integration started"
        );
    }

    /// Stop the connection loop. Handlers already running finish on their own.
    pub fn teardown(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("MQTT task aborted");
        }
        tracing::info!("MQTT integration stopped");
    }
}
