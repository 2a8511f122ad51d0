//! Outbound half of the MQTT link: node commands.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rumqttc::{AsyncClient, QoS};

use flamewatch_app::ports::CommandPublisher;
use flamewatch_domain::address::DeviceAddress;
use flamewatch_domain::command::NodeCommand;
use flamewatch_domain::error::FlameWatchError;
use flamewatch_domain::telemetry::command_topic;

use crate::error::MqttError;

/// Publishes [`NodeCommand`]s to `devices/<address>/command`.
///
/// Publishing never waits: a command is enqueued on the client's request
/// queue or refused on the spot.
#[derive(Clone)]
pub struct MqttTransport {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
}

impl MqttTransport {
    pub(crate) fn new(client: AsyncClient, connected: Arc<AtomicBool>) -> Self {
        Self { client, connected }
    }

    pub(crate) fn client(&self) -> AsyncClient {
        self.client.clone()
    }

    pub(crate) fn connected(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.connected)
    }

    /// Whether the broker link is currently up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn enqueue(&self, address: &DeviceAddress, command: NodeCommand) -> Result<(), MqttError> {
        if !self.is_connected() {
            return Err(MqttError::NotConnected);
        }
        self.client
            .try_publish(
                command_topic(address),
                QoS::AtLeastOnce,
                false,
                command.as_str(),
            )
            .map_err(MqttError::Client)
    }
}

impl CommandPublisher for MqttTransport {
    fn publish(
        &self,
        address: &DeviceAddress,
        command: NodeCommand,
    ) -> impl Future<Output = Result<(), FlameWatchError>> + Send {
        let result = self.enqueue(address, command).map_err(FlameWatchError::from);
        async move { result }
    }
}
