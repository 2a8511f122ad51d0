//! MQTT adapter error types.

use flamewatch_domain::error::FlameWatchError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The broker link is down.
    #[error("MQTT client not connected")]
    NotConnected,

    /// The rumqttc client refused the request (queue full or closed).
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),
}

impl From<MqttError> for FlameWatchError {
    fn from(err: MqttError) -> Self {
        FlameWatchError::Transport(Box::new(err))
    }
}
