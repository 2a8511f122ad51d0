//! Command port — outbound actuator commands.

use std::future::Future;

use flamewatch_domain::address::DeviceAddress;
use flamewatch_domain::command::NodeCommand;
use flamewatch_domain::error::FlameWatchError;

/// Delivers a command to a single node over the transport.
///
/// Delivery is best-effort. Implementations return
/// [`FlameWatchError::Transport`] when the link is down instead of queueing.
pub trait CommandPublisher {
    fn publish(
        &self,
        address: &DeviceAddress,
        command: NodeCommand,
    ) -> impl Future<Output = Result<(), FlameWatchError>> + Send;
}

impl<T: CommandPublisher + Send + Sync> CommandPublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        address: &DeviceAddress,
        command: NodeCommand,
    ) -> impl Future<Output = Result<(), FlameWatchError>> + Send {
        (**self).publish(address, command)
    }
}
