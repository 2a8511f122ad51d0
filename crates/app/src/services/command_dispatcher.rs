//! Command dispatcher — fire-and-forget actuator commands.

use flamewatch_domain::address::DeviceAddress;
use flamewatch_domain::command::NodeCommand;
use flamewatch_domain::node::Node;

use crate::ports::CommandPublisher;

/// Sends commands to nodes without acknowledgment or retry.
///
/// Delivery failures are logged and dropped. A command that could not be sent
/// while the link was down is not replayed later.
pub struct CommandDispatcher<P> {
    publisher: P,
}

impl<P: CommandPublisher> CommandDispatcher<P> {
    pub fn new(publisher: P) -> Self {
        Self { publisher }
    }

    /// Send `command` to one node. Returns whether the transport accepted it.
    pub async fn send(&self, address: &DeviceAddress, command: NodeCommand) -> bool {
        match self.publisher.publish(address, command).await {
            Ok(()) => {
                tracing::debug!(%address, %command, "command sent");
                true
            }
            Err(err) => {
                tracing::warn!(%address, %command, %err, "command dropped");
                false
            }
        }
    }

    /// Send `command` to every node in `nodes`. Returns how many were accepted.
    pub async fn broadcast(&self, nodes: &[Node], command: NodeCommand) -> usize {
        let mut accepted = 0;
        for node in nodes {
            if self.send(&node.address, command).await {
                accepted += 1;
            }
        }
        accepted
    }
}
