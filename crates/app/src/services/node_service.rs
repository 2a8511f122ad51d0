//! Node service — administrative node registration and reads.
//!
//! Zone membership changes go through
//! [`ZoneAlarmStateMachine`](crate::alarm_state_machine::ZoneAlarmStateMachine).

use flamewatch_domain::address::DeviceAddress;
use flamewatch_domain::error::{FlameWatchError, NotFoundError};
use flamewatch_domain::id::NodeId;
use flamewatch_domain::node::Node;

use crate::ports::NodeRepository;

/// Application service for node CRUD operations.
pub struct NodeService<R> {
    repo: R,
}

impl<R: NodeRepository> NodeService<R> {
    /// Create a new service backed by the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Register a node ahead of its first contact. It starts `Provisioning`.
    ///
    /// # Errors
    ///
    /// Returns [`FlameWatchError::Validation`] for a malformed address,
    /// [`FlameWatchError::Conflict`] when the address is already registered,
    /// or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn create_node(&self, address: &str) -> Result<Node, FlameWatchError> {
        let address = DeviceAddress::parse(address)?;
        let node = self.repo.create(Node::registered(address)).await?;
        tracing::info!(node_id = %node.id, address = %node.address, "node registered");
        Ok(node)
    }

    /// Look up a node by id.
    ///
    /// # Errors
    ///
    /// Returns [`FlameWatchError::NotFound`] when no node with `id` exists,
    /// or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn get_node(&self, id: NodeId) -> Result<Node, FlameWatchError> {
        self.repo.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Node",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// List all nodes.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_nodes(&self) -> Result<Vec<Node>, FlameWatchError> {
        self.repo.get_all().await
    }
}
