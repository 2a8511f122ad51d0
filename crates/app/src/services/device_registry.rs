//! Device registry — resolves device addresses to node records.
//!
//! Unknown addresses are auto-provisioned on first contact. The store's
//! uniqueness constraint on the address is the source of truth: a writer that
//! loses a creation race re-reads the winner instead of failing, so there is
//! no process-local "seen devices" cache to drift out of sync.

use flamewatch_domain::address::DeviceAddress;
use flamewatch_domain::error::FlameWatchError;
use flamewatch_domain::node::Node;
use flamewatch_domain::telemetry::SensorReading;
use flamewatch_domain::time::now;

use crate::keyed_lock::KeyedLocks;
use crate::ports::NodeRepository;

/// Resolves and updates node records by device address.
pub struct DeviceRegistry<R> {
    repo: R,
    locks: KeyedLocks<DeviceAddress>,
}

impl<R: NodeRepository> DeviceRegistry<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            locks: KeyedLocks::new(),
        }
    }

    /// Return the node owning `address`, creating a provisioning node when
    /// none exists. The flag is `true` when this call created it.
    ///
    /// # Errors
    ///
    /// Returns a storage error from the repository.
    pub async fn resolve(&self, address: &DeviceAddress) -> Result<(Node, bool), FlameWatchError> {
        if let Some(node) = self.repo.find_by_address(address).await? {
            return Ok((node, false));
        }

        match self.repo.create(Node::provisioned(address.clone(), now())).await {
            Ok(node) => {
                tracing::info!(%address, node_id = %node.id, "node provisioned");
                Ok((node, true))
            }
            Err(err) if err.is_conflict() => {
                tracing::debug!(%address, "lost provisioning race, reading winner");
                let node = self.repo.find_by_address(address).await?.ok_or(err)?;
                Ok((node, false))
            }
            Err(err) => Err(err),
        }
    }

    /// Resolve `address`, then record contact and the optional reading.
    ///
    /// Only the field carried by `reading` is overwritten; the others keep
    /// their last value. Zone membership and status are never written here,
    /// so a concurrent detach or zone deletion is never undone. Updates for
    /// the same address are serialized.
    ///
    /// # Errors
    ///
    /// Returns a storage error from the repository.
    #[tracing::instrument(skip(self, reading), fields(address = %address))]
    pub async fn touch(
        &self,
        address: &DeviceAddress,
        reading: Option<SensorReading>,
    ) -> Result<(Node, bool), FlameWatchError> {
        let _guard = self.locks.lock(address.clone()).await;

        let (node, created) = self.resolve(address).await?;
        let mut readings = node.readings;
        if let Some(reading) = reading {
            readings.apply(reading);
        }
        let node = self.repo.record_contact(node.id, readings, now()).await?;
        Ok((node, created))
    }
}
