//! Telemetry ingestion pipeline.
//!
//! One inbound message flows through: topic router, device registry, then,
//! for armed nodes, the zone alarm state machine. Every failure is contained to
//! the message that caused it: it is logged and the message is dropped, which
//! is safe because sensors report periodically and the next reading retries.

use std::sync::Arc;

use flamewatch_domain::error::FlameWatchError;
use flamewatch_domain::event::{Event, EventKind};
use flamewatch_domain::node::NodeStatus;
use flamewatch_domain::telemetry::{self, DiscoveryEvent, RoutedMessage, SensorEvent};

use crate::alarm_state_machine::ZoneAlarmStateMachine;
use crate::ports::{
    AlarmRepository, CommandPublisher, EventPublisher, IngestOutcome, NodeRepository,
    TelemetryHandler, ZoneRepository,
};
use crate::services::device_registry::DeviceRegistry;

/// Orchestrates the handling of one inbound transport message.
pub struct TelemetryPipeline<ZR, NR, AR, CP, EP> {
    registry: DeviceRegistry<NR>,
    machine: Arc<ZoneAlarmStateMachine<ZR, NR, AR, CP, EP>>,
    events: EP,
}

impl<ZR, NR, AR, CP, EP> TelemetryPipeline<ZR, NR, AR, CP, EP>
where
    ZR: ZoneRepository + Send + Sync,
    NR: NodeRepository + Send + Sync,
    AR: AlarmRepository + Send + Sync,
    CP: CommandPublisher + Send + Sync,
    EP: EventPublisher + Send + Sync,
{
    /// Create a pipeline sharing `machine` with the administrative surface.
    pub fn new(
        nodes: NR,
        machine: Arc<ZoneAlarmStateMachine<ZR, NR, AR, CP, EP>>,
        events: EP,
    ) -> Self {
        Self {
            registry: DeviceRegistry::new(nodes),
            machine,
            events,
        }
    }

    async fn discover(&self, event: DiscoveryEvent) -> Result<IngestOutcome, FlameWatchError> {
        let (mut node, created) = self.registry.touch(&event.address, None).await?;
        if node.zone_id.is_some() && node.status != NodeStatus::Active {
            node = self.machine.reactivate_node(node.id).await?;
        }
        if created {
            tracing::info!(address = %node.address, node_id = %node.id, "new device discovered");
        } else {
            tracing::debug!(address = %node.address, "device online");
        }

        let published = self
            .events
            .publish(Event::new(EventKind::NodeDiscovered {
                node_id: node.id,
                address: node.address.clone(),
                new: created,
            }))
            .await;
        if let Err(err) = published {
            tracing::warn!(%err, "failed to publish event");
        }

        Ok(IngestOutcome::Discovered {
            node_id: node.id,
            created,
        })
    }

    async fn ingest(&self, event: SensorEvent) -> Result<IngestOutcome, FlameWatchError> {
        let (node, _) = self
            .registry
            .touch(&event.address, Some(event.reading))
            .await?;

        let zone_id = match node.zone_id {
            Some(zone_id) if node.is_armed() => zone_id,
            _ => {
                tracing::trace!(address = %node.address, status = %node.status, "node not armed, reading stored only");
                return Ok(IngestOutcome::Recorded {
                    node_id: node.id,
                    raised: None,
                });
            }
        };

        let outcome = self.machine.evaluate(zone_id, &node.readings).await?;
        Ok(IngestOutcome::Recorded {
            node_id: node.id,
            raised: outcome.opened().map(|alarm| alarm.cause),
        })
    }
}

impl<ZR, NR, AR, CP, EP> TelemetryHandler for TelemetryPipeline<ZR, NR, AR, CP, EP>
where
    ZR: ZoneRepository + Send + Sync,
    NR: NodeRepository + Send + Sync,
    AR: AlarmRepository + Send + Sync,
    CP: CommandPublisher + Send + Sync,
    EP: EventPublisher + Send + Sync,
{
    async fn handle(&self, topic: &str, payload: &[u8]) -> IngestOutcome {
        let result = match telemetry::route(topic, payload) {
            RoutedMessage::Ignored => {
                tracing::debug!(%topic, "message ignored");
                return IngestOutcome::Ignored;
            }
            RoutedMessage::Rejected(reason) => {
                tracing::warn!(%topic, %reason, "message rejected");
                return IngestOutcome::Rejected(reason);
            }
            RoutedMessage::Discovery(event) => self.discover(event).await,
            RoutedMessage::Sensor(event) => self.ingest(event).await,
        };

        result.unwrap_or_else(|err| {
            match &err {
                FlameWatchError::InvariantViolation(_) => {
                    tracing::error!(%topic, %err, "message dropped on invariant violation");
                }
                _ => tracing::warn!(%topic, %err, "message dropped"),
            }
            IngestOutcome::Failed
        })
    }
}
