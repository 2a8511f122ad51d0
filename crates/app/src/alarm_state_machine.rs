//! Zone alarm state machine.
//!
//! The only component allowed to change a zone's status. Every operation on
//! a zone runs inside that zone's lock, held across the read of the zone, the
//! status write and any alarm row change. Operations on different zones run
//! concurrently.
//!
//! ```text
//!            sensor cause / manual trigger
//!   Active ───────────────────────────────▶ Alarm(cause)
//!     ▲                                         │  same cause: no-op
//!     │            administrative resolve       │  other cause: manual only
//!     └─────────────────────────────────────────┘
//!
//!   Active ◀──── node assigned ──── Inactive
//!   Active ──── last node left ───▶ Inactive
//! ```
//!
//! Readings falling back below thresholds never resolve a zone.

use std::fmt;

use flamewatch_domain::alarm::{Alarm, AlarmFilter, TriggerCause};
use flamewatch_domain::command::NodeCommand;
use flamewatch_domain::error::{FlameWatchError, InvariantViolation, NotFoundError, ValidationError};
use flamewatch_domain::event::{Event, EventKind};
use flamewatch_domain::id::{NodeId, ZoneId};
use flamewatch_domain::node::{Node, NodeStatus, Readings};
use flamewatch_domain::threshold;
use flamewatch_domain::time::now;
use flamewatch_domain::zone::{Zone, ZoneStatus};

use crate::keyed_lock::KeyedLocks;
use crate::ports::{AlarmRepository, CommandPublisher, EventPublisher, NodeRepository, ZoneRepository};
use crate::services::command_dispatcher::CommandDispatcher;

/// Who asked for an alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Threshold evaluation of a sensor reading.
    Sensor,
    /// An operator through the administrative surface.
    Manual,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor => f.write_str("sensor"),
            Self::Manual => f.write_str("manual"),
        }
    }
}

/// Result of asking a zone to alarm.
#[derive(Debug, Clone, PartialEq)]
pub enum RaiseOutcome {
    /// The zone left `Active` and a new alarm opened.
    Opened(Alarm),
    /// A manual trigger replaced the open alarm of another cause.
    Overridden { closed: Vec<Alarm>, opened: Alarm },
    /// Already alarming for this cause.
    AlreadyAlarming,
    /// Alarming for another cause; sensors do not override it.
    Suppressed { current: TriggerCause },
    /// Nothing to do: readings below thresholds or zone inactive.
    NoChange,
}

impl RaiseOutcome {
    /// The alarm opened by this call, if any.
    #[must_use]
    pub fn opened(&self) -> Option<&Alarm> {
        match self {
            Self::Opened(alarm) | Self::Overridden { opened: alarm, .. } => Some(alarm),
            Self::AlreadyAlarming | Self::Suppressed { .. } | Self::NoChange => None,
        }
    }
}

/// Result of an administrative resolve.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub zone: Zone,
    pub previous: ZoneStatus,
    pub closed: Vec<Alarm>,
}

/// Serialized owner of zone status and alarm lifecycle.
pub struct ZoneAlarmStateMachine<ZR, NR, AR, CP, EP> {
    zones: ZR,
    nodes: NR,
    alarms: AR,
    dispatcher: CommandDispatcher<CP>,
    events: EP,
    locks: KeyedLocks<ZoneId>,
}

impl<ZR, NR, AR, CP, EP> ZoneAlarmStateMachine<ZR, NR, AR, CP, EP>
where
    ZR: ZoneRepository + Send + Sync,
    NR: NodeRepository + Send + Sync,
    AR: AlarmRepository + Send + Sync,
    CP: CommandPublisher + Send + Sync,
    EP: EventPublisher + Send + Sync,
{
    pub fn new(zones: ZR, nodes: NR, alarms: AR, publisher: CP, events: EP) -> Self {
        Self {
            zones,
            nodes,
            alarms,
            dispatcher: CommandDispatcher::new(publisher),
            events,
            locks: KeyedLocks::new(),
        }
    }

    /// Evaluate a node's accumulated readings against its zone.
    ///
    /// Thresholds are read under the zone lock, so a concurrent resolve or
    /// trigger is always observed.
    ///
    /// # Errors
    ///
    /// Returns [`FlameWatchError::NotFound`] if the zone is gone,
    /// [`FlameWatchError::InvariantViolation`] if the zone's alarm rows are
    /// inconsistent, or a storage error.
    pub async fn evaluate(
        &self,
        zone_id: ZoneId,
        readings: &Readings,
    ) -> Result<RaiseOutcome, FlameWatchError> {
        let _guard = self.locks.lock(zone_id).await;
        let zone = self.load_zone(zone_id).await?;
        if !zone.status.is_active() && zone.status.alarm_cause().is_none() {
            return Ok(RaiseOutcome::NoChange);
        }
        match threshold::evaluate(readings, &zone.thresholds) {
            Some(cause) => self.raise_locked(zone, cause, Origin::Sensor).await,
            None => Ok(RaiseOutcome::NoChange),
        }
    }

    /// Manually put a zone into the `Manual` alarm state.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTransition`] for an inactive zone,
    /// [`FlameWatchError::NotFound`] for an unknown zone, an invariant
    /// violation, or a storage error.
    #[tracing::instrument(skip(self), fields(zone_id = %zone_id))]
    pub async fn trigger(&self, zone_id: ZoneId) -> Result<RaiseOutcome, FlameWatchError> {
        let _guard = self.locks.lock(zone_id).await;
        let zone = self.load_zone(zone_id).await?;
        self.raise_locked(zone, TriggerCause::Manual, Origin::Manual)
            .await
    }

    /// Close every open alarm of a zone and return it to `Active`.
    ///
    /// An inactive zone keeps its status. `stop_alarm` is broadcast to the
    /// members whenever the zone was alarming or an alarm was closed.
    ///
    /// # Errors
    ///
    /// Returns [`FlameWatchError::NotFound`] for an unknown zone or a storage error.
    #[tracing::instrument(skip(self), fields(zone_id = %zone_id))]
    pub async fn resolve(&self, zone_id: ZoneId) -> Result<Resolution, FlameWatchError> {
        let _guard = self.locks.lock(zone_id).await;
        let mut zone = self.load_zone(zone_id).await?;
        let previous = zone.status;

        let open = self.open_alarms(zone_id).await?;
        if open.len() > 1 {
            tracing::error!(%zone_id, count = open.len(), "multiple open alarms found, closing all");
        }
        let closed = self.close_all(open).await?;

        if previous.alarm_cause().is_some() {
            zone.set_status(ZoneStatus::Active, now());
            zone = self.zones.update(zone).await?;
            self.publish(EventKind::ZoneStatusChanged {
                zone_id,
                from: previous,
                to: zone.status,
            })
            .await;
        }

        if previous.alarm_cause().is_some() || !closed.is_empty() {
            let members = self.nodes.find_by_zone(zone_id).await?;
            self.dispatcher
                .broadcast(&members, NodeCommand::StopAlarm)
                .await;
            self.publish(EventKind::AlarmResolved {
                zone_id,
                closed: closed.len(),
            })
            .await;
            tracing::info!(%zone_id, %previous, closed = closed.len(), "zone resolved");
        }

        Ok(Resolution {
            zone,
            previous,
            closed,
        })
    }

    /// Assign a node to a zone.
    ///
    /// The node becomes `Active`. An inactive zone becomes `Active`. A node
    /// joining an alarming zone is actuated immediately. A node moving from
    /// another zone is detached from it first.
    ///
    /// # Errors
    ///
    /// Returns [`FlameWatchError::NotFound`] when the node or zone does not
    /// exist, or a storage error.
    #[tracing::instrument(skip(self), fields(node_id = %node_id, zone_id = %zone_id))]
    pub async fn assign_node(&self, node_id: NodeId, zone_id: ZoneId) -> Result<Node, FlameWatchError> {
        self.load_zone(zone_id).await?;
        let current = self.load_node(node_id).await?;
        if current.zone_id.is_some_and(|other| other != zone_id) {
            self.detach_node(node_id).await?;
        }

        let _guard = self.locks.lock(zone_id).await;
        let zone = self.load_zone(zone_id).await?;
        let mut node = self.load_node(node_id).await?;

        node.assign(zone_id, now());
        let node = self.nodes.update(node).await?;
        self.publish(EventKind::NodeAssigned { node_id, zone_id })
            .await;
        self.joined_locked(zone, &node).await?;

        Ok(node)
    }

    /// Bring an assigned node that came back online to `Active`.
    ///
    /// Behaves like a fresh assignment to the node's current zone: an
    /// `Inactive` zone becomes `Active` and an alarming zone actuates the
    /// node. A node detached in the meantime is returned as stored.
    ///
    /// # Errors
    ///
    /// Returns [`FlameWatchError::NotFound`] when the node does not exist, or
    /// a storage error.
    #[tracing::instrument(skip(self), fields(node_id = %node_id))]
    pub async fn reactivate_node(&self, node_id: NodeId) -> Result<Node, FlameWatchError> {
        loop {
            let node = self.load_node(node_id).await?;
            let Some(zone_id) = node.zone_id else {
                return Ok(node);
            };
            if node.status == NodeStatus::Active {
                return Ok(node);
            }

            let _guard = self.locks.lock(zone_id).await;
            let mut node = self.load_node(node_id).await?;
            if node.zone_id != Some(zone_id) {
                // Moved while we waited for the lock.
                continue;
            }
            if node.status == NodeStatus::Active {
                return Ok(node);
            }

            let zone = self.load_zone(zone_id).await?;
            node.assign(zone_id, now());
            let node = self.nodes.update(node).await?;
            tracing::info!(%zone_id, "assigned node back online");
            self.joined_locked(zone, &node).await?;
            return Ok(node);
        }
    }

    /// Detach a node from its zone. The node becomes `Inactive`.
    ///
    /// When no active member remains in an `Active` zone, the zone becomes
    /// `Inactive`. A node leaving an alarming zone is told to stop.
    ///
    /// # Errors
    ///
    /// Returns [`FlameWatchError::NotFound`] when the node does not exist, or
    /// a storage error.
    #[tracing::instrument(skip(self), fields(node_id = %node_id))]
    pub async fn detach_node(&self, node_id: NodeId) -> Result<Node, FlameWatchError> {
        loop {
            let node = self.load_node(node_id).await?;
            let Some(zone_id) = node.zone_id else {
                let mut node = node;
                node.detach(now());
                return self.nodes.update(node).await;
            };

            let _guard = self.locks.lock(zone_id).await;
            let mut node = self.load_node(node_id).await?;
            if node.zone_id != Some(zone_id) {
                // Moved while we waited for the lock.
                continue;
            }

            node.detach(now());
            let node = self.nodes.update(node).await?;
            self.publish(EventKind::NodeDetached { node_id, zone_id })
                .await;

            if let Some(mut zone) = self.zones.get_by_id(zone_id).await? {
                if zone.status.alarm_cause().is_some() {
                    self.dispatcher
                        .send(&node.address, NodeCommand::StopAlarm)
                        .await;
                } else if zone.status.is_active() && !self.has_active_member(zone_id).await? {
                    let previous = zone.set_status(ZoneStatus::Inactive, now());
                    let zone = self.zones.update(zone).await?;
                    self.publish(EventKind::ZoneStatusChanged {
                        zone_id,
                        from: previous,
                        to: zone.status,
                    })
                    .await;
                    tracing::info!(%zone_id, "zone deactivated, no active node left");
                }
            }
            return Ok(node);
        }
    }

    /// Delete a zone.
    ///
    /// Open alarms are closed and kept as history, alarming members are told
    /// to stop, and every member is detached before the zone record goes away.
    ///
    /// # Errors
    ///
    /// Returns [`FlameWatchError::NotFound`] for an unknown zone or a storage error.
    #[tracing::instrument(skip(self), fields(zone_id = %zone_id))]
    pub async fn delete_zone(&self, zone_id: ZoneId) -> Result<(), FlameWatchError> {
        let _guard = self.locks.lock(zone_id).await;
        let zone = self.load_zone(zone_id).await?;

        let closed = self.close_all(self.open_alarms(zone_id).await?).await?;
        let members = self.nodes.find_by_zone(zone_id).await?;
        if zone.status.alarm_cause().is_some() || !closed.is_empty() {
            self.dispatcher
                .broadcast(&members, NodeCommand::StopAlarm)
                .await;
        }

        for mut node in members {
            let node_id = node.id;
            node.detach(now());
            self.nodes.update(node).await?;
            self.publish(EventKind::NodeDetached { node_id, zone_id })
                .await;
        }

        self.zones.delete(zone_id).await?;
        self.publish(EventKind::ZoneDeleted { zone_id }).await;
        tracing::info!(%zone_id, closed = closed.len(), "zone deleted");
        Ok(())
    }

    /// Apply `cause` to `zone`. Caller holds the zone lock.
    async fn raise_locked(
        &self,
        mut zone: Zone,
        cause: TriggerCause,
        origin: Origin,
    ) -> Result<RaiseOutcome, FlameWatchError> {
        let zone_id = zone.id;
        let open = self.open_alarms(zone_id).await?;
        check_invariants(&zone, &open)?;

        let closed = match zone.status {
            ZoneStatus::Inactive => {
                if origin == Origin::Manual {
                    return Err(ValidationError::InvalidTransition {
                        from: zone.status,
                        to: ZoneStatus::Alarm(cause),
                    }
                    .into());
                }
                return Ok(RaiseOutcome::NoChange);
            }
            ZoneStatus::Alarm(current) if current == cause => {
                tracing::debug!(%zone_id, %cause, "already alarming, ignoring");
                return Ok(RaiseOutcome::AlreadyAlarming);
            }
            ZoneStatus::Alarm(current) if origin == Origin::Sensor => {
                tracing::debug!(%zone_id, %current, %cause, "alarming for another cause, suppressed");
                return Ok(RaiseOutcome::Suppressed { current });
            }
            ZoneStatus::Alarm(_) => Some(self.close_all(open).await?),
            ZoneStatus::Active => None,
        };

        let at = now();
        let previous = zone.set_status(ZoneStatus::Alarm(cause), at);
        let zone = self.zones.update(zone).await?;

        let alarm = match self.alarms.create(Alarm::open(zone_id, cause, at)).await {
            Ok(alarm) => alarm,
            Err(err) => {
                self.restore_status(zone, previous).await;
                return Err(err);
            }
        };

        let members = self.nodes.find_by_zone(zone_id).await?;
        let actuated = self
            .dispatcher
            .broadcast(&members, NodeCommand::ActuateAlarm)
            .await;
        tracing::warn!(
            %zone_id,
            %cause,
            %origin,
            alarm_id = %alarm.id,
            members = members.len(),
            actuated,
            "zone alarm raised"
        );

        self.publish(EventKind::ZoneStatusChanged {
            zone_id,
            from: previous,
            to: zone.status,
        })
        .await;
        self.publish(EventKind::AlarmRaised {
            zone_id,
            alarm_id: alarm.id,
            cause,
        })
        .await;

        Ok(match closed {
            Some(closed) => RaiseOutcome::Overridden {
                closed,
                opened: alarm,
            },
            None => RaiseOutcome::Opened(alarm),
        })
    }

    async fn restore_status(&self, mut zone: Zone, previous: ZoneStatus) {
        let zone_id = zone.id;
        zone.set_status(previous, now());
        if let Err(err) = self.zones.update(zone).await {
            tracing::error!(%zone_id, %err, "failed to restore zone status after alarm write failure");
        }
    }

    async fn close_all(&self, open: Vec<Alarm>) -> Result<Vec<Alarm>, FlameWatchError> {
        let at = now();
        let mut closed = Vec::with_capacity(open.len());
        for mut alarm in open {
            if alarm.close(at) {
                closed.push(self.alarms.update(alarm).await?);
            }
        }
        Ok(closed)
    }

    async fn open_alarms(&self, zone_id: ZoneId) -> Result<Vec<Alarm>, FlameWatchError> {
        self.alarms.find(AlarmFilter::open_in(zone_id)).await
    }

    /// Zone side of a node becoming an active member. Caller holds the zone lock.
    async fn joined_locked(&self, mut zone: Zone, node: &Node) -> Result<(), FlameWatchError> {
        let zone_id = zone.id;
        match zone.status {
            ZoneStatus::Inactive => {
                let previous = zone.set_status(ZoneStatus::Active, now());
                zone = self.zones.update(zone).await?;
                self.publish(EventKind::ZoneStatusChanged {
                    zone_id,
                    from: previous,
                    to: zone.status,
                })
                .await;
                tracing::info!(%zone_id, "zone activated by node assignment");
            }
            ZoneStatus::Alarm(cause) => {
                tracing::info!(%zone_id, %cause, "node joined alarming zone, actuating");
                self.dispatcher
                    .send(&node.address, NodeCommand::ActuateAlarm)
                    .await;
            }
            ZoneStatus::Active => {}
        }
        Ok(())
    }

    async fn has_active_member(&self, zone_id: ZoneId) -> Result<bool, FlameWatchError> {
        Ok(self
            .nodes
            .find_by_zone(zone_id)
            .await?
            .iter()
            .any(|n| n.status == NodeStatus::Active))
    }

    async fn load_zone(&self, id: ZoneId) -> Result<Zone, FlameWatchError> {
        self.zones.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Zone",
                id: id.to_string(),
            }
            .into()
        })
    }

    async fn load_node(&self, id: NodeId) -> Result<Node, FlameWatchError> {
        self.nodes.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Node",
                id: id.to_string(),
            }
            .into()
        })
    }

    async fn publish(&self, kind: EventKind) {
        if let Err(err) = self.events.publish(Event::new(kind)).await {
            tracing::warn!(%err, "failed to publish event");
        }
    }
}

/// A zone holds at most one open alarm, and only while alarming.
fn check_invariants(zone: &Zone, open: &[Alarm]) -> Result<(), FlameWatchError> {
    let violation = if open.len() > 1 {
        Some(InvariantViolation::MultipleOpenAlarms {
            zone_id: zone.id.to_string(),
            count: open.len(),
        })
    } else if !open.is_empty() && zone.status.alarm_cause().is_none() {
        Some(InvariantViolation::OpenAlarmOnActiveZone {
            zone_id: zone.id.to_string(),
        })
    } else {
        None
    };
    match violation {
        Some(violation) => {
            tracing::error!(zone_id = %zone.id, %violation, "alarm invariant violated");
            Err(violation.into())
        }
        None => Ok(()),
    }
}
