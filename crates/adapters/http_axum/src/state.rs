//! Shared application state for axum handlers.

use std::sync::Arc;

use flamewatch_app::alarm_state_machine::ZoneAlarmStateMachine;
use flamewatch_app::event_bus::InProcessEventBus;
use flamewatch_app::services::node_service::NodeService;
use flamewatch_app::services::zone_service::ZoneService;

/// The state machine as wired behind the HTTP surface: events go to the
/// in-process bus that also feeds the SSE stream.
pub type Machine<ZR, NR, AR, CP> = ZoneAlarmStateMachine<ZR, NR, AR, CP, Arc<InProcessEventBus>>;

/// Application state shared across all axum handlers.
///
/// Generic over the repository types and the command publisher to avoid
/// dynamic dispatch. `Clone` is implemented manually so the underlying types
/// themselves do not need to be `Clone` — only the `Arc` wrappers are cloned.
pub struct AppState<ZR, NR, AR, CP> {
    /// Zone reads, creation and alarm history.
    pub zone_service: Arc<ZoneService<ZR, AR>>,
    /// Node reads and registration.
    pub node_service: Arc<NodeService<NR>>,
    /// Every zone status change and membership change goes through here.
    pub machine: Arc<Machine<ZR, NR, AR, CP>>,
    /// Event bus for the SSE stream.
    pub event_bus: Arc<InProcessEventBus>,
}

impl<ZR, NR, AR, CP> Clone for AppState<ZR, NR, AR, CP> {
    fn clone(&self) -> Self {
        Self {
            zone_service: Arc::clone(&self.zone_service),
            node_service: Arc::clone(&self.node_service),
            machine: Arc::clone(&self.machine),
            event_bus: Arc::clone(&self.event_bus),
        }
    }
}

impl<ZR, NR, AR, CP> AppState<ZR, NR, AR, CP> {
    /// Create a new application state.
    ///
    /// The state machine is shared with the telemetry pipeline, so it is
    /// passed in already wrapped.
    pub fn new(
        zone_service: ZoneService<ZR, AR>,
        node_service: NodeService<NR>,
        machine: Arc<Machine<ZR, NR, AR, CP>>,
        event_bus: Arc<InProcessEventBus>,
    ) -> Self {
        Self {
            zone_service: Arc::new(zone_service),
            node_service: Arc::new(node_service),
            machine,
            event_bus,
        }
    }
}
