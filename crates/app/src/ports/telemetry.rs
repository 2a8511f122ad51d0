//! Telemetry port — the inbound side of the transport.
//!
//! Transport adapters hand every received message to a [`TelemetryHandler`]
//! and never look at the result beyond logging it.

use std::future::Future;

use flamewatch_domain::alarm::TriggerCause;
use flamewatch_domain::id::NodeId;
use flamewatch_domain::telemetry::RejectReason;

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Well-formed but not for us.
    Ignored,
    /// Malformed topic or payload. Dropped.
    Rejected(RejectReason),
    /// A discovery announcement was recorded.
    Discovered { node_id: NodeId, created: bool },
    /// A sensor reading was stored. `raised` is set when it opened an alarm.
    Recorded {
        node_id: NodeId,
        raised: Option<TriggerCause>,
    },
    /// Handling failed (store or invariant). Dropped; the next reading retries.
    Failed,
}

/// Handles one inbound transport message. Never fails.
pub trait TelemetryHandler {
    fn handle(&self, topic: &str, payload: &[u8]) -> impl Future<Output = IngestOutcome> + Send;
}

impl<T: TelemetryHandler + Send + Sync> TelemetryHandler for std::sync::Arc<T> {
    fn handle(&self, topic: &str, payload: &[u8]) -> impl Future<Output = IngestOutcome> + Send {
        (**self).handle(topic, payload)
    }
}
