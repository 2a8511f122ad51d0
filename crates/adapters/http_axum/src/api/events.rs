//! Server-Sent Events (SSE) stream of domain events.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use flamewatch_app::ports::{AlarmRepository, CommandPublisher, NodeRepository, ZoneRepository};

use crate::state::AppState;

/// `GET /api/events/stream` — SSE stream of real-time domain events.
///
/// Each domain event becomes one `data:` frame holding its JSON encoding,
/// with the event type as the SSE event name. The stream continues until the
/// client disconnects.
pub async fn stream<ZR, NR, AR, CP>(
    State(state): State<AppState<ZR, NR, AR, CP>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>>
where
    ZR: ZoneRepository + Send + Sync + 'static,
    NR: NodeRepository + Send + Sync + 'static,
    AR: AlarmRepository + Send + Sync + 'static,
    CP: CommandPublisher + Send + Sync + 'static,
{
    let event_rx = state.event_bus.subscribe();
    let event_stream = BroadcastStream::new(event_rx).filter_map(|result| match result {
        Ok(event) => match serde_json::to_value(&event) {
            Ok(json) => {
                let mut frame = Event::default().data(json.to_string());
                if let Some(kind) = json.get("type").and_then(|kind| kind.as_str()) {
                    frame = frame.event(kind);
                }
                Some(Ok(frame))
            }
            Err(err) => {
                tracing::warn!(%err, "failed to serialize event to JSON for SSE stream");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(n)) => {
            tracing::warn!(
                skipped = n,
                "SSE subscriber lagged, some events were dropped"
            );
            None
        }
    });

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}
