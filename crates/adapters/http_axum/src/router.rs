//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use flamewatch_app::ports::{AlarmRepository, CommandPublisher, NodeRepository, ZoneRepository};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests API routes under `/api` and serves a liveness probe at `/health`.
/// Includes a [`TraceLayer`] that logs each HTTP request/response at the
/// `DEBUG` level using the `tracing` ecosystem.
pub fn build<ZR, NR, AR, CP>(state: AppState<ZR, NR, AR, CP>) -> Router
where
    ZR: ZoneRepository + Send + Sync + 'static,
    NR: NodeRepository + Send + Sync + 'static,
    AR: AlarmRepository + Send + Sync + 'static,
    CP: CommandPublisher + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
