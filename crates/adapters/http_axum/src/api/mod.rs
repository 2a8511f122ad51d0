//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod alarms;
pub mod events;
#[allow(clippy::missing_errors_doc)]
pub mod nodes;
#[allow(clippy::missing_errors_doc)]
pub mod zones;

use std::str::FromStr;

use axum::Router;
use axum::routing::{get, post, put};

use flamewatch_app::ports::{AlarmRepository, CommandPublisher, NodeRepository, ZoneRepository};
use flamewatch_domain::error::ValidationError;

use crate::error::ApiError;
use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<ZR, NR, AR, CP>() -> Router<AppState<ZR, NR, AR, CP>>
where
    ZR: ZoneRepository + Send + Sync + 'static,
    NR: NodeRepository + Send + Sync + 'static,
    AR: AlarmRepository + Send + Sync + 'static,
    CP: CommandPublisher + Send + Sync + 'static,
{
    Router::new()
        // Zones
        .route(
            "/zones",
            get(zones::list::<ZR, NR, AR, CP>).post(zones::create::<ZR, NR, AR, CP>),
        )
        .route(
            "/zones/{id}",
            get(zones::get::<ZR, NR, AR, CP>).delete(zones::delete::<ZR, NR, AR, CP>),
        )
        .route(
            "/zones/{id}/trigger",
            post(zones::trigger::<ZR, NR, AR, CP>),
        )
        .route(
            "/zones/{id}/resolve",
            post(zones::resolve::<ZR, NR, AR, CP>),
        )
        .route("/zones/{id}/alarms", get(zones::alarms::<ZR, NR, AR, CP>))
        // Nodes
        .route(
            "/nodes",
            get(nodes::list::<ZR, NR, AR, CP>).post(nodes::create::<ZR, NR, AR, CP>),
        )
        .route("/nodes/{id}", get(nodes::get::<ZR, NR, AR, CP>))
        .route(
            "/nodes/{id}/assign/{zone_id}",
            put(nodes::assign::<ZR, NR, AR, CP>),
        )
        .route("/nodes/{id}/detach", put(nodes::detach::<ZR, NR, AR, CP>))
        // Alarms
        .route("/alarms", get(alarms::list::<ZR, NR, AR, CP>))
        // Events
        .route("/events/stream", get(events::stream::<ZR, NR, AR, CP>))
}

/// Parse an identifier taken from a path or a body field.
fn parse_id<T: FromStr>(raw: &str) -> Result<T, ApiError> {
    T::from_str(raw).map_err(|_| ApiError::from(ValidationError::InvalidId(raw.to_string())))
}
