//! JSON REST handlers for nodes and zone membership.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use flamewatch_app::ports::{AlarmRepository, CommandPublisher, NodeRepository, ZoneRepository};
use flamewatch_domain::id::{NodeId, ZoneId};
use flamewatch_domain::node::Node;

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for registering a node ahead of its first report.
#[derive(Deserialize)]
pub struct CreateNodeRequest {
    pub mac_address: String,
    pub zone_id: Option<String>,
}

/// Possible responses from the create endpoint.
pub enum CreateResponse {
    Created(Json<Node>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// `GET /api/nodes`
pub async fn list<ZR, NR, AR, CP>(
    State(state): State<AppState<ZR, NR, AR, CP>>,
) -> Result<Json<Vec<Node>>, ApiError>
where
    ZR: ZoneRepository + Send + Sync + 'static,
    NR: NodeRepository + Send + Sync + 'static,
    AR: AlarmRepository + Send + Sync + 'static,
    CP: CommandPublisher + Send + Sync + 'static,
{
    let nodes = state.node_service.list_nodes().await?;
    Ok(Json(nodes))
}

/// `GET /api/nodes/{id}`
pub async fn get<ZR, NR, AR, CP>(
    State(state): State<AppState<ZR, NR, AR, CP>>,
    Path(id): Path<String>,
) -> Result<Json<Node>, ApiError>
where
    ZR: ZoneRepository + Send + Sync + 'static,
    NR: NodeRepository + Send + Sync + 'static,
    AR: AlarmRepository + Send + Sync + 'static,
    CP: CommandPublisher + Send + Sync + 'static,
{
    let node_id: NodeId = parse_id(&id)?;
    let node = state.node_service.get_node(node_id).await?;
    Ok(Json(node))
}

/// `POST /api/nodes`
///
/// The zone, when given, must exist before anything is written, so a bad
/// zone id never leaves an orphan node behind.
pub async fn create<ZR, NR, AR, CP>(
    State(state): State<AppState<ZR, NR, AR, CP>>,
    Json(req): Json<CreateNodeRequest>,
) -> Result<CreateResponse, ApiError>
where
    ZR: ZoneRepository + Send + Sync + 'static,
    NR: NodeRepository + Send + Sync + 'static,
    AR: AlarmRepository + Send + Sync + 'static,
    CP: CommandPublisher + Send + Sync + 'static,
{
    let zone_id: Option<ZoneId> = req.zone_id.as_deref().map(parse_id).transpose()?;
    if let Some(zone_id) = zone_id {
        state.zone_service.get_zone(zone_id).await?;
    }

    let node = state.node_service.create_node(&req.mac_address).await?;
    let node = match zone_id {
        Some(zone_id) => state.machine.assign_node(node.id, zone_id).await?,
        None => node,
    };
    Ok(CreateResponse::Created(Json(node)))
}

/// `PUT /api/nodes/{id}/assign/{zone_id}`
pub async fn assign<ZR, NR, AR, CP>(
    State(state): State<AppState<ZR, NR, AR, CP>>,
    Path((id, zone_id)): Path<(String, String)>,
) -> Result<Json<Node>, ApiError>
where
    ZR: ZoneRepository + Send + Sync + 'static,
    NR: NodeRepository + Send + Sync + 'static,
    AR: AlarmRepository + Send + Sync + 'static,
    CP: CommandPublisher + Send + Sync + 'static,
{
    let node_id: NodeId = parse_id(&id)?;
    let zone_id: ZoneId = parse_id(&zone_id)?;
    let node = state.machine.assign_node(node_id, zone_id).await?;
    Ok(Json(node))
}

/// `PUT /api/nodes/{id}/detach`
pub async fn detach<ZR, NR, AR, CP>(
    State(state): State<AppState<ZR, NR, AR, CP>>,
    Path(id): Path<String>,
) -> Result<Json<Node>, ApiError>
where
    ZR: ZoneRepository + Send + Sync + 'static,
    NR: NodeRepository + Send + Sync + 'static,
    AR: AlarmRepository + Send + Sync + 'static,
    CP: CommandPublisher + Send + Sync + 'static,
{
    let node_id: NodeId = parse_id(&id)?;
    let node = state.machine.detach_node(node_id).await?;
    Ok(Json(node))
}
