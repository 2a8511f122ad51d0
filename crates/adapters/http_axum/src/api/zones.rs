//! JSON REST handlers for zones, including manual trigger and resolve.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use flamewatch_app::alarm_state_machine::{RaiseOutcome, Resolution};
use flamewatch_app::ports::{AlarmRepository, CommandPublisher, NodeRepository, ZoneRepository};
use flamewatch_app::services::zone_service::NewZone;
use flamewatch_domain::alarm::Alarm;
use flamewatch_domain::id::ZoneId;
use flamewatch_domain::zone::{Zone, ZoneStatus};

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for creating a zone. Missing thresholds use the configured defaults.
#[derive(Deserialize)]
pub struct CreateZoneRequest {
    pub name: String,
    pub description: Option<String>,
    pub temp_threshold: Option<f64>,
    pub smoke_threshold: Option<f64>,
}

impl From<CreateZoneRequest> for NewZone {
    fn from(req: CreateZoneRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            temp_threshold: req.temp_threshold,
            smoke_threshold: req.smoke_threshold,
        }
    }
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Zone>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get endpoint.
pub enum GetResponse {
    Ok(Json<Zone>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the create endpoint.
pub enum CreateResponse {
    Created(Json<Zone>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the delete endpoint.
pub enum DeleteResponse {
    NoContent,
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// Body describing what a manual trigger did.
#[derive(Debug, Serialize)]
pub struct TriggerBody {
    pub outcome: &'static str,
    pub alarm: Option<Alarm>,
    pub closed: Vec<Alarm>,
}

/// Possible responses from the trigger endpoint.
pub enum TriggerResponse {
    /// A new alarm was opened.
    Created(Json<TriggerBody>),
    /// The zone was already alarming for a manual cause.
    Unchanged(Json<TriggerBody>),
}

impl From<RaiseOutcome> for TriggerResponse {
    fn from(outcome: RaiseOutcome) -> Self {
        let body = |outcome, alarm, closed| {
            Json(TriggerBody {
                outcome,
                alarm,
                closed,
            })
        };
        match outcome {
            RaiseOutcome::Opened(alarm) => Self::Created(body("opened", Some(alarm), Vec::new())),
            RaiseOutcome::Overridden { closed, opened } => {
                Self::Created(body("overridden", Some(opened), closed))
            }
            RaiseOutcome::AlreadyAlarming => {
                Self::Unchanged(body("already_alarming", None, Vec::new()))
            }
            RaiseOutcome::Suppressed { .. } => Self::Unchanged(body("suppressed", None, Vec::new())),
            RaiseOutcome::NoChange => Self::Unchanged(body("no_change", None, Vec::new())),
        }
    }
}

impl IntoResponse for TriggerResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
            Self::Unchanged(json) => json.into_response(),
        }
    }
}

/// Body describing what a resolve did.
#[derive(Debug, Serialize)]
pub struct ResolveBody {
    pub zone: Zone,
    pub previous: ZoneStatus,
    pub closed: Vec<Alarm>,
}

impl From<Resolution> for ResolveBody {
    fn from(resolution: Resolution) -> Self {
        Self {
            zone: resolution.zone,
            previous: resolution.previous,
            closed: resolution.closed,
        }
    }
}

/// `GET /api/zones`
pub async fn list<ZR, NR, AR, CP>(
    State(state): State<AppState<ZR, NR, AR, CP>>,
) -> Result<ListResponse, ApiError>
where
    ZR: ZoneRepository + Send + Sync + 'static,
    NR: NodeRepository + Send + Sync + 'static,
    AR: AlarmRepository + Send + Sync + 'static,
    CP: CommandPublisher + Send + Sync + 'static,
{
    let zones = state.zone_service.list_zones().await?;
    Ok(ListResponse::Ok(Json(zones)))
}

/// `GET /api/zones/{id}`
pub async fn get<ZR, NR, AR, CP>(
    State(state): State<AppState<ZR, NR, AR, CP>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    ZR: ZoneRepository + Send + Sync + 'static,
    NR: NodeRepository + Send + Sync + 'static,
    AR: AlarmRepository + Send + Sync + 'static,
    CP: CommandPublisher + Send + Sync + 'static,
{
    let zone_id: ZoneId = parse_id(&id)?;
    let zone = state.zone_service.get_zone(zone_id).await?;
    Ok(GetResponse::Ok(Json(zone)))
}

/// `POST /api/zones`
pub async fn create<ZR, NR, AR, CP>(
    State(state): State<AppState<ZR, NR, AR, CP>>,
    Json(req): Json<CreateZoneRequest>,
) -> Result<CreateResponse, ApiError>
where
    ZR: ZoneRepository + Send + Sync + 'static,
    NR: NodeRepository + Send + Sync + 'static,
    AR: AlarmRepository + Send + Sync + 'static,
    CP: CommandPublisher + Send + Sync + 'static,
{
    let zone = state.zone_service.create_zone(req.into()).await?;
    Ok(CreateResponse::Created(Json(zone)))
}

/// `DELETE /api/zones/{id}` — closes open alarms and detaches members first.
pub async fn delete<ZR, NR, AR, CP>(
    State(state): State<AppState<ZR, NR, AR, CP>>,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError>
where
    ZR: ZoneRepository + Send + Sync + 'static,
    NR: NodeRepository + Send + Sync + 'static,
    AR: AlarmRepository + Send + Sync + 'static,
    CP: CommandPublisher + Send + Sync + 'static,
{
    let zone_id: ZoneId = parse_id(&id)?;
    state.machine.delete_zone(zone_id).await?;
    Ok(DeleteResponse::NoContent)
}

/// `POST /api/zones/{id}/trigger`
pub async fn trigger<ZR, NR, AR, CP>(
    State(state): State<AppState<ZR, NR, AR, CP>>,
    Path(id): Path<String>,
) -> Result<TriggerResponse, ApiError>
where
    ZR: ZoneRepository + Send + Sync + 'static,
    NR: NodeRepository + Send + Sync + 'static,
    AR: AlarmRepository + Send + Sync + 'static,
    CP: CommandPublisher + Send + Sync + 'static,
{
    let zone_id: ZoneId = parse_id(&id)?;
    let outcome = state.machine.trigger(zone_id).await?;
    Ok(outcome.into())
}

/// `POST /api/zones/{id}/resolve`
pub async fn resolve<ZR, NR, AR, CP>(
    State(state): State<AppState<ZR, NR, AR, CP>>,
    Path(id): Path<String>,
) -> Result<Json<ResolveBody>, ApiError>
where
    ZR: ZoneRepository + Send + Sync + 'static,
    NR: NodeRepository + Send + Sync + 'static,
    AR: AlarmRepository + Send + Sync + 'static,
    CP: CommandPublisher + Send + Sync + 'static,
{
    let zone_id: ZoneId = parse_id(&id)?;
    let resolution = state.machine.resolve(zone_id).await?;
    Ok(Json(resolution.into()))
}

/// `GET /api/zones/{id}/alarms` — newest first.
pub async fn alarms<ZR, NR, AR, CP>(
    State(state): State<AppState<ZR, NR, AR, CP>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Alarm>>, ApiError>
where
    ZR: ZoneRepository + Send + Sync + 'static,
    NR: NodeRepository + Send + Sync + 'static,
    AR: AlarmRepository + Send + Sync + 'static,
    CP: CommandPublisher + Send + Sync + 'static,
{
    let zone_id: ZoneId = parse_id(&id)?;
    let alarms = state.zone_service.zone_alarms(zone_id).await?;
    Ok(Json(alarms))
}
