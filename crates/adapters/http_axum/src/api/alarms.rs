//! JSON REST handler for alarm queries.

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use flamewatch_app::ports::{AlarmRepository, CommandPublisher, NodeRepository, ZoneRepository};
use flamewatch_domain::alarm::{Alarm, AlarmFilter};

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for listing alarms.
#[derive(Debug, Default, Deserialize)]
pub struct AlarmQuery {
    /// Restrict to one zone. An empty value means every zone.
    pub zone_id: Option<String>,
    /// Only alarms still open.
    #[serde(default)]
    pub open: bool,
}

impl AlarmQuery {
    fn into_filter(self) -> Result<AlarmFilter, ApiError> {
        let zone_id = self
            .zone_id
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .map(parse_id)
            .transpose()?;
        Ok(AlarmFilter {
            zone_id,
            open_only: self.open,
        })
    }
}

/// `GET /api/alarms?zone_id=&open=` — newest first.
pub async fn list<ZR, NR, AR, CP>(
    State(state): State<AppState<ZR, NR, AR, CP>>,
    Query(query): Query<AlarmQuery>,
) -> Result<Json<Vec<Alarm>>, ApiError>
where
    ZR: ZoneRepository + Send + Sync + 'static,
    NR: NodeRepository + Send + Sync + 'static,
    AR: AlarmRepository + Send + Sync + 'static,
    CP: CommandPublisher + Send + Sync + 'static,
{
    let alarms = state.zone_service.list_alarms(query.into_filter()?).await?;
    Ok(Json(alarms))
}
