//! Zone service — administrative reads and zone creation.
//!
//! Status changes never go through here; see
//! [`ZoneAlarmStateMachine`](crate::alarm_state_machine::ZoneAlarmStateMachine).

use flamewatch_domain::alarm::{Alarm, AlarmFilter};
use flamewatch_domain::error::{FlameWatchError, NotFoundError};
use flamewatch_domain::id::ZoneId;
use flamewatch_domain::zone::{Thresholds, Zone};

use crate::ports::{AlarmRepository, ZoneRepository};

/// Input for a new zone. Missing thresholds fall back to the service defaults.
#[derive(Debug, Clone, Default)]
pub struct NewZone {
    pub name: String,
    pub description: Option<String>,
    pub temp_threshold: Option<f64>,
    pub smoke_threshold: Option<f64>,
}

/// Application service for zone CRUD and alarm history.
pub struct ZoneService<ZR, AR> {
    zones: ZR,
    alarms: AR,
    defaults: Thresholds,
}

impl<ZR: ZoneRepository, AR: AlarmRepository> ZoneService<ZR, AR> {
    /// Create a new service. `defaults` apply to zones created without thresholds.
    pub fn new(zones: ZR, alarms: AR, defaults: Thresholds) -> Self {
        Self {
            zones,
            alarms,
            defaults,
        }
    }

    /// Create an `Active` zone.
    ///
    /// # Errors
    ///
    /// Returns [`FlameWatchError::Validation`] for an empty name or a
    /// non-finite threshold, or a storage error.
    #[tracing::instrument(skip(self, new), fields(zone_name = %new.name))]
    pub async fn create_zone(&self, new: NewZone) -> Result<Zone, FlameWatchError> {
        let thresholds = Thresholds {
            temperature: new.temp_threshold.unwrap_or(self.defaults.temperature),
            smoke: new.smoke_threshold.unwrap_or(self.defaults.smoke),
        };
        let zone = Zone::builder()
            .name(new.name)
            .description(new.description.unwrap_or_default())
            .thresholds(thresholds)
            .build()?;
        let zone = self.zones.create(zone).await?;
        tracing::info!(zone_id = %zone.id, "zone created");
        Ok(zone)
    }

    /// Look up a zone by id.
    ///
    /// # Errors
    ///
    /// Returns [`FlameWatchError::NotFound`] when no zone with `id` exists,
    /// or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn get_zone(&self, id: ZoneId) -> Result<Zone, FlameWatchError> {
        self.zones.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Zone",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// List all zones.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_zones(&self) -> Result<Vec<Zone>, FlameWatchError> {
        self.zones.get_all().await
    }

    /// Query alarms, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_alarms(&self, filter: AlarmFilter) -> Result<Vec<Alarm>, FlameWatchError> {
        self.alarms.find(filter).await
    }

    /// Alarm history of one existing zone, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`FlameWatchError::NotFound`] for an unknown zone, or a storage error.
    pub async fn zone_alarms(&self, id: ZoneId) -> Result<Vec<Alarm>, FlameWatchError> {
        self.get_zone(id).await?;
        self.alarms
            .find(AlarmFilter {
                zone_id: Some(id),
                open_only: false,
            })
            .await
    }
}
