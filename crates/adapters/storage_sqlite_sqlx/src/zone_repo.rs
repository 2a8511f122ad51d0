//! `SQLite` implementation of [`ZoneRepository`].

use std::future::Future;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use flamewatch_app::ports::ZoneRepository;
use flamewatch_domain::error::{FlameWatchError, NotFoundError};
use flamewatch_domain::id::ZoneId;
use flamewatch_domain::zone::{Thresholds, Zone};

use crate::codec::{decode, decode_ts, encode_ts};
use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`Zone`].
struct Wrapper(Zone);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Zone> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        let description: String = row.try_get("description")?;
        let temperature: f64 = row.try_get("temp_threshold")?;
        let smoke: f64 = row.try_get("smoke_threshold")?;
        let status: String = row.try_get("status")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(Self(Zone {
            id: decode(&id)?,
            name,
            description,
            thresholds: Thresholds { temperature, smoke },
            status: decode(&status)?,
            created_at: decode_ts(&created_at)?,
            updated_at: decode_ts(&updated_at)?,
        }))
    }
}

const INSERT: &str = "INSERT INTO zones (id, name, description, temp_threshold, smoke_threshold, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)";
const SELECT_BY_ID: &str = "SELECT * FROM zones WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM zones ORDER BY created_at";
const UPDATE: &str = "UPDATE zones SET name = ?, description = ?, temp_threshold = ?, smoke_threshold = ?, status = ?, updated_at = ? WHERE id = ?";
const DELETE_BY_ID: &str = "DELETE FROM zones WHERE id = ?";

fn not_found(id: ZoneId) -> FlameWatchError {
    NotFoundError {
        entity: "Zone",
        id: id.to_string(),
    }
    .into()
}

/// `SQLite`-backed zone repository.
pub struct SqliteZoneRepository {
    pool: SqlitePool,
}

impl SqliteZoneRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ZoneRepository for SqliteZoneRepository {
    fn create(&self, zone: Zone) -> impl Future<Output = Result<Zone, FlameWatchError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(INSERT)
                .bind(zone.id.to_string())
                .bind(&zone.name)
                .bind(&zone.description)
                .bind(zone.thresholds.temperature)
                .bind(zone.thresholds.smoke)
                .bind(zone.status.to_string())
                .bind(encode_ts(&zone.created_at))
                .bind(encode_ts(&zone.updated_at))
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(zone)
        }
    }

    fn get_by_id(
        &self,
        id: ZoneId,
    ) -> impl Future<Output = Result<Option<Zone>, FlameWatchError>> + Send {
        let pool = self.pool.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
                .bind(id.to_string())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Zone>, FlameWatchError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn update(&self, zone: Zone) -> impl Future<Output = Result<Zone, FlameWatchError>> + Send {
        let pool = self.pool.clone();
        async move {
            let result = sqlx::query(UPDATE)
                .bind(&zone.name)
                .bind(&zone.description)
                .bind(zone.thresholds.temperature)
                .bind(zone.thresholds.smoke)
                .bind(zone.status.to_string())
                .bind(encode_ts(&zone.updated_at))
                .bind(zone.id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            if result.rows_affected() == 0 {
                return Err(not_found(zone.id));
            }
            Ok(zone)
        }
    }

    fn delete(&self, id: ZoneId) -> impl Future<Output = Result<(), FlameWatchError>> + Send {
        let pool = self.pool.clone();
        async move {
            let result = sqlx::query(DELETE_BY_ID)
                .bind(id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            if result.rows_affected() == 0 {
                return Err(not_found(id));
            }
            Ok(())
        }
    }
}
