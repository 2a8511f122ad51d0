//! `SQLite` implementation of [`AlarmRepository`].

use std::future::Future;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use flamewatch_app::ports::AlarmRepository;
use flamewatch_domain::alarm::{Alarm, AlarmFilter};
use flamewatch_domain::error::{FlameWatchError, NotFoundError};
use flamewatch_domain::id::AlarmId;

use crate::codec::{decode, decode_ts, encode_ts};
use crate::error::StorageError;

struct Wrapper(Alarm);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let zone_id: String = row.try_get("zone_id")?;
        let cause: String = row.try_get("cause")?;
        let start_time: String = row.try_get("start_time")?;
        let end_time: Option<String> = row.try_get("end_time")?;

        Ok(Self(Alarm {
            id: decode(&id)?,
            zone_id: decode(&zone_id)?,
            cause: decode(&cause)?,
            start_time: decode_ts(&start_time)?,
            end_time: end_time.as_deref().map(decode_ts).transpose()?,
        }))
    }
}

const INSERT: &str =
    "INSERT INTO alarms (id, zone_id, cause, start_time, end_time) VALUES (?, ?, ?, ?, ?)";
const SELECT_BY_ID: &str = "SELECT * FROM alarms WHERE id = ?";
// `?1` may be NULL to match every zone.
const SELECT_FILTERED: &str = "SELECT * FROM alarms WHERE (?1 IS NULL OR zone_id = ?1) AND (?2 = 0 OR end_time IS NULL) ORDER BY start_time DESC";
const UPDATE: &str = "UPDATE alarms SET cause = ?, end_time = ? WHERE id = ?";

/// `SQLite`-backed alarm repository.
pub struct SqliteAlarmRepository {
    pool: SqlitePool,
}

impl SqliteAlarmRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl AlarmRepository for SqliteAlarmRepository {
    fn create(&self, alarm: Alarm) -> impl Future<Output = Result<Alarm, FlameWatchError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(INSERT)
                .bind(alarm.id.to_string())
                .bind(alarm.zone_id.to_string())
                .bind(alarm.cause.as_str())
                .bind(encode_ts(&alarm.start_time))
                .bind(alarm.end_time.as_ref().map(encode_ts))
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(alarm)
        }
    }

    fn get_by_id(
        &self,
        id: AlarmId,
    ) -> impl Future<Output = Result<Option<Alarm>, FlameWatchError>> + Send {
        let pool = self.pool.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
                .bind(id.to_string())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(row.map(|w| w.0))
        }
    }

    fn find(
        &self,
        filter: AlarmFilter,
    ) -> impl Future<Output = Result<Vec<Alarm>, FlameWatchError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_FILTERED)
                .bind(filter.zone_id.map(|id| id.to_string()))
                .bind(filter.open_only)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn update(&self, alarm: Alarm) -> impl Future<Output = Result<Alarm, FlameWatchError>> + Send {
        let pool = self.pool.clone();
        async move {
            let result = sqlx::query(UPDATE)
                .bind(alarm.cause.as_str())
                .bind(alarm.end_time.as_ref().map(encode_ts))
                .bind(alarm.id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            if result.rows_affected() == 0 {
                return Err(NotFoundError {
                    entity: "Alarm",
                    id: alarm.id.to_string(),
                }
                .into());
            }
            Ok(alarm)
        }
    }
}
