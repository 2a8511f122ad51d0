//! `SQLite` implementation of [`NodeRepository`].

use std::future::Future;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use flamewatch_app::ports::NodeRepository;
use flamewatch_domain::address::DeviceAddress;
use flamewatch_domain::error::{ConflictError, FlameWatchError, NotFoundError};
use flamewatch_domain::id::{NodeId, ZoneId};
use flamewatch_domain::node::{Node, Readings};
use flamewatch_domain::time::Timestamp;

use crate::codec::{decode, decode_ts, encode_ts};
use crate::error::StorageError;

struct Wrapper(Node);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Node> {
        value.map(|w| w.0)
    }

    fn all(values: Vec<Self>) -> Vec<Node> {
        values.into_iter().map(|w| w.0).collect()
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let address: String = row.try_get("address")?;
        let zone_id: Option<String> = row.try_get("zone_id")?;
        let status: String = row.try_get("status")?;
        let last_seen: Option<String> = row.try_get("last_seen")?;
        let temperature: Option<f64> = row.try_get("temperature")?;
        let smoke_level: Option<f64> = row.try_get("smoke_level")?;
        let flame_detected: Option<bool> = row.try_get("flame_detected")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(Self(Node {
            id: decode(&id)?,
            address: decode::<DeviceAddress>(&address)?,
            zone_id: zone_id.as_deref().map(decode).transpose()?,
            status: decode(&status)?,
            last_seen: last_seen.as_deref().map(decode_ts).transpose()?,
            readings: Readings {
                temperature,
                smoke_level,
                flame_detected,
            },
            created_at: decode_ts(&created_at)?,
            updated_at: decode_ts(&updated_at)?,
        }))
    }
}

const INSERT: &str = "INSERT INTO nodes (id, address, zone_id, status, last_seen, temperature, smoke_level, flame_detected, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";
const SELECT_BY_ID: &str = "SELECT * FROM nodes WHERE id = ?";
const SELECT_BY_ADDRESS: &str = "SELECT * FROM nodes WHERE address = ?";
const SELECT_BY_ZONE: &str = "SELECT * FROM nodes WHERE zone_id = ? ORDER BY created_at";
const SELECT_ALL: &str = "SELECT * FROM nodes ORDER BY created_at";
const UPDATE: &str = "UPDATE nodes SET zone_id = ?, status = ?, last_seen = ?, temperature = ?, smoke_level = ?, flame_detected = ?, updated_at = ? WHERE id = ?";
const UPDATE_CONTACT: &str = "UPDATE nodes SET last_seen = ?, temperature = ?, smoke_level = ?, flame_detected = ?, updated_at = ? WHERE id = ? RETURNING *";

/// `SQLite`-backed node repository.
///
/// The `UNIQUE` constraint on `address` backs the one-node-per-device rule.
pub struct SqliteNodeRepository {
    pool: SqlitePool,
}

impl SqliteNodeRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl NodeRepository for SqliteNodeRepository {
    fn create(&self, node: Node) -> impl Future<Output = Result<Node, FlameWatchError>> + Send {
        let pool = self.pool.clone();
        async move {
            node.validate()?;
            let result = sqlx::query(INSERT)
                .bind(node.id.to_string())
                .bind(node.address.as_str())
                .bind(node.zone_id.map(|id| id.to_string()))
                .bind(node.status.as_str())
                .bind(node.last_seen.as_ref().map(encode_ts))
                .bind(node.readings.temperature)
                .bind(node.readings.smoke_level)
                .bind(node.readings.flame_detected)
                .bind(encode_ts(&node.created_at))
                .bind(encode_ts(&node.updated_at))
                .execute(&pool)
                .await;

            match result {
                Ok(_) => Ok(node),
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(ConflictError {
                    entity: "Node",
                    key: "address",
                    value: node.address.to_string(),
                }
                .into()),
                Err(err) => Err(StorageError::from(err).into()),
            }
        }
    }

    fn get_by_id(
        &self,
        id: NodeId,
    ) -> impl Future<Output = Result<Option<Node>, FlameWatchError>> + Send {
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

    fn get_all(&self) -> impl Future<Output = Result<Vec<Node>, FlameWatchError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::all(rows))
        }
    }

    fn find_by_address(
        &self,
        address: &DeviceAddress,
    ) -> impl Future<Output = Result<Option<Node>, FlameWatchError>> + Send {
        let pool = self.pool.clone();
        let address = address.to_string();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ADDRESS)
                .bind(address)
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn find_by_zone(
        &self,
        zone_id: ZoneId,
    ) -> impl Future<Output = Result<Vec<Node>, FlameWatchError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_ZONE)
                .bind(zone_id.to_string())
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::all(rows))
        }
    }

    fn update(&self, node: Node) -> impl Future<Output = Result<Node, FlameWatchError>> + Send {
        let pool = self.pool.clone();
        async move {
            node.validate()?;
            let result = sqlx::query(UPDATE)
                .bind(node.zone_id.map(|id| id.to_string()))
                .bind(node.status.as_str())
                .bind(node.last_seen.as_ref().map(encode_ts))
                .bind(node.readings.temperature)
                .bind(node.readings.smoke_level)
                .bind(node.readings.flame_detected)
                .bind(encode_ts(&node.updated_at))
                .bind(node.id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            if result.rows_affected() == 0 {
                return Err(NotFoundError {
                    entity: "Node",
                    id: node.id.to_string(),
                }
                .into());
            }
            Ok(node)
        }
    }

    fn record_contact(
        &self,
        id: NodeId,
        readings: Readings,
        seen_at: Timestamp,
    ) -> impl Future<Output = Result<Node, FlameWatchError>> + Send {
        let pool = self.pool.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(UPDATE_CONTACT)
                .bind(encode_ts(&seen_at))
                .bind(readings.temperature)
                .bind(readings.smoke_level)
                .bind(readings.flame_detected)
                .bind(encode_ts(&seen_at))
                .bind(id.to_string())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Wrapper::maybe(row).ok_or_else(|| {
                NotFoundError {
                    entity: "Node",
                    id: id.to_string(),
                }
                .into()
            })
        }
    }
}
