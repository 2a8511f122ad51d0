//! # flamewatch-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the repository port traits defined in `flamewatch-app::ports::storage`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `flamewatch-app` (for port traits) and `flamewatch-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod codec;

pub mod alarm_repo;
pub mod error;
pub mod node_repo;
pub mod pool;
pub mod zone_repo;
