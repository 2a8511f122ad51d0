//! # flamewatch-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve the **administrative JSON API** (`/api/zones`, `/api/nodes`,
//!   `/api/alarms`) used by operators to manage zones and nodes, trigger and
//!   resolve alarms
//! - Stream domain events as **Server-Sent Events** (`/api/events/stream`)
//! - Map HTTP requests into application service calls (driving adapter)
//! - Map [`FlameWatchError`](flamewatch_domain::error::FlameWatchError) into
//!   status codes
//!
//! ## Dependency rule
//! Depends on `flamewatch-app` (for port traits and services) and
//! `flamewatch-domain` (for domain types used in request/response mapping).
//! Never leaks axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;

#[cfg(test)]
mod testing;
