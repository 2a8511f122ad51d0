//! # flamewatch-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `ZoneRepository`, `NodeRepository`, `AlarmRepository` — the store
//!   - `CommandPublisher` — outbound node commands
//!   - `EventPublisher` — domain event fan-out
//! - Define the **driving/inbound port** `TelemetryHandler`, implemented by
//!   the [`TelemetryPipeline`](pipeline::TelemetryPipeline)
//! - Own the **zone alarm state machine**, the only writer of zone status
//! - Provide **in-process infrastructure** (event bus, keyed locks) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `flamewatch-domain` only (plus `tokio::sync` for channels and locks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod alarm_state_machine;
pub mod event_bus;
pub mod keyed_lock;
pub mod pipeline;
pub mod ports;
pub mod services;

#[cfg(test)]
mod testing;
