//! # flamewatch-domain
//!
//! Pure domain model for the flamewatch fire-monitoring control plane.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Zones** (monitored areas with thresholds and a safety status)
//! - Define **Nodes** (sensor/actuator devices identified by their address)
//! - Define **Alarms** (open/closed hazard periods per zone)
//! - Route raw telemetry topics into typed messages
//! - Evaluate readings against zone thresholds
//! - Define **Events** and actuator **Commands**
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod address;
pub mod alarm;
pub mod command;
pub mod event;
pub mod node;
pub mod telemetry;
pub mod threshold;
pub mod zone;
