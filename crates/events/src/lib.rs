//! Fleetwatch in-process event infrastructure.
//!
//! - [`EventBus`] — publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`FleetEvent`] — the canonical domain event envelope, carrying the
//!   audience (device/location/user) the real-time router fans out to.

pub mod bus;

pub use bus::{EventBus, FleetEvent};
