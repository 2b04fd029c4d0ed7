//! In-process domain events for zone inspections.

pub mod bus;

pub use bus::{kinds, EventBus, ZoneEvent};
