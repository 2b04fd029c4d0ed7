//! Zonewatch domain logic.
//!
//! Everything in this crate is pure state and policy: the per-zone tidy
//! state machine, the model-reply parser, due-check scheduling, prompt
//! construction, and the registry that owns one [`state::ZoneState`] per
//! configured zone. All I/O (cameras, vision providers, HTTP) lives in
//! the sibling crates.

pub mod error;
pub mod parser;
pub mod prompt;
pub mod registry;
pub mod scheduler;
pub mod state;
pub mod types;
pub mod zone;
