use crate::types::ZoneId;

/// Domain-level errors shared across the workspace.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// No zone with this id exists in the registry.
    #[error("Zone not found: {0}")]
    ZoneNotFound(ZoneId),

    /// `begin_check` was called while an inspection is already in flight.
    ///
    /// This is the per-zone concurrency guard, not a true failure: the
    /// tick loop skips it silently, manual callers see it surfaced.
    #[error("An inspection is already in flight for this zone")]
    AlreadyChecking,

    /// A state mutation (e.g. `clear_tasks`) was attempted while the zone
    /// is mid-inspection.
    #[error("Zone is busy with an in-flight inspection")]
    Busy,

    /// A state transition was requested from a status that does not allow it.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Zone or service configuration failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request-level validation failed (bad duration, unknown field, ...).
    #[error("Validation failed: {0}")]
    Validation(String),
}
