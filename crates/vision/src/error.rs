//! Error types for the camera and vision provider layers.

use zonewatch_core::state::FailReason;

// ---------------------------------------------------------------------------
// VisionError
// ---------------------------------------------------------------------------

/// A vision provider call failed.
///
/// Variants map one-to-one onto the [`FailReason`]s the state machine
/// records, via [`fail_reason`](VisionError::fail_reason).
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    /// The provider rejected our credentials (HTTP 401/403).
    #[error("{provider} rejected the API credentials: {detail}")]
    Auth {
        provider: &'static str,
        detail: String,
    },

    /// The provider throttled us (HTTP 429).
    #[error("{provider} rate limited the request: {detail}")]
    RateLimited {
        provider: &'static str,
        detail: String,
    },

    /// The request did not complete within the client timeout.
    #[error("request to {provider} timed out")]
    Timeout { provider: &'static str },

    /// Any other provider-side failure: transport errors, 5xx replies,
    /// or an envelope we cannot pull the reply text out of.
    #[error("{provider} error: {detail}")]
    Provider {
        provider: &'static str,
        detail: String,
    },
}

impl VisionError {
    /// The [`FailReason`] the state machine should record for this error.
    pub fn fail_reason(&self) -> FailReason {
        match self {
            Self::Auth { .. } => FailReason::AuthError,
            Self::RateLimited { .. } => FailReason::RateLimited,
            Self::Timeout { .. } => FailReason::Timeout,
            Self::Provider { .. } => FailReason::ProviderError,
        }
    }

    /// Classify a non-2xx provider response by status code.
    pub fn from_status(
        provider: &'static str,
        status: reqwest::StatusCode,
        body: String,
    ) -> Self {
        let detail = format!("HTTP {}: {}", status.as_u16(), truncate(&body, 300));
        match status.as_u16() {
            401 | 403 => Self::Auth { provider, detail },
            429 => Self::RateLimited { provider, detail },
            _ => Self::Provider { provider, detail },
        }
    }

    /// Classify a transport-level [`reqwest::Error`].
    pub fn from_transport(provider: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { provider }
        } else {
            Self::Provider {
                provider,
                detail: err.to_string(),
            }
        }
    }
}

/// Cap an error body so provider HTML error pages do not flood logs.
fn truncate(body: &str, limit: usize) -> &str {
    match body.char_indices().nth(limit) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

// ---------------------------------------------------------------------------
// CameraError
// ---------------------------------------------------------------------------

/// The camera snapshot could not be obtained or was unusable.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("camera unavailable: {0}")]
    Unavailable(String),
}

impl CameraError {
    /// The [`FailReason`] the state machine should record.
    pub fn fail_reason(&self) -> FailReason {
        FailReason::CameraUnavailable
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
