//! Per-zone tidiness state machine.
//!
//! [`ZoneState`] is the authoritative record for one zone. All mutation
//! goes through the transition methods here; the `checking` status is
//! the sole per-zone concurrency gate ([`ZoneState::begin_check`]), so
//! no external lock manager is needed.
//!
//! Invariants enforced after every transition:
//! - `tasks` is non-empty iff `status == Messy`.
//! - `checking` is only ever held for the duration of one in-flight
//!   inspection; every completed inspection ends in a terminal status.
//! - An expired snooze behaves exactly like no snooze at all.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// ZoneStatus
// ---------------------------------------------------------------------------

/// Tidiness status of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneStatus {
    /// Never successfully inspected.
    Unknown,
    Tidy,
    Messy,
    /// An inspection is in flight right now.
    Checking,
    /// Too many consecutive inspection failures.
    Error,
}

impl ZoneStatus {
    /// String representation for log fields and sensors.
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneStatus::Unknown => "unknown",
            ZoneStatus::Tidy => "tidy",
            ZoneStatus::Messy => "messy",
            ZoneStatus::Checking => "checking",
            ZoneStatus::Error => "error",
        }
    }
}

// ---------------------------------------------------------------------------
// FailReason
// ---------------------------------------------------------------------------

/// Why an inspection failed.
///
/// All of these terminate the `checking` status and feed the
/// consecutive-failure counter; none of them is fatal to the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailReason {
    CameraUnavailable,
    AuthError,
    RateLimited,
    Timeout,
    ProviderError,
    MalformedResponse,
}

impl FailReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailReason::CameraUnavailable => "camera_unavailable",
            FailReason::AuthError => "auth_error",
            FailReason::RateLimited => "rate_limited",
            FailReason::Timeout => "timeout",
            FailReason::ProviderError => "provider_error",
            FailReason::MalformedResponse => "malformed_response",
        }
    }
}

impl std::fmt::Display for FailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// Structured result of one successful model inspection.
///
/// Produced by [`crate::parser::parse_verdict`], which guarantees that a
/// messy verdict always carries at least one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub is_tidy: bool,
    /// Checklist in the model's reported priority order.
    pub tasks: Vec<String>,
    pub comment: Option<String>,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Immutable read of a zone's state, safe to hand to the API layer.
///
/// Taken in one shot under the zone lock, so it never exposes a
/// half-updated state.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub status: ZoneStatus,
    pub tasks: Vec<String>,
    pub task_count: usize,
    pub comment: Option<String>,
    pub last_error: Option<String>,
    pub last_checked_at: Option<Timestamp>,
    pub last_success_at: Option<Timestamp>,
    /// `None` when not snoozed or the snooze has expired.
    pub snoozed_until: Option<Timestamp>,
    pub consecutive_failures: u32,
}

// ---------------------------------------------------------------------------
// ZoneState
// ---------------------------------------------------------------------------

/// Mutable state for one zone. One instance per configured zone, owned
/// by the registry for the zone's configuration lifetime.
#[derive(Debug)]
pub struct ZoneState {
    status: ZoneStatus,
    /// Terminal status to restore when a check fails below the error
    /// threshold. Only meaningful while `status == Checking`.
    prior_status: ZoneStatus,
    tasks: Vec<String>,
    comment: Option<String>,
    last_error: Option<String>,
    last_checked_at: Option<Timestamp>,
    last_success_at: Option<Timestamp>,
    snoozed_until: Option<Timestamp>,
    consecutive_failures: u32,
    failure_threshold: u32,
}

impl ZoneState {
    /// Fresh state for a newly configured zone.
    pub fn new(failure_threshold: u32) -> Self {
        Self {
            status: ZoneStatus::Unknown,
            prior_status: ZoneStatus::Unknown,
            tasks: Vec::new(),
            comment: None,
            last_error: None,
            last_checked_at: None,
            last_success_at: None,
            snoozed_until: None,
            consecutive_failures: 0,
            failure_threshold,
        }
    }

    pub fn status(&self) -> ZoneStatus {
        self.status
    }

    pub fn last_checked_at(&self) -> Option<Timestamp> {
        self.last_checked_at
    }

    /// The snooze window, normalised: an expired snooze reads as `None`.
    pub fn snoozed_until(&self, now: Timestamp) -> Option<Timestamp> {
        self.snoozed_until.filter(|until| *until > now)
    }

    /// Whether the zone is currently excluded from automatic checks.
    pub fn is_snoozed(&self, now: Timestamp) -> bool {
        self.snoozed_until(now).is_some()
    }

    /// Take a consistent snapshot of the whole state.
    pub fn snapshot(&self, now: Timestamp) -> StateSnapshot {
        StateSnapshot {
            status: self.status,
            tasks: self.tasks.clone(),
            task_count: self.tasks.len(),
            comment: self.comment.clone(),
            last_error: self.last_error.clone(),
            last_checked_at: self.last_checked_at,
            last_success_at: self.last_success_at,
            snoozed_until: self.snoozed_until(now),
            consecutive_failures: self.consecutive_failures,
        }
    }

    /// Enter the `checking` status, claiming the zone for one inspection.
    ///
    /// Fails with [`CoreError::AlreadyChecking`] if an inspection is
    /// already in flight. This is the only concurrency guard in the
    /// system: callers that hold the zone lock and see `Ok` own the
    /// inspection until they call `complete_check` or `fail_check`.
    pub fn begin_check(&mut self) -> Result<(), CoreError> {
        if self.status == ZoneStatus::Checking {
            return Err(CoreError::AlreadyChecking);
        }
        self.prior_status = self.status;
        self.status = ZoneStatus::Checking;
        Ok(())
    }

    /// Finish an inspection with a valid verdict.
    ///
    /// Transitions `checking -> tidy|messy`, stamps both timestamps,
    /// resets the failure counter and drops an expired snooze.
    pub fn complete_check(&mut self, verdict: Verdict, now: Timestamp) -> Result<(), CoreError> {
        if self.status != ZoneStatus::Checking {
            return Err(CoreError::InvalidTransition(format!(
                "complete_check from {}",
                self.status.as_str()
            )));
        }
        if !verdict.is_tidy && verdict.tasks.is_empty() {
            // The parser rejects this upstream; if it ever arrives here,
            // abandon the check rather than break the tasks invariant.
            self.status = self.prior_status;
            return Err(CoreError::InvalidTransition(
                "messy verdict with empty task list".into(),
            ));
        }

        if verdict.is_tidy {
            self.status = ZoneStatus::Tidy;
            self.tasks.clear();
        } else {
            self.status = ZoneStatus::Messy;
            self.tasks = verdict.tasks;
        }
        self.comment = verdict.comment;
        self.last_error = None;
        self.last_checked_at = Some(now);
        self.last_success_at = Some(now);
        self.consecutive_failures = 0;
        if self.snoozed_until(now).is_none() {
            self.snoozed_until = None;
        }
        Ok(())
    }

    /// Finish an inspection that failed.
    ///
    /// Keeps the prior terminal status until `failure_threshold`
    /// consecutive failures accumulate, then degrades to `error`.
    /// Stamps `last_checked_at` but not `last_success_at`.
    pub fn fail_check(&mut self, reason: FailReason, now: Timestamp) -> Result<(), CoreError> {
        if self.status != ZoneStatus::Checking {
            return Err(CoreError::InvalidTransition(format!(
                "fail_check from {}",
                self.status.as_str()
            )));
        }
        self.consecutive_failures += 1;
        self.last_checked_at = Some(now);
        self.last_error = Some(reason.as_str().to_string());

        if self.consecutive_failures >= self.failure_threshold {
            self.status = ZoneStatus::Error;
            // tasks are only valid alongside `messy`.
            self.tasks.clear();
        } else {
            self.status = self.prior_status;
        }
        Ok(())
    }

    /// Manual "mark done": force `tidy` and drop the checklist.
    ///
    /// A no-op success on an already-tidy zone. Refused with
    /// [`CoreError::Busy`] while an inspection is in flight. Never
    /// touches `last_checked_at`.
    pub fn clear_tasks(&mut self) -> Result<(), CoreError> {
        if self.status == ZoneStatus::Checking {
            return Err(CoreError::Busy);
        }
        if self.status == ZoneStatus::Tidy && self.tasks.is_empty() {
            return Ok(());
        }
        self.status = ZoneStatus::Tidy;
        self.tasks.clear();
        self.comment = Some("Tasks cleared manually.".to_string());
        self.last_error = None;
        Ok(())
    }

    /// Exclude the zone from automatic checks until `now + duration`.
    /// Manual checks are unaffected. Usable at any time.
    pub fn snooze(&mut self, duration: chrono::Duration, now: Timestamp) {
        self.snoozed_until = Some(now + duration);
    }

    #[cfg(test)]
    pub(crate) fn debug_check_invariants(&self) {
        if self.status == ZoneStatus::Messy {
            assert!(!self.tasks.is_empty(), "messy zone must have tasks");
        } else {
            assert!(
                self.tasks.is_empty(),
                "tasks must be empty unless status is messy"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
