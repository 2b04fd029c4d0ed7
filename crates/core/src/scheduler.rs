//! Due-check scheduling policy.
//!
//! Pure decision logic, no I/O and no clock reads: the caller passes
//! `now` in. The registry applies [`is_due`] per zone in configuration
//! order, so the set of due zones for a tick is deterministic.

use crate::state::ZoneState;
use crate::types::Timestamp;

/// Whether an automatic check should run for a zone right now.
///
/// A zone is due when all of:
/// 1. no inspection is in flight (`checking` status),
/// 2. it is not snoozed (an expired snooze counts as absent),
/// 3. it has never been checked, or `check_interval` has elapsed since
///    the last completed check (success or failure).
///
/// Manual checks bypass 2 and 3 but still hit the `begin_check` gate.
pub fn is_due(state: &ZoneState, check_interval: chrono::Duration, now: Timestamp) -> bool {
    use crate::state::ZoneStatus;

    if state.status() == ZoneStatus::Checking {
        return false;
    }
    if state.is_snoozed(now) {
        return false;
    }
    match state.last_checked_at() {
        None => true,
        Some(last) => now - last >= check_interval,
    }
}
