use std::time::Duration;

use time::OffsetDateTime;
use tracing::warn;
use trun_model::Run;

use crate::error::CoreError;

/// Where a run stands with respect to its TTL at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlState {
    /// No TTL, unfinished, owned by a parent run, or already being deleted.
    NotEligible,
    /// Eligible; expires after the remaining duration.
    Pending(Duration),
    /// Eligible and past its expiry time.
    Expired,
}

/// A run is cleaned up only when it has a TTL, has finished, and no parent run owns it.
pub fn needs_cleanup(run: &Run) -> bool {
    run.spec.ttl.is_some() && run.is_done() && !run.has_parent_owner_reference()
}

/// Last transition time of the terminal condition, in UTC.
pub fn finish_time(run: &Run) -> Result<OffsetDateTime, CoreError> {
    let condition = run
        .terminal_condition()
        .ok_or_else(|| CoreError::MissingTerminalCondition(run.key()))?;
    let at = condition
        .last_transition_time
        .ok_or_else(|| CoreError::MissingFinishTime(run.key()))?;
    Ok(at.to_offset(time::UtcOffset::UTC))
}

/// Finish time plus TTL; saturates instead of overflowing.
pub fn expiry_time(run: &Run) -> Result<OffsetDateTime, CoreError> {
    let ttl = match run.spec.ttl {
        Some(ttl) if needs_cleanup(run) => ttl,
        _ => return Err(CoreError::NotEligible(run.key())),
    };
    let ttl = time::Duration::try_from(ttl).unwrap_or(time::Duration::MAX);
    Ok(finish_time(run)?.saturating_add(ttl))
}

/// Classify `run` against `now`.
pub fn ttl_state(run: &Run, now: OffsetDateTime) -> Result<TtlState, CoreError> {
    if run.is_deleting() || !needs_cleanup(run) {
        return Ok(TtlState::NotEligible);
    }

    let now = now.to_offset(time::UtcOffset::UTC);
    let finished = finish_time(run)?;
    if finished > now {
        warn!(
            run = %run.key(),
            finished = %finished,
            now = %now,
            "run finished in the future, check for clock skew"
        );
    }

    let remaining = expiry_time(run)? - now;
    if remaining <= time::Duration::ZERO {
        Ok(TtlState::Expired)
    } else {
        Ok(TtlState::Pending(remaining.unsigned_abs()))
    }
}
