//! Position arithmetic for the engine queue and seeking.

use std::time::Duration;

/// Going "previous" within this much of the start jumps to the prior item;
/// later than that it restarts the current one.
pub(crate) const RESTART_THRESHOLD: Duration = Duration::from_secs(3);

/// Index after `current`, or `None` at the end of a queue of `len` items.
pub(crate) fn next_index(current: Option<usize>, len: usize) -> Option<usize> {
    match current {
        Some(i) if i + 1 < len => Some(i + 1),
        Some(_) => None,
        None if len > 0 => Some(0),
        None => None,
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum PreviousAction {
    Restart,
    Select(usize),
}

pub(crate) fn previous_action(current: Option<usize>, elapsed: Duration) -> PreviousAction {
    match current {
        Some(i) if i > 0 && elapsed <= RESTART_THRESHOLD => PreviousAction::Select(i - 1),
        _ => PreviousAction::Restart,
    }
}

/// Keep a seek target inside the item. An unknown duration (zero) leaves it as is.
pub(crate) fn clamp_seek(target: Duration, duration: Duration) -> Duration {
    if duration.is_zero() {
        target
    } else {
        target.min(duration)
    }
}

/// Apply a signed millisecond offset to `current`, saturating at zero.
pub(crate) fn offset_position(current: Duration, delta_ms: i64, duration: Duration) -> Duration {
    let delta = Duration::from_millis(delta_ms.unsigned_abs());
    let target = if delta_ms >= 0 {
        current.saturating_add(delta)
    } else {
        current.saturating_sub(delta)
    };
    clamp_seek(target, duration)
}
