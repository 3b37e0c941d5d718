use std::time::Duration;

/// Share of `duration` covered by `position`, in `0.0..=1.0`.
///
/// Zero when nothing has played yet or the duration is unknown.
pub fn progress_fraction(position: Duration, duration: Duration) -> f64 {
    if position.is_zero() || duration.is_zero() {
        return 0.0;
    }
    (position.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
}

/// Format a `Duration` as `MM:SS`, truncating partial seconds.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
