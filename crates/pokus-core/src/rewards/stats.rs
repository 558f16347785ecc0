//! Display formatting for focus totals.

/// Compact duration: `45m`, `5h 30m`, `4d 5h`. Days only from 100 hours.
pub fn format_compact(seconds: u64) -> String {
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;

    if hours >= 100 {
        let days = hours / 24;
        let rest = hours % 24;
        return if rest == 0 {
            format!("{days}d")
        } else {
            format!("{days}d {rest}h")
        };
    }
    if hours > 0 {
        return if mins == 0 {
            format!("{hours}h")
        } else {
            format!("{hours}h {mins}m")
        };
    }
    format!("{mins}m")
}

/// Countdown form, `MM:SS`.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
