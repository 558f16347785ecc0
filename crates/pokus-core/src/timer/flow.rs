//! Flowmodoro break sizing: the break earned is a fixed fraction of the
//! focus time just completed.

/// Breaks shorter than this are not offered.
pub const MIN_BREAK_SECONDS: u64 = 30;

pub const DEFAULT_FLOW_RATIO: u32 = 4;

/// Break length for `focus_seconds` at a `ratio`:1 focus to break ratio,
/// or `None` when the result would be under [`MIN_BREAK_SECONDS`].
pub fn suggested_break_seconds(focus_seconds: u64, ratio: u32) -> Option<u64> {
    let ratio = if ratio == 0 { DEFAULT_FLOW_RATIO } else { ratio };
    let seconds = focus_seconds / u64::from(ratio);
    (seconds >= MIN_BREAK_SECONDS).then_some(seconds)
}
