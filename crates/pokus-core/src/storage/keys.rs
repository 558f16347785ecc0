//! Storage key layout.
//!
//! Progress data is namespaced: in developer mode every data key is stored
//! under `pokus_dev_` instead of `pokus_`, so test runs never touch real
//! progress. Settings keys are shared across both namespaces.

/// Data keys, forked by developer mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKey {
    TimerState,
    AccumulatedFocus,
    Coins,
    Caught,
    Shiny,
    LastResult,
    FocusHistory,
    TotalFocus,
    NudgeAlarm,
    RecentFocus,
    RecentBreak,
    LastSessionSeconds,
}

impl DataKey {
    pub const ALL: [DataKey; 12] = [
        DataKey::TimerState,
        DataKey::AccumulatedFocus,
        DataKey::Coins,
        DataKey::Caught,
        DataKey::Shiny,
        DataKey::LastResult,
        DataKey::FocusHistory,
        DataKey::TotalFocus,
        DataKey::NudgeAlarm,
        DataKey::RecentFocus,
        DataKey::RecentBreak,
        DataKey::LastSessionSeconds,
    ];

    fn suffix(self) -> &'static str {
        match self {
            DataKey::TimerState => "timer_state",
            DataKey::AccumulatedFocus => "accumulated_focus",
            DataKey::Coins => "coins",
            DataKey::Caught => "caught",
            DataKey::Shiny => "shiny",
            DataKey::LastResult => "last_result",
            DataKey::FocusHistory => "focus_history",
            DataKey::TotalFocus => "total_focus",
            DataKey::NudgeAlarm => "nudge_alarm",
            DataKey::RecentFocus => "recent_focus",
            DataKey::RecentBreak => "recent_break",
            DataKey::LastSessionSeconds => "last_session_seconds",
        }
    }

    /// The physical key for this entry in the given namespace.
    pub fn key(self, developer_mode: bool) -> String {
        if developer_mode {
            format!("pokus_dev_{}", self.suffix())
        } else {
            format!("pokus_{}", self.suffix())
        }
    }
}

pub(crate) const SETTINGS_FOCUS_GOAL: &str = "pokus_focus_goal";
pub(crate) const SETTINGS_NUDGE_ENABLED: &str = "pokus_nudge_enabled";
pub(crate) const SETTINGS_NUDGE_INTERVAL: &str = "pokus_nudge_interval";
pub(crate) const SETTINGS_FLOW_RATIO: &str = "pokus_flow_ratio";
pub(crate) const SETTINGS_DEV_MODE: &str = "pokus_dev_mode";
