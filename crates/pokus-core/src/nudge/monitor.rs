//! Background session monitor.
//!
//! The monitor runs alongside a focus session and checks once a minute
//! whether it still has anything to watch. Breaks are never monitored.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::storage::{KeyValueStore, PokusStore};
use crate::timer::{load_session, SessionMode, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorDecision {
    KeepRunning,
    Exit,
}

pub fn decide(session: Option<&SessionState>, now: DateTime<Utc>) -> MonitorDecision {
    match session {
        Some(s) if s.is_running && s.mode == SessionMode::Focus && now < s.end_time => {
            MonitorDecision::KeepRunning
        }
        _ => MonitorDecision::Exit,
    }
}

/// One monitor check against persisted state.
pub fn check<S: KeyValueStore>(store: &PokusStore<S>, now: DateTime<Utc>) -> MonitorDecision {
    let decision = decide(load_session(store).as_ref(), now);
    debug!(?decision, "session monitor check");
    decision
}
