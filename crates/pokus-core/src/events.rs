use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{SessionMode, SessionPhase};

/// Every state change in the system produces an Event.
/// The CLI prints them; tests assert on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        mode: SessionMode,
        duration_secs: u64,
        can_extend: bool,
        ends_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    /// A persisted session was picked up again with time left.
    SessionResumed {
        mode: SessionMode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        mode: SessionMode,
        duration_secs: u64,
        coins_earned: u64,
        accumulated_focus: u64,
        /// Completion was noticed on recovery rather than by a live tick.
        recovered: bool,
        at: DateTime<Utc>,
    },
    SessionCancelled {
        mode: SessionMode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionExtended {
        extension_secs: u64,
        at: DateTime<Utc>,
    },
    NudgeFired {
        session_active: bool,
        vibrated: bool,
        rearmed: bool,
        at: DateTime<Utc>,
    },
    EncounterResolved {
        species_id: u16,
        name: String,
        shiny: bool,
        caught: bool,
        catch_chance: f64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: SessionPhase,
        mode: Option<SessionMode>,
        remaining_secs: u64,
        total_secs: u64,
        progress_pct: f64,
        can_extend: bool,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::SessionStarted { at, .. }
            | Event::SessionResumed { at, .. }
            | Event::SessionCompleted { at, .. }
            | Event::SessionCancelled { at, .. }
            | Event::SessionExtended { at, .. }
            | Event::NudgeFired { at, .. }
            | Event::EncounterResolved { at, .. }
            | Event::StateSnapshot { at, .. } => *at,
        }
    }
}
