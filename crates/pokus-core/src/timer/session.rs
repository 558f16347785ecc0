//! The persisted session record.
//!
//! Stored under `timer_state` as a versioned camelCase record. Two older
//! shapes are still accepted on read and rewritten once in the current
//! shape:
//!
//! - unversioned records with the same fields (`mode`, `endTime`, ...)
//! - the oldest `{ startTime, isRunning }` marker, which only ever described
//!   a focus session of the default length

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::StorageError;
use crate::storage::{DataKey, KeyValueStore, PokusStore};

/// Current record version.
pub const SESSION_SCHEMA: u32 = 2;

/// Session length assumed for records that predate stored durations.
pub const LEGACY_DURATION_SECONDS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Focus,
    Break,
}

impl SessionMode {
    pub fn label(self) -> &'static str {
        match self {
            SessionMode::Focus => "Focus",
            SessionMode::Break => "Break",
        }
    }
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionMode::Focus => f.write_str("focus"),
            SessionMode::Break => f.write_str("break"),
        }
    }
}

impl std::str::FromStr for SessionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "focus" => Ok(SessionMode::Focus),
            "break" => Ok(SessionMode::Break),
            other => Err(format!("unknown mode '{other}', expected focus or break")),
        }
    }
}

/// One timed session. `end_time` is the only source of truth for the
/// remaining time; completion is derived from it, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub mode: SessionMode,
    #[serde(with = "ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    pub duration_seconds: u64,
    /// Base length used to size an extension.
    #[serde(rename = "baseBreakSeconds", default)]
    pub base_duration_seconds: u64,
    #[serde(default)]
    pub can_extend: bool,
    #[serde(default = "default_true")]
    pub is_running: bool,
}

fn default_true() -> bool {
    true
}

impl SessionState {
    /// A running session from `now`. `None` when the end time would fall
    /// outside the representable date range.
    pub fn new(
        mode: SessionMode,
        now: DateTime<Utc>,
        duration_seconds: u64,
        base_duration_seconds: u64,
        can_extend: bool,
    ) -> Option<Self> {
        Some(Self {
            mode,
            start_time: now,
            end_time: seconds_after(now, duration_seconds)?,
            duration_seconds,
            base_duration_seconds,
            can_extend,
            is_running: true,
        })
    }

    /// Whole seconds left, rounded to nearest and never negative.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        let ms = (self.end_time - now).num_milliseconds();
        if ms <= 0 {
            return 0;
        }
        ((ms + 500) / 1000) as u64
    }

    /// Finished once the rounded remaining time reaches zero, which can be
    /// up to half a second before `end_time`. `tick()` and `recover()` both
    /// complete through this check, so a session finishes at the same
    /// instant whichever path sees it first.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining_seconds(now) == 0
    }

    /// 0.0 .. 1.0 elapsed fraction.
    pub fn progress(&self, now: DateTime<Utc>) -> f64 {
        if self.duration_seconds == 0 {
            return 1.0;
        }
        let remaining = self.remaining_seconds(now) as f64;
        (1.0 - remaining / self.duration_seconds as f64).clamp(0.0, 1.0)
    }

    /// Length of the one allowed extension.
    pub fn extension_seconds(&self) -> u64 {
        self.base_duration_seconds / 2
    }
}

/// `at + secs`, or `None` past the end of the calendar.
pub(crate) fn seconds_after(at: DateTime<Utc>, secs: u64) -> Option<DateTime<Utc>> {
    let delta = Duration::try_seconds(i64::try_from(secs).ok()?)?;
    at.checked_add_signed(delta)
}

#[derive(Deserialize)]
struct SessionRecord {
    schema: u32,
    #[serde(flatten)]
    state: SessionState,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyMarker {
    start_time: i64,
    #[serde(default = "default_true")]
    is_running: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredSession {
    Current(SessionRecord),
    Unversioned(SessionState),
    Legacy(LegacyMarker),
}

/// Outcome of reading the session key.
enum Loaded {
    Current(SessionState),
    Migrated(SessionState),
    Inactive,
}

fn decode(raw: &str) -> Option<Loaded> {
    let stored: StoredSession = match serde_json::from_str(raw) {
        Ok(stored) => stored,
        Err(e) => {
            warn!(error = %e, "unreadable session record, treating as no session");
            return None;
        }
    };
    let loaded = match stored {
        StoredSession::Current(record) if record.schema == SESSION_SCHEMA => {
            Loaded::Current(record.state)
        }
        StoredSession::Current(record) => {
            warn!(schema = record.schema, "unknown session schema, treating as no session");
            return None;
        }
        StoredSession::Unversioned(state) => Loaded::Migrated(state),
        StoredSession::Legacy(marker) => {
            if !marker.is_running {
                Loaded::Inactive
            } else {
                let start = DateTime::<Utc>::from_timestamp_millis(marker.start_time)?;
                Loaded::Migrated(SessionState::new(
                    SessionMode::Focus,
                    start,
                    LEGACY_DURATION_SECONDS,
                    0,
                    false,
                )?)
            }
        }
    };
    Some(loaded)
}

/// Read the persisted session, migrating older shapes in place.
///
/// A stopped or unreadable record reads as `None`.
pub fn load_session<S: KeyValueStore>(store: &PokusStore<S>) -> Option<SessionState> {
    let raw = store.read_raw(DataKey::TimerState)?;
    match decode(&raw)? {
        Loaded::Current(state) => Some(state).filter(|s| s.is_running),
        Loaded::Inactive => None,
        Loaded::Migrated(state) => {
            if let Err(e) = save_session(store, &state) {
                warn!(error = %e, "failed to rewrite migrated session record");
            } else {
                info!(mode = %state.mode, "migrated session record to schema {SESSION_SCHEMA}");
            }
            Some(state).filter(|s| s.is_running)
        }
    }
}

pub fn save_session<S: KeyValueStore>(
    store: &PokusStore<S>,
    state: &SessionState,
) -> Result<(), StorageError> {
    store.write_json(DataKey::TimerState, &session_record(state))
}

/// Versioned form of a session for writing.
fn session_record(state: &SessionState) -> impl Serialize + '_ {
    #[derive(Serialize)]
    struct Borrowed<'a> {
        schema: u32,
        #[serde(flatten)]
        state: &'a SessionState,
    }
    Borrowed {
        schema: SESSION_SCHEMA,
        state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn remaining_rounds_to_nearest_second() {
        let state = SessionState::new(SessionMode::Focus, at(0), 60, 0, false).unwrap();
        assert_eq!(state.remaining_seconds(at(0)), 60);
        assert_eq!(state.remaining_seconds(at(400)), 60);
        assert_eq!(state.remaining_seconds(at(600)), 59);
        assert_eq!(state.remaining_seconds(at(60_000)), 0);
        assert_eq!(state.remaining_seconds(at(90_000)), 0);
    }

    #[test]
    fn expires_once_rounded_remaining_hits_zero() {
        let state = SessionState::new(SessionMode::Focus, at(0), 60, 0, false).unwrap();
        assert!(!state.is_expired(at(59_500)));
        assert!(state.is_expired(at(59_501)));
        assert!(state.is_expired(at(60_000)));
    }

    #[test]
    fn end_time_past_calendar_is_none() {
        assert!(SessionState::new(SessionMode::Focus, at(0), u64::MAX, 0, false).is_none());
        assert!(SessionState::new(SessionMode::Focus, at(0), 10_000_000_000_000, 0, false).is_none());
        assert_eq!(seconds_after(at(0), 60), Some(at(60_000)));
    }

    #[test]
    fn record_roundtrip_keeps_every_field() {
        let kv = MemoryStore::new();
        let store = PokusStore::new(&kv);
        let state =
            SessionState::new(SessionMode::Break, at(1_765_098_000_123), 600, 600, true).unwrap();
        save_session(&store, &state).unwrap();
        assert_eq!(load_session(&store), Some(state));

        let raw = kv.get("pokus_timer_state").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["schema"], 2);
        assert_eq!(json["baseBreakSeconds"], 600);
        assert_eq!(json["endTime"], 1_765_098_600_123i64);
    }

    #[test]
    fn unversioned_record_is_migrated_once() {
        let kv = MemoryStore::new();
        kv.set(
            "pokus_timer_state",
            r#"{"mode":"break","startTime":1000,"endTime":61000,"durationSeconds":60,
                "baseBreakSeconds":60,"canExtend":true,"isRunning":true}"#,
        )
        .unwrap();
        let store = PokusStore::new(&kv);
        let state = load_session(&store).unwrap();
        assert_eq!(state.mode, SessionMode::Break);
        assert_eq!(state.end_time, at(61_000));
        assert!(state.can_extend);

        let raw = kv.get("pokus_timer_state").unwrap().unwrap();
        assert!(raw.contains("\"schema\":2"));
    }

    #[test]
    fn oldest_marker_becomes_default_focus_session() {
        let kv = MemoryStore::new();
        kv.set("pokus_timer_state", r#"{"startTime":5000,"isRunning":true}"#)
            .unwrap();
        let store = PokusStore::new(&kv);
        let state = load_session(&store).unwrap();
        assert_eq!(state.mode, SessionMode::Focus);
        assert_eq!(state.duration_seconds, LEGACY_DURATION_SECONDS);
        assert_eq!(state.end_time, at(305_000));
    }

    #[test]
    fn stopped_or_corrupt_records_read_as_none() {
        let kv = MemoryStore::new();
        let store = PokusStore::new(&kv);
        assert!(load_session(&store).is_none());

        kv.set("pokus_timer_state", r#"{"startTime":5000,"isRunning":false}"#)
            .unwrap();
        assert!(load_session(&store).is_none());

        kv.set("pokus_timer_state", "{not json").unwrap();
        assert!(load_session(&store).is_none());

        kv.set("pokus_timer_state", r#"{"schema":9,"mode":"focus"}"#)
            .unwrap();
        assert!(load_session(&store).is_none());
    }
}
