//! End-to-end tests for the session lifecycle.
//!
//! Each test drives a `SessionController` with a manual clock, an in-memory
//! alarm scheduler and a recording device, then checks what was persisted.
//! A fresh controller over the same store stands in for an app relaunch.

use pokus_core::device::DeviceCall;
use pokus_core::nudge::InMemoryAlarms;
use pokus_core::storage::DataKey;
use pokus_core::timer::load_session;
use pokus_core::{
    Clock, Database, Event, GameConfig, KeyValueStore, ManualClock, MemoryStore, PokusStore,
    Recovery, RecordingDevice, SessionController, SessionMode, SessionPhase, SessionState,
    Settings, StartRequest, VibrationPattern,
};

// ============================================================================
// Test Helpers
// ============================================================================

type Controller<'a, S> =
    SessionController<S, ManualClock, &'a InMemoryAlarms<ManualClock>, &'a RecordingDevice>;

struct Harness {
    kv: MemoryStore,
    clock: ManualClock,
    alarms: InMemoryAlarms<ManualClock>,
    device: RecordingDevice,
}

impl Harness {
    fn new() -> Self {
        let clock = ManualClock::default();
        Self {
            kv: MemoryStore::new(),
            alarms: InMemoryAlarms::new(clock.clone()),
            clock,
            device: RecordingDevice::new(),
        }
    }

    /// A controller for one activation.
    fn activate(&self) -> Controller<'_, &MemoryStore> {
        SessionController::new(
            PokusStore::new(&self.kv),
            self.clock.clone(),
            &self.alarms,
            &self.device,
            GameConfig::default(),
        )
    }

    fn store(&self) -> PokusStore<&MemoryStore> {
        PokusStore::new(&self.kv)
    }
}

// ============================================================================
// Start / tick
// ============================================================================

#[test]
fn test_start_reports_full_duration() {
    let h = Harness::new();
    let mut c = h.activate();
    let event = c.start(StartRequest::focus(1500)).unwrap();
    assert!(matches!(
        event,
        Event::SessionStarted {
            mode: SessionMode::Focus,
            duration_secs: 1500,
            ..
        }
    ));
    assert_eq!(c.remaining_seconds(), Some(1500));
}

#[test]
fn test_focus_300_end_to_end() {
    let h = Harness::new();
    let mut c = h.activate();
    c.start(StartRequest::focus(300)).unwrap();
    assert_eq!(h.alarms.pending().len(), 1);

    h.clock.advance_secs(300);
    let done = c.tick().expect("session should complete");

    assert_eq!(c.phase(), SessionPhase::Completed);
    let credit = done.credit.unwrap();
    assert_eq!(credit.coins_earned, 1);
    assert_eq!(h.store().coins(), 1);
    assert_eq!(h.store().accumulated_focus(), 300);
    assert!(h.alarms.pending().is_empty());
    assert!(h.store().nudge_alarm().is_none());
    assert!(load_session(&h.store()).is_none());
}

#[test]
fn test_completion_side_effects_on_device() {
    let h = Harness::new();
    let mut c = h.activate();
    c.start(StartRequest::focus(60)).unwrap();
    h.device.clear();
    h.clock.advance_secs(60);
    c.tick().unwrap();

    let calls = h.device.calls();
    assert!(calls.contains(&DeviceCall::StopMonitor));
    assert!(calls.contains(&DeviceCall::WakeRelaunch(false)));
    assert_eq!(
        h.device.vibrations(),
        vec![VibrationPattern::SessionComplete]
    );
}

#[test]
fn test_break_completion_credits_nothing() {
    let h = Harness::new();
    let mut c = h.activate();
    c.start(StartRequest::rest(600)).unwrap();
    h.clock.advance_secs(600);
    let done = c.tick().unwrap();
    assert!(done.credit.is_none());
    assert_eq!(h.store().coins(), 0);
    assert_eq!(h.store().accumulated_focus(), 0);
    assert!(load_session(&h.store()).is_none());
}

// ============================================================================
// Recovery
// ============================================================================

#[test]
fn test_recover_running_session() {
    let h = Harness::new();
    h.activate().start(StartRequest::focus(1500)).unwrap();
    h.clock.advance_secs(600);

    let mut relaunched = h.activate();
    match relaunched.recover() {
        Recovery::Running(Event::SessionResumed { remaining_secs, .. }) => {
            assert_eq!(remaining_secs, 900)
        }
        other => panic!("expected running session, got {other:?}"),
    }
    assert_eq!(relaunched.phase(), SessionPhase::Running);
    // The stored alarm survived, so no second alarm is armed.
    assert_eq!(h.alarms.pending().len(), 1);
}

#[test]
fn test_recover_rearms_missing_alarm() {
    let h = Harness::new();
    h.activate().start(StartRequest::focus(1500)).unwrap();
    h.store().clear_nudge_alarm().unwrap();

    h.activate().recover();
    assert!(h.store().nudge_alarm().is_some());
}

#[test]
fn test_recover_after_expiry_credits_exactly_once() {
    let h = Harness::new();
    h.activate().start(StartRequest::focus(300)).unwrap();
    h.clock.advance_secs(301);

    let mut first = h.activate();
    match first.recover() {
        Recovery::Completed(done) => {
            assert!(done.recovered);
            assert_eq!(done.credit.unwrap().coins_earned, 1);
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert_eq!(first.phase(), SessionPhase::Completed);

    assert_eq!(first.recover(), Recovery::NoSession);
    assert_eq!(first.phase(), SessionPhase::Completed);
    assert_eq!(h.activate().recover(), Recovery::NoSession);

    assert_eq!(h.store().coins(), 1);
    assert_eq!(h.store().accumulated_focus(), 300);
    assert_eq!(h.store().total_focus(), 300);
}

#[test]
fn test_recovered_and_live_completion_match() {
    let live = Harness::new();
    let mut c = live.activate();
    c.start(StartRequest::focus(900)).unwrap();
    live.clock.advance_secs(900);
    let live_done = c.tick().unwrap();

    let lazy = Harness::new();
    lazy.activate().start(StartRequest::focus(900)).unwrap();
    lazy.clock.advance_secs(5000);
    let Recovery::Completed(lazy_done) = lazy.activate().recover() else {
        panic!("expected completion");
    };

    assert_eq!(live_done.session, lazy_done.session);
    assert_eq!(live_done.credit, lazy_done.credit);
    assert_eq!(live.device.vibrations(), lazy.device.vibrations());
}

#[test]
fn test_recover_with_nothing_stored() {
    let h = Harness::new();
    assert_eq!(h.activate().recover(), Recovery::NoSession);
}

#[test]
fn test_recover_migrates_legacy_marker() {
    let h = Harness::new();
    let start = h.clock.now().timestamp_millis();
    h.kv
        .set(
            "pokus_timer_state",
            &format!(r#"{{"startTime":{start},"isRunning":true}}"#),
        )
        .unwrap();
    h.clock.advance_secs(100);

    let mut c = h.activate();
    assert!(matches!(
        c.recover(),
        Recovery::Running(Event::SessionResumed {
            remaining_secs: 200,
            ..
        })
    ));
    let raw = h.kv.get("pokus_timer_state").unwrap().unwrap();
    assert!(raw.contains("\"schema\":2"));
}

// ============================================================================
// Cancel / extend / restart
// ============================================================================

#[test]
fn test_cancel_clears_everything_without_reward() {
    let h = Harness::new();
    let mut c = h.activate();
    c.start(StartRequest::focus(1500)).unwrap();
    h.clock.advance_secs(1200);
    c.cancel().unwrap();

    assert!(load_session(&h.store()).is_none());
    assert!(h.alarms.pending().is_empty());
    assert_eq!(h.store().coins(), 0);
    assert!(h.device.calls().contains(&DeviceCall::WakeRelaunch(false)));
    assert_eq!(h.activate().recover(), Recovery::NoSession);
}

#[test]
fn test_extend_twice_second_is_noop() {
    let h = Harness::new();
    let mut c = h.activate();
    c.start(StartRequest::rest(600)).unwrap();
    h.clock.advance_secs(600);
    c.tick().unwrap();

    assert!(c.extend().is_some());
    let persisted = load_session(&h.store()).unwrap();
    assert_eq!(persisted.duration_seconds, 300);
    assert!(!persisted.can_extend);

    // Still running: not extendable.
    assert!(c.extend().is_none());
    h.clock.advance_secs(300);
    c.tick().unwrap();
    assert!(c.extend().is_none());
}

#[test]
fn test_extension_survives_relaunch_as_non_extendable() {
    let h = Harness::new();
    let mut c = h.activate();
    c.start(StartRequest::rest(61)).unwrap();
    h.clock.advance_secs(61);
    c.tick().unwrap();
    c.extend().unwrap();

    h.clock.advance_secs(30);
    let mut relaunched = h.activate();
    let Recovery::Completed(done) = relaunched.recover() else {
        panic!("extension should have finished");
    };
    assert!(!done.session.can_extend);
    assert!(relaunched.extend().is_none());
}

#[test]
fn test_restart_from_completed_focus() {
    let h = Harness::new();
    let mut c = h.activate();
    c.start(StartRequest::focus(300)).unwrap();
    h.clock.advance_secs(300);
    c.tick().unwrap();

    let event = c.restart_same_duration().unwrap();
    assert!(matches!(
        event,
        Event::SessionStarted {
            duration_secs: 300,
            ..
        }
    ));
    assert_eq!(h.alarms.pending().len(), 1);
    h.clock.advance_secs(300);
    c.tick().unwrap();
    assert_eq!(h.store().coins(), 2);
}

#[test]
fn test_invalid_operations_are_noops() {
    let h = Harness::new();
    let mut c = h.activate();
    assert!(c.tick().is_none());
    assert!(c.cancel().is_none());
    assert!(c.extend().is_none());
    assert!(c.restart_same_duration().is_none());
    assert!(!c.return_to_idle());
    assert_eq!(c.phase(), SessionPhase::Idle);
}

#[test]
fn test_start_over_stale_state() {
    let h = Harness::new();
    let store = h.store();
    let stale = SessionState::new(SessionMode::Break, h.clock.now(), 60, 60, true).unwrap();
    pokus_core::timer::save_session(&store, &stale).unwrap();

    let mut c = h.activate();
    c.start(StartRequest::focus(900)).unwrap();
    let persisted = load_session(&store).unwrap();
    assert_eq!(persisted.mode, SessionMode::Focus);
    assert_eq!(persisted.duration_seconds, 900);
}

// ============================================================================
// Developer mode and SQLite
// ============================================================================

#[test]
fn test_developer_mode_keeps_progress_separate() {
    let h = Harness::new();
    Settings {
        developer_mode: true,
        ..Settings::default()
    }
    .save(&h.kv)
    .unwrap();

    let mut c = h.activate();
    c.start(StartRequest::focus(300)).unwrap();
    h.clock.advance_secs(300);
    c.tick().unwrap();

    assert_eq!(h.kv.get("pokus_dev_coins").unwrap().as_deref(), Some("1"));
    assert!(h.kv.get("pokus_coins").unwrap().is_none());
    assert_eq!(
        h.kv.get(&DataKey::AccumulatedFocus.key(true))
            .unwrap()
            .as_deref(),
        Some("300")
    );
}

#[test]
fn test_sqlite_store_survives_relaunch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pokus.db");
    let clock = ManualClock::default();
    let alarms = InMemoryAlarms::new(clock.clone());
    let device = RecordingDevice::new();

    {
        let db = Database::open_at(&path).unwrap();
        let mut c = SessionController::new(
            PokusStore::new(db),
            clock.clone(),
            &alarms,
            &device,
            GameConfig::default(),
        );
        c.start(StartRequest::focus(600)).unwrap();
    }

    clock.advance_secs(700);
    let db = Database::open_at(&path).unwrap();
    let mut c = SessionController::new(
        PokusStore::new(db),
        clock.clone(),
        &alarms,
        &device,
        GameConfig::default(),
    );
    let Recovery::Completed(done) = c.recover() else {
        panic!("expected completion after relaunch");
    };
    assert_eq!(done.credit.unwrap().coins_earned, 2);
    assert_eq!(c.store().coins(), 2);
    assert_eq!(c.recover(), Recovery::NoSession);
}
