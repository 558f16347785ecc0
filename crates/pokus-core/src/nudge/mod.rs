//! Periodic nudges built from one-shot alarms.
//!
//! There is no background process. Each alarm activation vibrates (when
//! appropriate) and schedules the next alarm, so a chain of one-shot alarms
//! behaves like a repeating timer. The handle of the single pending alarm is
//! persisted so any later activation can cancel it.
//!
//! Every scheduler call is best effort: failures are logged and swallowed.
//! The countdown never depends on a nudge firing.

pub mod monitor;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::device::{Device, VibrationPattern};
use crate::error::AlarmError;
use crate::events::Event;
use crate::storage::database::PendingAlarm;
use crate::storage::{KeyValueStore, PokusStore};
use crate::timer::{load_session, seconds_after, SessionMode};

/// Opaque id of a scheduled alarm.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmHandle(String);

impl AlarmHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AlarmHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One-shot alarm registration.
pub trait AlarmScheduler {
    fn schedule(&self, delay_seconds: u64) -> Result<AlarmHandle, AlarmError>;

    /// Cancelling an unknown or already fired alarm is not an error.
    fn cancel(&self, handle: &AlarmHandle) -> Result<(), AlarmError>;
}

impl<T: AlarmScheduler + ?Sized> AlarmScheduler for &T {
    fn schedule(&self, delay_seconds: u64) -> Result<AlarmHandle, AlarmError> {
        (**self).schedule(delay_seconds)
    }

    fn cancel(&self, handle: &AlarmHandle) -> Result<(), AlarmError> {
        (**self).cancel(handle)
    }
}

impl<T: AlarmScheduler + ?Sized> AlarmScheduler for Rc<T> {
    fn schedule(&self, delay_seconds: u64) -> Result<AlarmHandle, AlarmError> {
        (**self).schedule(delay_seconds)
    }

    fn cancel(&self, handle: &AlarmHandle) -> Result<(), AlarmError> {
        (**self).cancel(handle)
    }
}

/// In-process scheduler driven by a [`Clock`].
///
/// Alarms are only delivered when the owner calls [`InMemoryAlarms::take_due`].
pub struct InMemoryAlarms<C> {
    clock: C,
    pending: RefCell<Vec<PendingAlarm>>,
    next_id: Cell<u64>,
    failing: Cell<bool>,
}

impl<C: Clock> InMemoryAlarms<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            pending: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            failing: Cell::new(false),
        }
    }

    /// Make every following call fail, as a platform without alarm
    /// permission would.
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    pub fn pending(&self) -> Vec<PendingAlarm> {
        self.pending.borrow().clone()
    }

    pub fn is_pending(&self, handle: &AlarmHandle) -> bool {
        self.pending.borrow().iter().any(|a| &a.handle == handle)
    }

    /// Remove and return the alarms due now, earliest first.
    pub fn take_due(&self) -> Vec<PendingAlarm> {
        let now = self.clock.now();
        let mut pending = self.pending.borrow_mut();
        let (mut due, rest): (Vec<_>, Vec<_>) =
            pending.drain(..).partition(|a| a.fire_at <= now);
        *pending = rest;
        due.sort_by_key(|a| a.fire_at);
        due
    }
}

impl<C: Clock> AlarmScheduler for InMemoryAlarms<C> {
    fn schedule(&self, delay_seconds: u64) -> Result<AlarmHandle, AlarmError> {
        if self.failing.get() {
            return Err(AlarmError::ScheduleFailed("alarm permission denied".into()));
        }
        let fire_at = seconds_after(self.clock.now(), delay_seconds).ok_or_else(|| {
            AlarmError::ScheduleFailed(format!("delay of {delay_seconds}s out of range"))
        })?;
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let handle = AlarmHandle::new(format!("alarm-{id}"));
        self.pending.borrow_mut().push(PendingAlarm {
            handle: handle.clone(),
            fire_at,
        });
        Ok(handle)
    }

    fn cancel(&self, handle: &AlarmHandle) -> Result<(), AlarmError> {
        if self.failing.get() {
            return Err(AlarmError::CancelFailed {
                handle: handle.to_string(),
                message: "alarm permission denied".into(),
            });
        }
        self.pending.borrow_mut().retain(|a| &a.handle != handle);
        Ok(())
    }
}

/// Everything an alarm activation needs, read once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NudgeSnapshot {
    /// A focus session is running and has not reached its end time.
    pub session_active: bool,
    pub nudge_enabled: bool,
    pub interval_minutes: u32,
}

impl NudgeSnapshot {
    pub fn read<S: KeyValueStore>(store: &PokusStore<S>, now: DateTime<Utc>) -> Self {
        let settings = store.settings();
        let session_active = load_session(store)
            .map(|s| s.mode == SessionMode::Focus && !s.is_expired(now))
            .unwrap_or(false);
        Self {
            session_active,
            nudge_enabled: settings.nudge_enabled,
            interval_minutes: settings.nudge_interval,
        }
    }
}

/// What one alarm activation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NudgeOutcome {
    pub session_active: bool,
    pub vibrated: bool,
    pub rearmed: Option<AlarmHandle>,
}

impl NudgeOutcome {
    pub fn event(&self, at: DateTime<Utc>) -> Event {
        Event::NudgeFired {
            session_active: self.session_active,
            vibrated: self.vibrated,
            rearmed: self.rearmed.is_some(),
            at,
        }
    }
}

/// The self-rescheduling alarm chain.
pub struct NudgeChain<A> {
    scheduler: A,
}

impl<A: AlarmScheduler> NudgeChain<A> {
    pub fn new(scheduler: A) -> Self {
        Self { scheduler }
    }

    pub fn scheduler(&self) -> &A {
        &self.scheduler
    }

    /// Replace any pending alarm with one `interval_minutes` from now.
    pub fn arm<S: KeyValueStore>(
        &self,
        store: &PokusStore<S>,
        interval_minutes: u32,
    ) -> Option<AlarmHandle> {
        self.cancel(store);
        let delay = u64::from(interval_minutes) * 60;
        let handle = match self.scheduler.schedule(delay) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "failed to schedule nudge alarm");
                return None;
            }
        };
        if let Err(e) = store.save_nudge_alarm(&handle) {
            warn!(error = %e, %handle, "failed to persist nudge alarm handle");
        }
        debug!(%handle, interval_minutes, "nudge alarm armed");
        Some(handle)
    }

    /// Cancel the pending alarm, if any, and forget its handle.
    pub fn cancel<S: KeyValueStore>(&self, store: &PokusStore<S>) {
        let Some(handle) = store.nudge_alarm() else {
            return;
        };
        if let Err(e) = self.scheduler.cancel(&handle) {
            warn!(error = %e, %handle, "failed to cancel nudge alarm");
        }
        if let Err(e) = store.clear_nudge_alarm() {
            warn!(error = %e, "failed to clear nudge alarm handle");
        }
        debug!(%handle, "nudge alarm cancelled");
    }

    /// Handle one alarm activation.
    ///
    /// The session check and the re-arm decision come from a single
    /// [`NudgeSnapshot`]. An inactive session never vibrates; the chain is
    /// kept alive only while nudges are enabled. An active session always
    /// re-arms, and vibrates only while nudges are enabled.
    pub fn on_alarm<S: KeyValueStore, D: Device>(
        &self,
        store: &PokusStore<S>,
        device: &D,
        now: DateTime<Utc>,
    ) -> NudgeOutcome {
        let snapshot = NudgeSnapshot::read(store, now);
        let vibrate = snapshot.session_active && snapshot.nudge_enabled;
        let rearm = snapshot.session_active || snapshot.nudge_enabled;

        if vibrate {
            device.vibrate(VibrationPattern::Nudge);
            info!(interval_minutes = snapshot.interval_minutes, "nudge sent");
        } else if !snapshot.session_active {
            info!("no active focus session, skipping nudge");
        } else {
            info!("nudges disabled, skipping vibration");
        }

        let rearmed = if rearm {
            self.arm(store, snapshot.interval_minutes)
        } else {
            // The alarm that fired was the pending one.
            if let Err(e) = store.clear_nudge_alarm() {
                warn!(error = %e, "failed to clear nudge alarm handle");
            }
            None
        };

        NudgeOutcome {
            session_active: snapshot.session_active,
            vibrated: vibrate,
            rearmed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::device::RecordingDevice;
    use crate::storage::{MemoryStore, Settings};
    use crate::timer::{save_session, SessionState};

    fn focus_running(store: &PokusStore<&MemoryStore>, clock: &ManualClock) {
        let state = SessionState::new(SessionMode::Focus, clock.now(), 1500, 0, false).unwrap();
        save_session(store, &state).unwrap();
    }

    #[test]
    fn arm_replaces_previous_alarm() {
        let clock = ManualClock::default();
        let alarms = InMemoryAlarms::new(clock.clone());
        let kv = MemoryStore::new();
        let store = PokusStore::new(&kv);
        let chain = NudgeChain::new(&alarms);

        let first = chain.arm(&store, 5).unwrap();
        let second = chain.arm(&store, 5).unwrap();

        assert!(!alarms.is_pending(&first));
        assert!(alarms.is_pending(&second));
        assert_eq!(alarms.pending().len(), 1);
        assert_eq!(store.nudge_alarm(), Some(second));
        assert_eq!(
            alarms.pending()[0].fire_at,
            clock.now() + chrono::Duration::minutes(5)
        );
    }

    #[test]
    fn cancel_without_handle_is_noop() {
        let alarms = InMemoryAlarms::new(ManualClock::default());
        let kv = MemoryStore::new();
        let store = PokusStore::new(&kv);
        NudgeChain::new(&alarms).cancel(&store);
        assert!(store.nudge_alarm().is_none());
    }

    #[test]
    fn scheduler_failure_is_swallowed() {
        let alarms = InMemoryAlarms::new(ManualClock::default());
        alarms.set_failing(true);
        let kv = MemoryStore::new();
        let store = PokusStore::new(&kv);
        assert!(NudgeChain::new(&alarms).arm(&store, 5).is_none());
        assert!(store.nudge_alarm().is_none());
    }

    #[test]
    fn active_session_vibrates_and_rearms() {
        let clock = ManualClock::default();
        let alarms = InMemoryAlarms::new(clock.clone());
        let kv = MemoryStore::new();
        let store = PokusStore::new(&kv);
        let device = RecordingDevice::new();
        let chain = NudgeChain::new(&alarms);
        focus_running(&store, &clock);
        chain.arm(&store, 5);

        clock.advance_secs(300);
        assert_eq!(alarms.take_due().len(), 1);
        let outcome = chain.on_alarm(&store, &device, clock.now());

        assert!(outcome.vibrated);
        assert_eq!(device.vibrations(), vec![VibrationPattern::Nudge]);
        let next = outcome.rearmed.unwrap();
        assert!(alarms.is_pending(&next));
        assert_eq!(store.nudge_alarm(), Some(next));
    }

    #[test]
    fn disabled_nudges_skip_vibration_but_keep_chain() {
        let clock = ManualClock::default();
        let alarms = InMemoryAlarms::new(clock.clone());
        let kv = MemoryStore::new();
        Settings {
            nudge_enabled: false,
            nudge_interval: 10,
            ..Settings::default()
        }
        .save(&kv)
        .unwrap();
        let store = PokusStore::new(&kv);
        let device = RecordingDevice::new();
        focus_running(&store, &clock);

        let outcome = NudgeChain::new(&alarms).on_alarm(&store, &device, clock.now());
        assert!(!outcome.vibrated);
        assert!(outcome.rearmed.is_some());
        assert!(device.vibrations().is_empty());
        assert_eq!(
            alarms.pending()[0].fire_at,
            clock.now() + chrono::Duration::minutes(10)
        );
    }

    #[test]
    fn inactive_session_never_vibrates() {
        let clock = ManualClock::default();
        let alarms = InMemoryAlarms::new(clock.clone());
        let kv = MemoryStore::new();
        let store = PokusStore::new(&kv);
        let device = RecordingDevice::new();
        let chain = NudgeChain::new(&alarms);

        let outcome = chain.on_alarm(&store, &device, clock.now());
        assert!(!outcome.session_active);
        assert!(!outcome.vibrated);
        assert!(outcome.rearmed.is_some());

        Settings {
            nudge_enabled: false,
            ..Settings::default()
        }
        .save(&kv)
        .unwrap();
        let outcome = chain.on_alarm(&store, &device, clock.now());
        assert!(outcome.rearmed.is_none());
        assert!(store.nudge_alarm().is_none());
        assert!(device.vibrations().is_empty());
    }

    #[test]
    fn expired_or_break_sessions_are_inactive() {
        let clock = ManualClock::default();
        let kv = MemoryStore::new();
        let store = PokusStore::new(&kv);
        focus_running(&store, &clock);
        clock.advance_secs(1500);
        assert!(!NudgeSnapshot::read(&store, clock.now()).session_active);

        let state = SessionState::new(SessionMode::Break, clock.now(), 300, 300, true).unwrap();
        save_session(&store, &state).unwrap();
        assert!(!NudgeSnapshot::read(&store, clock.now()).session_active);
    }
}
