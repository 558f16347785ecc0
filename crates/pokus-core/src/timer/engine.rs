//! Session controller.
//!
//! A wall-clock state machine over one focus or break session. It does not
//! use internal threads; the caller calls `tick()` for display refresh and
//! `recover()` whenever it becomes active again. Completion is derived from
//! `end_time`, so a missed tick can delay it but never lose it.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Completed -> (Idle | Running)
//!            |
//!            +-> Idle (cancel)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut controller = SessionController::new(store, SystemClock, alarms, device, game);
//! match controller.recover() {
//!     Recovery::NoSession => { controller.start(StartRequest::focus(1500))?; }
//!     Recovery::Running(_) => {}
//!     Recovery::Completed(done) => show(done),
//! }
//! // In a loop:
//! controller.tick(); // Returns Some(Completion) exactly once
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::flow::suggested_break_seconds;
use super::session::{load_session, save_session, SessionMode, SessionState};
use crate::clock::Clock;
use crate::device::{Device, VibrationPattern};
use crate::error::ValidationError;
use crate::events::Event;
use crate::nudge::{AlarmScheduler, NudgeChain, NudgeOutcome};
use crate::rewards::{Credit, Rewards};
use crate::storage::{DataKey, GameConfig, KeyValueStore, PokusStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    Running,
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Idle,
    Running(SessionState),
    /// Holds the finished session until the user picks the next action.
    Completed(SessionState),
}

/// Parameters for a new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartRequest {
    pub mode: SessionMode,
    pub duration_seconds: u64,
    pub base_duration_seconds: u64,
    pub can_extend: bool,
}

impl StartRequest {
    pub fn focus(duration_seconds: u64) -> Self {
        Self {
            mode: SessionMode::Focus,
            duration_seconds,
            base_duration_seconds: 0,
            can_extend: false,
        }
    }

    /// A break, extendable once by half its length.
    pub fn rest(duration_seconds: u64) -> Self {
        Self {
            mode: SessionMode::Break,
            duration_seconds,
            base_duration_seconds: duration_seconds,
            can_extend: true,
        }
    }

    pub fn new(mode: SessionMode, duration_seconds: u64) -> Self {
        match mode {
            SessionMode::Focus => Self::focus(duration_seconds),
            SessionMode::Break => Self::rest(duration_seconds),
        }
    }
}

/// A finished session and what finishing it credited.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub session: SessionState,
    /// Present for focus sessions whose credit was written.
    pub credit: Option<Credit>,
    pub recovered: bool,
    pub event: Event,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Recovery {
    NoSession,
    Running(Event),
    Completed(Completion),
}

/// Owns everything one activation needs to drive a session.
pub struct SessionController<S, C, A, D> {
    store: PokusStore<S>,
    clock: C,
    nudges: NudgeChain<A>,
    device: D,
    game: GameConfig,
    phase: Phase,
}

impl<S, C, A, D> SessionController<S, C, A, D>
where
    S: KeyValueStore,
    C: Clock,
    A: AlarmScheduler,
    D: Device,
{
    pub fn new(store: PokusStore<S>, clock: C, scheduler: A, device: D, game: GameConfig) -> Self {
        Self {
            store,
            clock,
            nudges: NudgeChain::new(scheduler),
            device,
            game,
            phase: Phase::Idle,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> SessionPhase {
        match self.phase {
            Phase::Idle => SessionPhase::Idle,
            Phase::Running(_) => SessionPhase::Running,
            Phase::Completed(_) => SessionPhase::Completed,
        }
    }

    /// The running or just-completed session.
    pub fn session(&self) -> Option<&SessionState> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Running(s) | Phase::Completed(s) => Some(s),
        }
    }

    pub fn store(&self) -> &PokusStore<S> {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn nudges(&self) -> &NudgeChain<A> {
        &self.nudges
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn game(&self) -> &GameConfig {
        &self.game
    }

    pub fn rewards(&self) -> Rewards<'_, S> {
        Rewards::new(&self.store, &self.game)
    }

    /// Seconds left in the running session; zero once completed.
    pub fn remaining_seconds(&self) -> Option<u64> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Running(s) => Some(s.remaining_seconds(self.clock.now())),
            Phase::Completed(_) => Some(0),
        }
    }

    /// The finished session is a break that has not been extended yet.
    pub fn can_extend(&self) -> bool {
        matches!(&self.phase, Phase::Completed(s) if s.mode == SessionMode::Break && s.can_extend)
    }

    /// Flowmodoro break offered after a completed focus session.
    pub fn suggested_break(&self) -> Option<u64> {
        match &self.phase {
            Phase::Completed(s) if s.mode == SessionMode::Focus => {
                suggested_break_seconds(s.duration_seconds, self.store.settings().flow_ratio)
            }
            _ => None,
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let session = self.session();
        let total_secs = session.map(|s| s.duration_seconds).unwrap_or(0);
        let remaining_secs = self.remaining_seconds().unwrap_or(0);
        let progress = match &self.phase {
            Phase::Idle => 0.0,
            Phase::Running(s) => s.progress(self.clock.now()),
            Phase::Completed(_) => 1.0,
        };
        Event::StateSnapshot {
            phase: self.phase(),
            mode: session.map(|s| s.mode),
            remaining_secs,
            total_secs,
            progress_pct: progress * 100.0,
            can_extend: self.can_extend(),
            at: self.clock.now(),
        }
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Start a new session, replacing whatever was there.
    pub fn start(&mut self, request: StartRequest) -> Result<Event, ValidationError> {
        if request.duration_seconds == 0 {
            return Err(ValidationError::ZeroDuration);
        }
        let event = self.begin(request)?;
        if let Err(e) = self
            .store
            .push_recent_timer(request.mode, request.duration_seconds)
        {
            warn!(error = %e, "failed to record recent timer");
        }
        Ok(event)
    }

    /// Pick up whatever the last activation left behind.
    ///
    /// An expired session completes here with the same side effects as a
    /// live completion. Its record is cleared in the same write as the
    /// credit, so a second recovery finds nothing.
    pub fn recover(&mut self) -> Recovery {
        let now = self.clock.now();
        let Some(state) = load_session(&self.store) else {
            if matches!(self.phase, Phase::Running(_)) {
                debug!("running session no longer persisted, returning to idle");
                self.phase = Phase::Idle;
            }
            return Recovery::NoSession;
        };

        if state.is_expired(now) {
            info!(mode = %state.mode, "recovered an expired session");
            return Recovery::Completed(self.complete(state, true));
        }

        let remaining_secs = state.remaining_seconds(now);
        if state.mode == SessionMode::Focus {
            self.device.start_monitor();
            if self.store.nudge_alarm().is_none() {
                self.nudges.arm(&self.store, self.store.settings().nudge_interval);
            }
        }
        self.device.set_wake_relaunch(true);
        info!(mode = %state.mode, remaining_secs, "session resumed");
        let event = Event::SessionResumed {
            mode: state.mode,
            remaining_secs,
            at: now,
        };
        self.phase = Phase::Running(state);
        Recovery::Running(event)
    }

    /// Advisory refresh. Returns the completion the first time the running
    /// session is found finished.
    pub fn tick(&mut self) -> Option<Completion> {
        let Phase::Running(state) = &self.phase else {
            return None;
        };
        if !state.is_expired(self.clock.now()) {
            return None;
        }
        let state = state.clone();
        Some(self.complete(state, false))
    }

    /// Abandon the running session without reward.
    pub fn cancel(&mut self) -> Option<Event> {
        let Phase::Running(state) = &self.phase else {
            return None;
        };
        let state = state.clone();
        let now = self.clock.now();

        if let Err(e) = self.store.clear(DataKey::TimerState) {
            warn!(error = %e, "failed to clear session record");
        }
        if state.mode == SessionMode::Focus {
            self.nudges.cancel(&self.store);
            self.device.stop_monitor();
        }
        self.device.set_wake_relaunch(false);
        self.phase = Phase::Idle;

        let remaining_secs = state.remaining_seconds(now);
        info!(mode = %state.mode, remaining_secs, "session cancelled");
        Some(Event::SessionCancelled {
            mode: state.mode,
            remaining_secs,
            at: now,
        })
    }

    /// Run a finished break again for half its base length. Allowed once.
    pub fn extend(&mut self) -> Option<Event> {
        let Phase::Completed(state) = &self.phase else {
            return None;
        };
        if state.mode != SessionMode::Break || !state.can_extend {
            return None;
        }
        let extension_secs = state.extension_seconds();
        if extension_secs == 0 {
            return None;
        }
        let request = StartRequest {
            mode: SessionMode::Break,
            duration_seconds: extension_secs,
            base_duration_seconds: state.base_duration_seconds,
            can_extend: false,
        };
        if let Err(e) = self.begin(request) {
            warn!(error = %e, "break extension rejected");
            return None;
        }
        info!(extension_secs, "break extended");
        Some(Event::SessionExtended {
            extension_secs,
            at: self.clock.now(),
        })
    }

    /// Start the finished session over with the same settings.
    pub fn restart_same_duration(&mut self) -> Option<Event> {
        let Phase::Completed(state) = &self.phase else {
            return None;
        };
        let request = StartRequest {
            mode: state.mode,
            duration_seconds: state.duration_seconds,
            base_duration_seconds: state.base_duration_seconds,
            can_extend: state.can_extend,
        };
        match self.begin(request) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(error = %e, "restart rejected");
                None
            }
        }
    }

    /// Leave the completion screen.
    pub fn return_to_idle(&mut self) -> bool {
        if !matches!(self.phase, Phase::Completed(_)) {
            return false;
        }
        self.device.stop_vibration();
        self.phase = Phase::Idle;
        true
    }

    /// Handle a fired nudge alarm for this activation.
    pub fn on_alarm(&self) -> NudgeOutcome {
        self.nudges
            .on_alarm(&self.store, &self.device, self.clock.now())
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Replace the current phase with a new running session. Nothing is
    /// touched when the end time cannot be represented.
    fn begin(&mut self, request: StartRequest) -> Result<Event, ValidationError> {
        let now = self.clock.now();
        let state = SessionState::new(
            request.mode,
            now,
            request.duration_seconds,
            request.base_duration_seconds,
            request.can_extend,
        )
        .ok_or(ValidationError::DurationTooLong(request.duration_seconds))?;

        self.device.stop_vibration();
        if let Err(e) = save_session(&self.store, &state) {
            warn!(error = %e, "failed to persist session, continuing in memory");
        }

        let was_focus = matches!(&self.phase, Phase::Running(s) if s.mode == SessionMode::Focus);
        match state.mode {
            SessionMode::Focus => {
                self.nudges
                    .arm(&self.store, self.store.settings().nudge_interval);
                self.device.start_monitor();
            }
            SessionMode::Break => {
                self.nudges.cancel(&self.store);
                if was_focus {
                    self.device.stop_monitor();
                }
            }
        }
        self.device.set_wake_relaunch(true);

        info!(
            mode = %state.mode,
            duration_secs = state.duration_seconds,
            "session started"
        );
        let event = Event::SessionStarted {
            mode: state.mode,
            duration_secs: state.duration_seconds,
            can_extend: state.can_extend,
            ends_at: state.end_time,
            at: now,
        };
        self.phase = Phase::Running(state);
        Ok(event)
    }

    fn complete(&mut self, state: SessionState, recovered: bool) -> Completion {
        let now = self.clock.now();
        let clear = self.store.removal(DataKey::TimerState);

        let credit = match state.mode {
            SessionMode::Focus => {
                let rewards = Rewards::new(&self.store, &self.game);
                let credited = rewards
                    .credit_batch(state.duration_seconds, self.clock.today())
                    .and_then(|(mut batch, credit)| {
                        batch.push(
                            self.store
                                .entry(DataKey::LastSessionSeconds, &state.duration_seconds)?,
                        );
                        batch.push(clear);
                        self.store.apply(&batch)?;
                        Ok(credit)
                    });
                match credited {
                    Ok(credit) => Some(credit),
                    Err(e) => {
                        warn!(error = %e, "failed to credit focus session");
                        None
                    }
                }
            }
            SessionMode::Break => {
                if let Err(e) = self.store.apply(&[clear]) {
                    warn!(error = %e, "failed to clear session record");
                }
                None
            }
        };

        if state.mode == SessionMode::Focus {
            self.nudges.cancel(&self.store);
            self.device.stop_monitor();
        }
        self.device.set_wake_relaunch(false);
        self.device.vibrate(VibrationPattern::SessionComplete);

        info!(
            mode = %state.mode,
            duration_secs = state.duration_seconds,
            recovered,
            "session completed"
        );
        let event = Event::SessionCompleted {
            mode: state.mode,
            duration_secs: state.duration_seconds,
            coins_earned: credit.as_ref().map(|c| c.coins_earned).unwrap_or(0),
            accumulated_focus: credit
                .as_ref()
                .map(|c| c.accumulated_focus)
                .unwrap_or_else(|| self.store.accumulated_focus()),
            recovered,
            at: now,
        };
        self.phase = Phase::Completed(state.clone());
        Completion {
            session: state,
            credit,
            recovered,
            event,
        }
    }
}
