//! Device hooks: haptics, display wake hint, background monitor.
//!
//! All calls are fire-and-forget. Implementations swallow their own
//! failures; the countdown never depends on a device call succeeding.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PulseKind {
    Urgent,
    StrongShort,
    Pause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pulse {
    pub kind: PulseKind,
    pub duration_ms: u32,
}

impl Pulse {
    const fn new(kind: PulseKind, duration_ms: u32) -> Self {
        Self { kind, duration_ms }
    }
}

/// Named vibration patterns. Each pattern stops on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VibrationPattern {
    /// Periodic reminder during focus.
    Nudge,
    SessionStart,
    SessionComplete,
    CatchSuccess,
    CatchFail,
    ButtonTap,
}

impl VibrationPattern {
    pub fn pulses(self) -> Vec<Pulse> {
        use PulseKind::{Pause, StrongShort, Urgent};
        match self {
            VibrationPattern::Nudge | VibrationPattern::SessionComplete => {
                vec![Pulse::new(Urgent, 300); 5]
            }
            VibrationPattern::SessionStart => vec![Pulse::new(Urgent, 250); 3],
            VibrationPattern::CatchSuccess => {
                let mut pulses = vec![Pulse::new(Urgent, 200); 5];
                pulses.push(Pulse::new(Pause, 150));
                pulses.extend([Pulse::new(Urgent, 400); 3]);
                pulses
            }
            VibrationPattern::CatchFail => vec![Pulse::new(StrongShort, 300); 3],
            VibrationPattern::ButtonTap => vec![Pulse::new(StrongShort, 150)],
        }
    }

    /// Total playback time in milliseconds.
    pub fn duration_ms(self) -> u32 {
        self.pulses().iter().map(|p| p.duration_ms).sum()
    }
}

pub trait Device {
    fn vibrate(&self, pattern: VibrationPattern);

    fn stop_vibration(&self) {}

    /// Relaunch the app when the display wakes while a session runs.
    fn set_wake_relaunch(&self, _enabled: bool) {}

    /// Start the background service that watches a running focus session.
    fn start_monitor(&self) {}

    fn stop_monitor(&self) {}
}

impl<T: Device + ?Sized> Device for &T {
    fn vibrate(&self, pattern: VibrationPattern) {
        (**self).vibrate(pattern)
    }

    fn stop_vibration(&self) {
        (**self).stop_vibration()
    }

    fn set_wake_relaunch(&self, enabled: bool) {
        (**self).set_wake_relaunch(enabled)
    }

    fn start_monitor(&self) {
        (**self).start_monitor()
    }

    fn stop_monitor(&self) {
        (**self).stop_monitor()
    }
}

impl<T: Device + ?Sized> Device for Rc<T> {
    fn vibrate(&self, pattern: VibrationPattern) {
        (**self).vibrate(pattern)
    }

    fn stop_vibration(&self) {
        (**self).stop_vibration()
    }

    fn set_wake_relaunch(&self, enabled: bool) {
        (**self).set_wake_relaunch(enabled)
    }

    fn start_monitor(&self) {
        (**self).start_monitor()
    }

    fn stop_monitor(&self) {
        (**self).stop_monitor()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCall {
    Vibrate(VibrationPattern),
    StopVibration,
    WakeRelaunch(bool),
    StartMonitor,
    StopMonitor,
}

/// Records every call, for assertions.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    calls: RefCell<Vec<DeviceCall>>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.borrow().clone()
    }

    pub fn vibrations(&self) -> Vec<VibrationPattern> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                DeviceCall::Vibrate(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: DeviceCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl Device for RecordingDevice {
    fn vibrate(&self, pattern: VibrationPattern) {
        self.record(DeviceCall::Vibrate(pattern));
    }

    fn stop_vibration(&self) {
        self.record(DeviceCall::StopVibration);
    }

    fn set_wake_relaunch(&self, enabled: bool) {
        self.record(DeviceCall::WakeRelaunch(enabled));
    }

    fn start_monitor(&self) {
        self.record(DeviceCall::StartMonitor);
    }

    fn stop_monitor(&self) {
        self.record(DeviceCall::StopMonitor);
    }
}
