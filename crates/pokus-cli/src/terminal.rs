//! Device hooks for a terminal.

use std::io::Write;

use pokus_core::{Device, VibrationPattern};
use tracing::debug;

/// Rings the terminal bell in place of vibration.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalDevice;

impl Device for TerminalDevice {
    fn vibrate(&self, pattern: VibrationPattern) {
        let mut err = std::io::stderr();
        let _ = write!(err, "\x07");
        let _ = err.flush();
        debug!(?pattern, duration_ms = pattern.duration_ms(), "vibration");
    }

    fn set_wake_relaunch(&self, enabled: bool) {
        debug!(enabled, "wake relaunch hint");
    }
}
