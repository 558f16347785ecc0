//! Typed, namespaced access to the key-value store.
//!
//! Every read tolerates missing or malformed values: the caller gets the
//! documented default and a warning is logged. Nothing read from storage is
//! ever propagated as a hard failure.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::keys::DataKey;
use super::{KeyValueStore, Settings};
use crate::error::StorageError;
use crate::nudge::AlarmHandle;
use crate::timer::SessionMode;

/// Writes applied together by [`KeyValueStore::set_many`].
pub type Batch = Vec<(String, Option<String>)>;

const MAX_RECENT_TIMERS: usize = 3;

/// Namespaced view over a [`KeyValueStore`].
///
/// The developer-mode flag is read once at construction; a store handle
/// belongs to a single activation.
pub struct PokusStore<S> {
    kv: S,
    developer_mode: bool,
}

impl<S: KeyValueStore> PokusStore<S> {
    pub fn new(kv: S) -> Self {
        let developer_mode = Settings::developer_mode(&kv);
        Self { kv, developer_mode }
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    pub fn developer_mode(&self) -> bool {
        self.developer_mode
    }

    pub fn settings(&self) -> Settings {
        Settings::load(&self.kv)
    }

    /// Physical key for a data entry in the active namespace.
    pub fn key(&self, key: DataKey) -> String {
        key.key(self.developer_mode)
    }

    pub fn read_raw(&self, key: DataKey) -> Option<String> {
        match self.kv.get(&self.key(key)) {
            Ok(value) => value.filter(|v| v != "null"),
            Err(e) => {
                warn!(key = ?key, error = %e, "storage read failed, using default");
                None
            }
        }
    }

    pub fn read_json<T: DeserializeOwned>(&self, key: DataKey) -> Option<T> {
        let raw = self.read_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = ?key, error = %e, "malformed stored value, using default");
                None
            }
        }
    }

    pub fn read_u64(&self, key: DataKey) -> u64 {
        self.read_json::<u64>(key).unwrap_or(0)
    }

    /// Encode a value as a batch entry for `key`.
    pub fn entry<T: Serialize>(
        &self,
        key: DataKey,
        value: &T,
    ) -> Result<(String, Option<String>), StorageError> {
        let physical = self.key(key);
        let encoded = serde_json::to_string(value).map_err(|e| StorageError::Encode {
            key: physical.clone(),
            message: e.to_string(),
        })?;
        Ok((physical, Some(encoded)))
    }

    pub fn removal(&self, key: DataKey) -> (String, Option<String>) {
        (self.key(key), None)
    }

    pub fn write_json<T: Serialize>(&self, key: DataKey, value: &T) -> Result<(), StorageError> {
        let (physical, encoded) = self.entry(key, value)?;
        self.kv.set(&physical, encoded.as_deref().unwrap_or("null"))
    }

    pub fn clear(&self, key: DataKey) -> Result<(), StorageError> {
        self.kv.remove(&self.key(key))
    }

    pub fn apply(&self, batch: &[(String, Option<String>)]) -> Result<(), StorageError> {
        self.kv.set_many(batch)
    }

    // ── Scalars ──────────────────────────────────────────────────────

    pub fn coins(&self) -> u64 {
        self.read_u64(DataKey::Coins)
    }

    pub fn accumulated_focus(&self) -> u64 {
        self.read_u64(DataKey::AccumulatedFocus)
    }

    pub fn total_focus(&self) -> u64 {
        self.read_u64(DataKey::TotalFocus)
    }

    /// Length of the most recently completed focus session.
    pub fn last_session_seconds(&self) -> u64 {
        self.read_u64(DataKey::LastSessionSeconds)
    }

    // ── Nudge alarm handle ───────────────────────────────────────────

    pub fn nudge_alarm(&self) -> Option<AlarmHandle> {
        self.read_json::<AlarmHandle>(DataKey::NudgeAlarm)
            .filter(|h| !h.as_str().is_empty())
    }

    pub fn save_nudge_alarm(&self, handle: &AlarmHandle) -> Result<(), StorageError> {
        self.write_json(DataKey::NudgeAlarm, handle)
    }

    pub fn clear_nudge_alarm(&self) -> Result<(), StorageError> {
        self.clear(DataKey::NudgeAlarm)
    }

    // ── Recent timers ────────────────────────────────────────────────

    fn recent_key(mode: SessionMode) -> DataKey {
        match mode {
            SessionMode::Focus => DataKey::RecentFocus,
            SessionMode::Break => DataKey::RecentBreak,
        }
    }

    /// Recent durations for a mode, most recent first.
    pub fn recent_timers(&self, mode: SessionMode) -> Vec<u64> {
        self.read_json(Self::recent_key(mode)).unwrap_or_default()
    }

    /// Record a duration as most recent, deduplicated, keeping three.
    pub fn push_recent_timer(&self, mode: SessionMode, seconds: u64) -> Result<(), StorageError> {
        let mut recent: Vec<u64> = self
            .recent_timers(mode)
            .into_iter()
            .filter(|s| *s != seconds)
            .collect();
        recent.insert(0, seconds);
        recent.truncate(MAX_RECENT_TIMERS);
        debug!(?mode, seconds, ?recent, "recent timers updated");
        self.write_json(Self::recent_key(mode), &recent)
    }

    // ── Reset ────────────────────────────────────────────────────────

    /// Clear all progress in the active namespace. Settings are kept.
    pub fn reset_progress(&self) -> Result<(), StorageError> {
        let batch: Batch = DataKey::ALL.iter().map(|k| self.removal(*k)).collect();
        self.apply(&batch)?;
        debug!(developer_mode = self.developer_mode, "progress reset");
        Ok(())
    }
}
