//! SQLite-backed persistence.
//!
//! Provides durable storage for:
//! - Key-value entries (session state, progress, settings)
//! - Pending one-shot alarms for the nudge chain

use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rusqlite::{params, Connection};

use super::{data_dir, KeyValueStore};
use crate::error::{AlarmError, CoreError, StorageError};
use crate::nudge::{AlarmHandle, AlarmScheduler};

/// A pending alarm row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAlarm {
    pub handle: AlarmHandle,
    pub fire_at: DateTime<Utc>,
}

/// SQLite database for key-value state and scheduled alarms.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/pokus/pokus.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("pokus.db");
        Ok(Self::open_at(&path)?)
    }

    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS alarms (
                id         TEXT PRIMARY KEY,
                fire_at_ms INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_alarms_fire_at ON alarms(fire_at_ms);",
        )?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), rusqlite::Error> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Schedule an alarm at an absolute instant.
    pub fn schedule_alarm_at(&self, fire_at: DateTime<Utc>) -> Result<AlarmHandle, rusqlite::Error> {
        let handle = AlarmHandle::generate();
        self.conn.execute(
            "INSERT INTO alarms (id, fire_at_ms, created_at) VALUES (?1, ?2, ?3)",
            params![
                handle.as_str(),
                fire_at.timestamp_millis(),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(handle)
    }

    pub fn cancel_alarm(&self, handle: &AlarmHandle) -> Result<(), rusqlite::Error> {
        self.conn
            .execute("DELETE FROM alarms WHERE id = ?1", params![handle.as_str()])?;
        Ok(())
    }

    pub fn pending_alarms(&self) -> Result<Vec<PendingAlarm>, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, fire_at_ms FROM alarms ORDER BY fire_at_ms")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut alarms = Vec::new();
        for row in rows {
            let (id, fire_at_ms) = row?;
            alarms.push(PendingAlarm {
                handle: AlarmHandle::new(id),
                fire_at: Utc
                    .timestamp_millis_opt(fire_at_ms)
                    .single()
                    .unwrap_or_default(),
            });
        }
        Ok(alarms)
    }

    /// Remove and return every alarm due at `now`. Each alarm fires once.
    pub fn take_due_alarms(&self, now: DateTime<Utc>) -> Result<Vec<PendingAlarm>, rusqlite::Error> {
        let tx = self.conn.unchecked_transaction()?;
        let due: Vec<PendingAlarm> = self
            .pending_alarms()?
            .into_iter()
            .filter(|a| a.fire_at <= now)
            .collect();
        for alarm in &due {
            tx.execute(
                "DELETE FROM alarms WHERE id = ?1",
                params![alarm.handle.as_str()],
            )?;
        }
        tx.commit()?;
        Ok(due)
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.kv_get(key)?)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Ok(self.kv_set(key, value)?)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        Ok(self.kv_delete(key)?)
    }

    fn set_many(&self, entries: &[(String, Option<String>)]) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        for (key, value) in entries {
            match value {
                Some(v) => {
                    tx.execute(
                        "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                        params![key, v],
                    )?;
                }
                None => {
                    tx.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }
}

impl AlarmScheduler for Database {
    fn schedule(&self, delay_seconds: u64) -> Result<AlarmHandle, AlarmError> {
        let delay = Duration::seconds(delay_seconds.min(u64::from(u32::MAX)) as i64);
        Ok(self.schedule_alarm_at(Utc::now() + delay)?)
    }

    fn cancel(&self, handle: &AlarmHandle) -> Result<(), AlarmError> {
        self.cancel_alarm(handle)
            .map_err(|e| AlarmError::CancelFailed {
                handle: handle.to_string(),
                message: e.to_string(),
            })
    }
}
