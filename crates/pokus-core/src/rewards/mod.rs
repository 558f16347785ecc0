//! Reward and progress accounting.
//!
//! A completed focus session credits four values at once: today's history
//! bucket, the all-time total, the coin balance and the banked focus time
//! that pays for encounters. All arithmetic is in whole seconds; coins are
//! only granted for full blocks.

mod history;
pub mod stats;

pub use history::{DayFocus, FocusHistory, HISTORY_DAYS};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::storage::{DataKey, GameConfig, KeyValueStore, PokusStore};

/// Balances after a credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credit {
    pub seconds: u64,
    pub coins_earned: u64,
    pub coins: u64,
    pub accumulated_focus: u64,
    pub total_focus: u64,
    pub today_focus: u64,
}

/// Read and update progress in the active data namespace.
pub struct Rewards<'a, S> {
    store: &'a PokusStore<S>,
    game: &'a GameConfig,
}

impl<'a, S: KeyValueStore> Rewards<'a, S> {
    pub fn new(store: &'a PokusStore<S>, game: &'a GameConfig) -> Self {
        Self { store, game }
    }

    pub fn coins(&self) -> u64 {
        self.store.coins()
    }

    pub fn accumulated_focus(&self) -> u64 {
        self.store.accumulated_focus()
    }

    pub fn history(&self) -> FocusHistory {
        self.store
            .read_json(DataKey::FocusHistory)
            .unwrap_or_default()
    }

    /// All-time focus seconds, never less than what the history accounts for.
    pub fn total_focus(&self) -> u64 {
        let stored = self.store.total_focus();
        let floor = self.history().sum();
        if stored < floor {
            warn!(stored, floor, "total focus below history sum, raising");
        }
        stored.max(floor)
    }

    /// Writes for crediting `seconds` of focus on `today`, plus the
    /// resulting balances. Nothing is written.
    pub fn credit_batch(
        &self,
        seconds: u64,
        today: NaiveDate,
    ) -> Result<(Vec<(String, Option<String>)>, Credit), StorageError> {
        let mut history = self.history();
        let total_focus = self.total_focus().saturating_add(seconds);
        history.add(today, seconds);

        let coins_earned = (seconds / self.game.encounter_threshold_secs.max(1))
            .saturating_mul(self.game.coins_per_block);
        let coins = self.coins().saturating_add(coins_earned);
        let accumulated_focus = self.accumulated_focus().saturating_add(seconds);

        let batch = vec![
            self.store.entry(DataKey::FocusHistory, &history)?,
            self.store.entry(DataKey::TotalFocus, &total_focus)?,
            self.store.entry(DataKey::Coins, &coins)?,
            self.store.entry(DataKey::AccumulatedFocus, &accumulated_focus)?,
        ];
        let credit = Credit {
            seconds,
            coins_earned,
            coins,
            accumulated_focus,
            total_focus,
            today_focus: history.get(today),
        };
        Ok((batch, credit))
    }

    /// Credit a finished focus session in one write.
    pub fn credit_focus_seconds(
        &self,
        seconds: u64,
        today: NaiveDate,
    ) -> Result<Credit, StorageError> {
        let (batch, credit) = self.credit_batch(seconds, today)?;
        self.store.apply(&batch)?;
        info!(
            seconds,
            coins_earned = credit.coins_earned,
            accumulated = credit.accumulated_focus,
            "focus credited"
        );
        Ok(credit)
    }

    /// Full encounters paid for by banked focus. Read-only.
    pub fn claim_encounter_eligibility(&self, threshold_secs: u64) -> u64 {
        if threshold_secs == 0 {
            return 0;
        }
        self.accumulated_focus() / threshold_secs
    }

    /// Spend one encounter's worth of banked focus, never going below zero.
    pub fn deduct(&self, threshold_secs: u64) -> Result<u64, StorageError> {
        let remaining = self.accumulated_focus().saturating_sub(threshold_secs);
        self.store
            .write_json(DataKey::AccumulatedFocus, &remaining)?;
        debug!(threshold_secs, remaining, "banked focus deducted");
        Ok(remaining)
    }

    /// The last seven calendar days, oldest first.
    pub fn weekly_focus(&self, today: NaiveDate) -> Vec<DayFocus> {
        self.history().week_ending(today)
    }

    pub fn weekly_total(&self, today: NaiveDate) -> u64 {
        self.weekly_focus(today)
            .iter()
            .map(|d| d.seconds)
            .fold(0, u64::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 7).unwrap()
    }

    #[test]
    fn partial_blocks_earn_no_coins() {
        let kv = MemoryStore::new();
        let store = PokusStore::new(&kv);
        let game = GameConfig::default();
        let rewards = Rewards::new(&store, &game);

        let credit = rewards.credit_focus_seconds(299, today()).unwrap();
        assert_eq!(credit.coins_earned, 0);
        let credit = rewards.credit_focus_seconds(900, today()).unwrap();
        assert_eq!(credit.coins_earned, 3);
        assert_eq!(rewards.coins(), 3);
        assert_eq!(rewards.accumulated_focus(), 1199);
        assert_eq!(rewards.history().get(today()), 1199);
        assert_eq!(rewards.total_focus(), 1199);
    }

    #[test]
    fn total_is_raised_to_history_sum() {
        let kv = MemoryStore::new();
        kv.set("pokus_focus_history", r#"{"2025-12-06":600,"2025-12-07":300}"#)
            .unwrap();
        kv.set("pokus_total_focus", "100").unwrap();
        let store = PokusStore::new(&kv);
        let game = GameConfig::default();
        let rewards = Rewards::new(&store, &game);
        assert_eq!(rewards.total_focus(), 900);
        let credit = rewards.credit_focus_seconds(60, today()).unwrap();
        assert_eq!(credit.total_focus, 960);
    }

    #[test]
    fn corrupt_history_reads_empty() {
        let kv = MemoryStore::new();
        kv.set("pokus_focus_history", r#"{"yesterday":"lots"}"#)
            .unwrap();
        let store = PokusStore::new(&kv);
        let game = GameConfig::default();
        assert!(Rewards::new(&store, &game).history().is_empty());
    }

    #[test]
    fn overflowing_history_saturates() {
        let kv = MemoryStore::new();
        kv.set(
            "pokus_focus_history",
            r#"{"2025-12-06":18446744073709551615,"2025-12-07":1}"#,
        )
        .unwrap();
        let store = PokusStore::new(&kv);
        let game = GameConfig::default();
        let rewards = Rewards::new(&store, &game);
        assert_eq!(rewards.history().sum(), u64::MAX);
        assert_eq!(rewards.total_focus(), u64::MAX);
        assert_eq!(rewards.weekly_total(today()), u64::MAX);

        let credit = rewards.credit_focus_seconds(300, today()).unwrap();
        assert_eq!(credit.total_focus, u64::MAX);
        assert_eq!(credit.today_focus, 301);
    }

    #[test]
    fn credit_batch_writes_nothing() {
        let kv = MemoryStore::new();
        let store = PokusStore::new(&kv);
        let game = GameConfig::default();
        let (batch, credit) = Rewards::new(&store, &game)
            .credit_batch(600, today())
            .unwrap();
        assert_eq!(batch.len(), 4);
        assert_eq!(credit.coins, 2);
        assert!(kv.is_empty());
    }

    #[test]
    fn weekly_total_ignores_older_days() {
        let kv = MemoryStore::new();
        kv.set(
            "pokus_focus_history",
            r#"{"2025-11-30":5000,"2025-12-01":60,"2025-12-07":120}"#,
        )
        .unwrap();
        let store = PokusStore::new(&kv);
        let game = GameConfig::default();
        let rewards = Rewards::new(&store, &game);
        assert_eq!(rewards.weekly_total(today()), 180);
    }
}
