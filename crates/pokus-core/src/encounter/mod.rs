//! The catch minigame.
//!
//! An encounter is bought with banked focus time. The species and its shiny
//! flag are fixed when the encounter starts; the player then gets exactly one
//! throw, whose success depends on where the timing cursor stopped.
//!
//! ## State Transitions
//!
//! ```text
//! Aiming -> Resolving -> Resolved
//! ```

mod pokedex;
mod timing;

pub use pokedex::{Pokedex, Species, FALLBACK_SPECIES_ID};
pub use timing::{shiny_chance, TimingBar, TimingCursor};

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::events::Event;
use crate::rewards::Rewards;
use crate::storage::{Config, DataKey, GameConfig, KeyValueStore, PokusStore};

/// The persisted outcome of one throw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterResult {
    pub id: u16,
    pub name: String,
    pub type_id: u8,
    pub type_id2: u8,
    pub shiny: bool,
    pub caught: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EncounterPhase {
    Aiming,
    Resolving,
    Resolved,
}

/// One encounter attempt.
#[derive(Debug, Clone)]
pub struct Encounter {
    species: Species,
    shiny: bool,
    shiny_chance: f64,
    bar: TimingBar,
    phase: EncounterPhase,
    catch_chance: Option<f64>,
    result: Option<EncounterResult>,
}

impl Encounter {
    /// Set up an encounter. The shiny draw happens here, before any throw.
    pub fn new<R: Rng>(
        species: Species,
        focus_seconds: u64,
        game: &GameConfig,
        rng: &mut R,
    ) -> Self {
        let shiny_chance = shiny_chance(focus_seconds, game);
        let shiny = rng.gen::<f64>() < shiny_chance;
        debug!(species = %species.name, shiny, shiny_chance, "encounter started");
        Self {
            species,
            shiny,
            shiny_chance,
            bar: TimingBar::from_config(game),
            phase: EncounterPhase::Aiming,
            catch_chance: None,
            result: None,
        }
    }

    pub fn species(&self) -> &Species {
        &self.species
    }

    pub fn is_shiny(&self) -> bool {
        self.shiny
    }

    pub fn shiny_chance(&self) -> f64 {
        self.shiny_chance
    }

    pub fn bar(&self) -> &TimingBar {
        &self.bar
    }

    pub fn phase(&self) -> EncounterPhase {
        self.phase
    }

    pub fn result(&self) -> Option<&EncounterResult> {
        self.result.as_ref()
    }

    /// Throw at the cursor position. Only the first throw counts.
    ///
    /// The result is written as the last result; a catch also adds the
    /// species to the collection. Storage failures are logged and the
    /// encounter still resolves.
    pub fn throw<S: KeyValueStore, R: Rng>(
        &mut self,
        position: f64,
        rng: &mut R,
        store: &PokusStore<S>,
    ) -> Option<EncounterResult> {
        if self.phase != EncounterPhase::Aiming {
            return None;
        }
        self.phase = EncounterPhase::Resolving;

        let chance = self.bar.catch_chance(position);
        let caught = rng.gen::<f64>() < chance;
        let result = EncounterResult {
            id: self.species.id,
            name: self.species.name.clone(),
            type_id: self.species.type_id,
            type_id2: self.species.type_id2,
            shiny: self.shiny,
            caught,
        };
        info!(
            species = %result.name,
            position,
            chance,
            caught,
            shiny = result.shiny,
            "throw resolved"
        );

        if let Err(e) = Collection::new(store).record(&result) {
            warn!(error = %e, "failed to record encounter result");
        }
        self.catch_chance = Some(chance);
        self.result = Some(result.clone());
        self.phase = EncounterPhase::Resolved;
        Some(result)
    }

    pub fn resolved_event(&self, at: DateTime<Utc>) -> Option<Event> {
        let result = self.result.as_ref()?;
        Some(Event::EncounterResolved {
            species_id: result.id,
            name: result.name.clone(),
            shiny: result.shiny,
            caught: result.caught,
            catch_chance: self.catch_chance.unwrap_or(0.0),
            at,
        })
    }
}

/// Pay for and set up an encounter if enough focus is banked.
///
/// `session_seconds` is the length of the last completed focus session and
/// sets the shiny odds; the banked balance only pays for entry.
///
/// Returns `Ok(None)` without touching storage when the balance does not
/// cover one encounter.
pub fn start_encounter<S: KeyValueStore, R: Rng>(
    store: &PokusStore<S>,
    config: &Config,
    pokedex: &Pokedex,
    session_seconds: u64,
    rng: &mut R,
) -> Result<Option<Encounter>, StorageError> {
    let developer_mode = store.developer_mode();
    let game = config.game_for(developer_mode);
    let threshold = game.encounter_threshold_secs;
    let rewards = Rewards::new(store, &game);

    if rewards.claim_encounter_eligibility(threshold) == 0 {
        debug!(threshold, "not enough banked focus for an encounter");
        return Ok(None);
    }
    let limit = developer_mode.then_some(config.developer.pokedex_limit);
    let Some(species) = pokedex.random(limit, rng).cloned() else {
        warn!("no species available for an encounter");
        return Ok(None);
    };
    rewards.deduct(threshold)?;
    Ok(Some(Encounter::new(species, session_seconds, &game, rng)))
}

/// The permanent collection and the last result.
pub struct Collection<'a, S> {
    store: &'a PokusStore<S>,
}

impl<'a, S: KeyValueStore> Collection<'a, S> {
    pub fn new(store: &'a PokusStore<S>) -> Self {
        Self { store }
    }

    pub fn caught(&self) -> BTreeSet<u16> {
        self.store.read_json(DataKey::Caught).unwrap_or_default()
    }

    /// Always a subset of [`Collection::caught`].
    pub fn shiny(&self) -> BTreeSet<u16> {
        self.store.read_json(DataKey::Shiny).unwrap_or_default()
    }

    pub fn last_result(&self) -> Option<EncounterResult> {
        self.store.read_json(DataKey::LastResult)
    }

    /// Write the last result and, on a catch, add to the collection.
    pub fn record(&self, result: &EncounterResult) -> Result<(), StorageError> {
        let mut batch = vec![self.store.entry(DataKey::LastResult, result)?];
        if result.caught {
            let mut caught = self.caught();
            if caught.insert(result.id) {
                batch.push(self.store.entry(DataKey::Caught, &caught)?);
            }
            if result.shiny {
                let mut shiny = self.shiny();
                if shiny.insert(result.id) {
                    batch.push(self.store.entry(DataKey::Shiny, &shiny)?);
                }
            }
        }
        self.store.apply(&batch)
    }
}
