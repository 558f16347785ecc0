//! Species catalog.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Species shown when the catalog has nothing to offer.
pub const FALLBACK_SPECIES_ID: u16 = 25;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Species {
    pub id: u16,
    pub name: String,
    pub type_id: u8,
    /// Zero for single-type species.
    pub type_id2: u8,
}

impl Species {
    fn new(id: u16, name: &str, type_id: u8, type_id2: u8) -> Self {
        Self {
            id,
            name: name.to_string(),
            type_id,
            type_id2,
        }
    }

    pub fn is_dual_type(&self) -> bool {
        self.type_id2 > 0
    }
}

/// Species that can appear in encounters, ordered by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pokedex {
    species: Vec<Species>,
}

impl Default for Pokedex {
    fn default() -> Self {
        Self::starter()
    }
}

impl Pokedex {
    pub fn new(mut species: Vec<Species>) -> Self {
        species.sort_by_key(|s| s.id);
        species.dedup_by_key(|s| s.id);
        Self { species }
    }

    /// The built-in catalog.
    pub fn starter() -> Self {
        Self::new(vec![
            Species::new(1, "Bulbasaur", 12, 4),
            Species::new(2, "Ivysaur", 12, 4),
            Species::new(3, "Venusaur", 12, 4),
            Species::new(4, "Charmander", 10, 0),
            Species::new(5, "Charmeleon", 10, 0),
            Species::new(6, "Charizard", 10, 3),
            Species::new(7, "Squirtle", 11, 0),
            Species::new(8, "Wartortle", 11, 0),
            Species::new(9, "Blastoise", 11, 0),
            Species::new(10, "Caterpie", 7, 0),
            Species::new(11, "Metapod", 7, 0),
            Species::new(12, "Butterfree", 7, 3),
            Species::new(13, "Weedle", 7, 4),
            Species::new(14, "Kakuna", 7, 4),
            Species::new(15, "Beedrill", 7, 4),
            Species::new(16, "Pidgey", 1, 3),
            Species::new(17, "Pidgeotto", 1, 3),
            Species::new(18, "Pidgeot", 1, 3),
            Species::new(19, "Rattata", 1, 0),
            Species::new(20, "Raticate", 1, 0),
            Species::new(21, "Spearow", 1, 3),
            Species::new(22, "Fearow", 1, 3),
            Species::new(23, "Ekans", 4, 0),
            Species::new(24, "Arbok", 4, 0),
            Species::new(25, "Pikachu", 13, 0),
        ])
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Species> {
        self.species.iter()
    }

    /// Lookup over the whole catalog, whatever the active limit.
    pub fn by_id(&self, id: u16) -> Option<&Species> {
        self.species.iter().find(|s| s.id == id)
    }

    /// The species eligible to appear, optionally only the first `limit`.
    pub fn available(&self, limit: Option<usize>) -> &[Species] {
        match limit {
            Some(n) => &self.species[..n.min(self.species.len())],
            None => &self.species,
        }
    }

    /// Pick a species uniformly from the available ones.
    pub fn random<R: Rng>(&self, limit: Option<usize>, rng: &mut R) -> Option<&Species> {
        let pool = self.available(limit);
        if pool.is_empty() {
            return self.by_id(FALLBACK_SPECIES_ID);
        }
        Some(&pool[rng.gen_range(0..pool.len())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    #[test]
    fn limit_restricts_random_pick() {
        let dex = Pokedex::starter();
        let mut rng = Pcg64::seed_from_u64(7);
        for _ in 0..200 {
            let species = dex.random(Some(20), &mut rng).unwrap();
            assert!(species.id <= 20);
        }
    }

    #[test]
    fn empty_pool_falls_back() {
        let dex = Pokedex::starter();
        let mut rng = Pcg64::seed_from_u64(7);
        assert_eq!(dex.random(Some(0), &mut rng).unwrap().id, FALLBACK_SPECIES_ID);
    }

    #[test]
    fn duplicate_ids_collapse() {
        let dex = Pokedex::new(vec![
            Species::new(4, "Charmander", 10, 0),
            Species::new(1, "Bulbasaur", 12, 4),
            Species::new(4, "Charmander", 10, 0),
        ]);
        assert_eq!(dex.len(), 2);
        assert_eq!(dex.iter().next().unwrap().id, 1);
        assert!(dex.by_id(1).unwrap().is_dual_type());
    }
}
