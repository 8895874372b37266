//! Collectible pets
//!
//! The pet catalog is static content: species, which one is the starter, and
//! each species' special ability. Pet instances are the player's owned pets;
//! their evolution stage is always derived from their experience.

use crate::bonus::BonusEffect;
use crate::config::invalid;
use crate::error::EngineError;
use crate::progression::{stage_for_xp, MAX_EVOLUTION_STAGE};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Lowest and highest pet mood
pub const MIN_MOOD: u8 = 1;
pub const MAX_MOOD: u8 = 10;

/// Mood of a freshly caught pet
pub const STARTING_MOOD: u8 = 5;

/// Highest pet upgrade level
pub const MAX_UPGRADE_LEVEL: u8 = 5;

/// A species' special ability, active for sprints within the duration bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetAbility {
    pub effect: BonusEffect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_sprint_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_sprint_secs: Option<f64>,
}

impl PetAbility {
    pub fn always(effect: BonusEffect) -> Self {
        Self {
            effect,
            min_sprint_secs: None,
            max_sprint_secs: None,
        }
    }

    /// Whether a sprint of `duration_secs` triggers the ability
    pub fn is_active(&self, duration_secs: f64) -> bool {
        self.min_sprint_secs.map_or(true, |min| duration_secs >= min)
            && self.max_sprint_secs.map_or(true, |max| duration_secs <= max)
    }
}

/// A collectible species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetSpecies {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub starter: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ability: Option<PetAbility>,
}

impl PetSpecies {
    fn new(id: &str, name: &str, starter: bool, ability: PetAbility) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            starter,
            ability: Some(ability),
        }
    }
}

/// Read-only pet catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PetCatalog {
    species: Vec<PetSpecies>,
}

impl Default for PetCatalog {
    fn default() -> Self {
        let ranged = |effect, min: Option<f64>, max: Option<f64>| PetAbility {
            effect,
            min_sprint_secs: min,
            max_sprint_secs: max,
        };
        Self::new(vec![
            PetSpecies::new(
                "sprout",
                "Sprout",
                true,
                PetAbility::always(BonusEffect::Xp(0.05)),
            ),
            PetSpecies::new(
                "dash_hare",
                "Dash Hare",
                false,
                ranged(BonusEffect::Coins(0.10), None, Some(35.0)),
            ),
            PetSpecies::new(
                "tempo_turtle",
                "Tempo Turtle",
                false,
                ranged(BonusEffect::Rp(0.10), Some(40.0), None),
            ),
            PetSpecies::new(
                "lucky_lynx",
                "Lucky Lynx",
                false,
                PetAbility::always(BonusEffect::Luck(0.10)),
            ),
            PetSpecies::new(
                "beacon_owl",
                "Beacon Owl",
                false,
                PetAbility::always(BonusEffect::EncounterRate(0.02)),
            ),
            PetSpecies::new(
                "net_newt",
                "Net Newt",
                false,
                PetAbility::always(BonusEffect::CatchRate(0.10)),
            ),
            PetSpecies::new(
                "blaze_stag",
                "Blaze Stag",
                false,
                ranged(BonusEffect::All(0.05), Some(35.0), None),
            ),
        ])
    }
}

impl PetCatalog {
    pub fn new(species: Vec<PetSpecies>) -> Self {
        Self { species }
    }

    pub fn species(&self) -> &[PetSpecies] {
        &self.species
    }

    pub fn get(&self, id: &str) -> Option<&PetSpecies> {
        self.species.iter().find(|s| s.id == id)
    }

    pub fn starter(&self) -> Option<&PetSpecies> {
        self.species.iter().find(|s| s.starter)
    }

    /// Species that can be caught, in catalog order
    pub fn catchable(&self) -> impl Iterator<Item = &PetSpecies> {
        self.species.iter().filter(|s| !s.starter)
    }

    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        let mut seen = HashSet::new();
        for species in &self.species {
            if species.id.is_empty() {
                return Err(invalid("pet species ids must not be empty"));
            }
            if !seen.insert(species.id.as_str()) {
                return Err(invalid(format!("duplicate pet species id: {}", species.id)));
            }
        }
        if self.species.iter().filter(|s| s.starter).count() > 1 {
            return Err(invalid("pet catalog has more than one starter"));
        }
        Ok(())
    }
}

/// A pet owned by the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetInstance {
    pub species_id: String,
    experience: u64,
    mood: u8,
    upgrade_level: u8,
}

impl PetInstance {
    pub fn new(species_id: &str) -> Self {
        Self {
            species_id: species_id.to_string(),
            experience: 0,
            mood: STARTING_MOOD,
            upgrade_level: 0,
        }
    }

    pub fn experience(&self) -> u64 {
        self.experience
    }

    /// Evolution stage (1-10), derived from experience
    pub fn evolution_stage(&self) -> u32 {
        stage_for_xp(self.experience)
    }

    pub fn mood(&self) -> u8 {
        self.mood.clamp(MIN_MOOD, MAX_MOOD)
    }

    pub fn upgrade_level(&self) -> u8 {
        self.upgrade_level.min(MAX_UPGRADE_LEVEL)
    }

    /// Add experience. Returns the new stage if the pet evolved.
    pub fn add_experience(&mut self, xp: u64) -> Option<u32> {
        let before = self.evolution_stage();
        self.experience = self.experience.saturating_add(xp);
        let after = self.evolution_stage();
        (after > before).then_some(after)
    }

    pub fn adjust_mood(&mut self, delta: i32) {
        let mood = (self.mood() as i32 + delta).clamp(MIN_MOOD as i32, MAX_MOOD as i32);
        self.mood = mood as u8;
    }

    pub fn set_upgrade_level(&mut self, level: u8) {
        self.upgrade_level = level.min(MAX_UPGRADE_LEVEL);
    }

    /// Multiplier applied to the species' special ability.
    ///
    /// Stage contributes 0.5 at stage 1 rising to 1.0 at the top stage; each
    /// upgrade level adds 10% on top.
    pub fn effectiveness(&self) -> f64 {
        let stage_span = (MAX_EVOLUTION_STAGE - 1) as f64;
        let stage_factor = 0.5 + 0.5 * (self.evolution_stage() - 1) as f64 / stage_span;
        stage_factor * (1.0 + 0.1 * self.upgrade_level() as f64)
    }
}

/// The player's pets and which one is equipped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PetCollection {
    pets: Vec<PetInstance>,
    equipped: Option<String>,
}

impl PetCollection {
    /// A collection holding only the catalog's starter, equipped
    pub fn with_starter(catalog: &PetCatalog) -> Self {
        let mut collection = Self::default();
        if let Some(starter) = catalog.starter() {
            collection.add(PetInstance::new(&starter.id));
            collection.equipped = Some(starter.id.clone());
        }
        collection
    }

    pub fn pets(&self) -> &[PetInstance] {
        &self.pets
    }

    pub fn owns(&self, species_id: &str) -> bool {
        self.pets.iter().any(|p| p.species_id == species_id)
    }

    pub fn get(&self, species_id: &str) -> Option<&PetInstance> {
        self.pets.iter().find(|p| p.species_id == species_id)
    }

    pub fn get_mut(&mut self, species_id: &str) -> Option<&mut PetInstance> {
        self.pets.iter_mut().find(|p| p.species_id == species_id)
    }

    /// Add a pet unless that species is already owned
    pub fn add(&mut self, pet: PetInstance) -> bool {
        if self.owns(&pet.species_id) {
            return false;
        }
        self.pets.push(pet);
        true
    }

    /// Equip an owned pet. Unknown ids are ignored.
    pub fn equip(&mut self, species_id: &str) -> bool {
        if !self.owns(species_id) {
            return false;
        }
        self.equipped = Some(species_id.to_string());
        true
    }

    pub fn equipped_id(&self) -> Option<&str> {
        self.equipped.as_deref()
    }

    pub fn equipped(&self) -> Option<&PetInstance> {
        self.equipped.as_deref().and_then(|id| self.get(id))
    }

    pub fn equipped_mut(&mut self) -> Option<&mut PetInstance> {
        let id = self.equipped.clone()?;
        self.get_mut(&id)
    }

    /// Number of non-starter species caught
    pub fn caught_count(&self, catalog: &PetCatalog) -> usize {
        catalog.catchable().filter(|s| self.owns(&s.id)).count()
    }

    /// Catchable species not yet owned, in catalog order
    pub fn unowned<'a>(&'a self, catalog: &'a PetCatalog) -> impl Iterator<Item = &'a PetSpecies> {
        catalog.catchable().filter(move |s| !self.owns(&s.id))
    }

    /// Whether every catchable species is owned
    pub fn is_complete(&self, catalog: &PetCatalog) -> bool {
        self.unowned(catalog).next().is_none()
    }

    /// Lower every pet's mood by one per missed day
    pub fn apply_missed_days(&mut self, days: u32) {
        let delta = -(days.min(MAX_MOOD as u32) as i32);
        for pet in &mut self.pets {
            pet.adjust_mood(delta);
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog = PetCatalog::default();
        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.starter().map(|s| s.id.as_str()), Some("sprout"));
        assert_eq!(catalog.catchable().count(), 6);
    }

    #[test]
    fn test_duplicate_species_rejected() {
        let mut species = PetCatalog::default().species().to_vec();
        species.push(species[1].clone());
        assert!(PetCatalog::new(species).validate().is_err());
    }

    #[test]
    fn test_ability_duration_bounds() {
        let ability = PetAbility {
            effect: BonusEffect::Rp(0.1),
            min_sprint_secs: Some(35.0),
            max_sprint_secs: Some(40.0),
        };
        assert!(!ability.is_active(34.9));
        assert!(ability.is_active(35.0));
        assert!(ability.is_active(40.0));
        assert!(!ability.is_active(40.5));
        assert!(PetAbility::always(BonusEffect::Rp(0.1)).is_active(0.0));
    }

    #[test]
    fn test_stage_follows_experience() {
        let mut pet = PetInstance::new("dash_hare");
        assert_eq!(pet.evolution_stage(), 1);
        assert_eq!(pet.add_experience(50), None);
        assert_eq!(pet.add_experience(50), Some(2));
        assert_eq!(pet.evolution_stage(), 2);
        pet.add_experience(1_000_000);
        assert_eq!(pet.evolution_stage(), MAX_EVOLUTION_STAGE);
    }

    #[test]
    fn test_mood_is_clamped() {
        let mut pet = PetInstance::new("dash_hare");
        pet.adjust_mood(100);
        assert_eq!(pet.mood(), MAX_MOOD);
        pet.adjust_mood(-100);
        assert_eq!(pet.mood(), MIN_MOOD);
    }

    #[test]
    fn test_effectiveness() {
        let mut pet = PetInstance::new("dash_hare");
        assert!((pet.effectiveness() - 0.5).abs() < 1e-12);

        pet.add_experience(8_100);
        assert!((pet.effectiveness() - 1.0).abs() < 1e-12);

        pet.set_upgrade_level(9);
        assert_eq!(pet.upgrade_level(), MAX_UPGRADE_LEVEL);
        assert!((pet.effectiveness() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_collection_tracking() {
        let catalog = PetCatalog::default();
        let mut pets = PetCollection::with_starter(&catalog);
        assert_eq!(pets.equipped_id(), Some("sprout"));
        assert_eq!(pets.caught_count(&catalog), 0);

        assert!(pets.add(PetInstance::new("net_newt")));
        assert!(!pets.add(PetInstance::new("net_newt")));
        assert_eq!(pets.caught_count(&catalog), 1);
        assert!(!pets.equip("beacon_owl"));
        assert!(pets.equip("net_newt"));
        assert_eq!(pets.equipped().map(|p| p.species_id.as_str()), Some("net_newt"));

        for species in catalog.catchable() {
            pets.add(PetInstance::new(&species.id));
        }
        assert!(pets.is_complete(&catalog));
        assert_eq!(pets.unowned(&catalog).count(), 0);
    }

    #[test]
    fn test_missed_days_lower_mood() {
        let catalog = PetCatalog::default();
        let mut pets = PetCollection::with_starter(&catalog);
        pets.apply_missed_days(3);
        assert_eq!(pets.equipped().map(|p| p.mood()), Some(2));
        pets.apply_missed_days(30);
        assert_eq!(pets.equipped().map(|p| p.mood()), Some(MIN_MOOD));
    }

    #[test]
    fn test_collection_serialization() {
        let catalog = PetCatalog::default();
        let mut pets = PetCollection::with_starter(&catalog);
        pets.add(PetInstance::new("lucky_lynx"));
        let json = pets.to_json().unwrap();
        assert_eq!(PetCollection::from_json(&json).unwrap(), pets);
    }
}
