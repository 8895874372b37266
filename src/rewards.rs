//! Reward resolution
//!
//! Turns a validated [`SprintResult`] plus the player's current progression
//! and pets into an immutable [`RewardBundle`]:
//!
//! 1. base RP / XP / coins
//! 2. stacked bonus fractions (rank, streak, ability tree, equipped pet)
//! 3. `floor(base × (1 + Σ))` per currency
//! 4. loot drop gate, then a luck-adjusted rarity roll
//! 5. pet catch roll against the uncaught catalog
//!
//! Resolution only reads state. Applying the bundle is the ledger's job.

use crate::bonus::{
    apply_fraction, find_ability, streak_bonus, AbilityNode, BonusEffect, BonusTotals,
};
use crate::config::{EngineConfig, RewardConfig};
use crate::pets::{PetCatalog, PetCollection};
use crate::progression::{ProgressionLedger, RankTable};
use crate::roll::Roller;
use crate::types::{LootRarity, RewardBundle, SprintResult};

/// Reward resolver over borrowed static content
#[derive(Debug, Clone, Copy)]
pub struct RewardResolver<'a> {
    config: &'a RewardConfig,
    ranks: &'a RankTable,
    abilities: &'a [AbilityNode],
    catalog: &'a PetCatalog,
}

impl<'a> RewardResolver<'a> {
    pub fn new(
        config: &'a RewardConfig,
        ranks: &'a RankTable,
        abilities: &'a [AbilityNode],
        catalog: &'a PetCatalog,
    ) -> Self {
        Self {
            config,
            ranks,
            abilities,
            catalog,
        }
    }

    pub fn from_config(config: &'a EngineConfig) -> Self {
        Self::new(&config.rewards, &config.ranks, &config.abilities, &config.pets)
    }

    /// Every bonus source that applies to a sprint of `duration_secs`
    pub fn bonus_effects(
        &self,
        duration_secs: f64,
        ledger: &ProgressionLedger,
        pets: &PetCollection,
    ) -> Vec<BonusEffect> {
        let mut effects = Vec::new();

        let rank_bonus = self.ranks.tier_for_rp(ledger.reputation_points).reward_bonus;
        if rank_bonus != 0.0 {
            effects.push(BonusEffect::All(rank_bonus));
        }

        let streak = streak_bonus(ledger.current_streak, &self.config.streak_tiers);
        if streak != 0.0 {
            effects.push(BonusEffect::All(streak));
        }

        for id in &ledger.unlocked_abilities {
            match find_ability(self.abilities, id) {
                Some(node) => effects.extend(node.effects.iter().copied()),
                None => tracing::debug!(ability = %id, "unknown ability id, skipped"),
            }
        }

        if let Some(effect) = self.pet_effect(duration_secs, pets) {
            effects.push(effect);
        }
        effects
    }

    /// Sum of every bonus that applies to a sprint of `duration_secs`
    pub fn collect_bonuses(
        &self,
        duration_secs: f64,
        ledger: &ProgressionLedger,
        pets: &PetCollection,
    ) -> BonusTotals {
        BonusTotals::from_effects(&self.bonus_effects(duration_secs, ledger, pets))
    }

    /// Encounter rate boost from unlocked abilities and the equipped pet,
    /// regardless of sprint length
    pub fn encounter_boost(&self, ledger: &ProgressionLedger, pets: &PetCollection) -> f64 {
        let abilities: f64 = ledger
            .unlocked_abilities
            .iter()
            .filter_map(|id| find_ability(self.abilities, id))
            .flat_map(|node| node.effects.iter())
            .map(|effect| match effect {
                BonusEffect::EncounterRate(v) => *v,
                _ => 0.0,
            })
            .sum();
        abilities + self.pet_encounter_boost(pets)
    }

    fn pet_encounter_boost(&self, pets: &PetCollection) -> f64 {
        let Some(pet) = pets.equipped() else {
            return 0.0;
        };
        let species = self.catalog.get(&pet.species_id);
        let Some(ability) = species.and_then(|s| s.ability.as_ref()) else {
            return 0.0;
        };
        match ability.effect.scaled(pet.effectiveness()) {
            BonusEffect::EncounterRate(v) => v,
            _ => 0.0,
        }
    }

    /// Resolve the rewards for one sprint.
    ///
    /// Invalid sprints get an empty bundle and consume no rolls.
    pub fn resolve(
        &self,
        result: &SprintResult,
        ledger: &ProgressionLedger,
        pets: &PetCollection,
        roller: &mut dyn Roller,
    ) -> RewardBundle {
        if !result.is_valid {
            return RewardBundle::empty();
        }

        let bonuses = self.collect_bonuses(result.duration_secs, ledger, pets);
        let mut bundle = RewardBundle {
            rp: apply_fraction(self.config.base_rp, bonuses.rp),
            xp: apply_fraction(self.config.base_xp, bonuses.xp),
            coins: apply_fraction(self.config.base_coins, bonuses.coins),
            loot_rarity: None,
            caught_pet_id: None,
        };

        if roller.roll() < self.config.loot_drop_chance {
            bundle.loot_rarity = Some(self.roll_rarity(bonuses.luck, roller));
        }

        bundle.caught_pet_id = self.roll_catch(bonuses.catch_rate, pets, roller);

        tracing::debug!(
            session_id = %result.session_id,
            ?bonuses,
            ?bundle,
            "rewards resolved"
        );
        bundle
    }

    /// Rarity weights after luck is applied, common first
    pub fn rarity_weights(&self, luck: f64) -> [f64; 5] {
        let luck = if luck.is_finite() { luck.max(0.0) } else { 0.0 };
        let base = self.config.loot_weights.as_array();
        let coefficients = self.config.luck_coefficients.as_array();

        let mut weights = [0.0; 5];
        weights[0] = (base[0] - coefficients[0] * luck).max(self.config.min_common_weight);
        for i in 1..weights.len() {
            weights[i] = base[i] + coefficients[i] * luck;
        }
        weights
    }

    /// Pick a rarity by testing common to legendary with `roll ≤ cumulative`
    pub fn roll_rarity(&self, luck: f64, roller: &mut dyn Roller) -> LootRarity {
        let roll = roller.roll();
        let mut cumulative = 0.0;
        for (rarity, weight) in LootRarity::ALL.iter().zip(self.rarity_weights(luck)) {
            cumulative += weight;
            if roll <= cumulative {
                return *rarity;
            }
        }
        LootRarity::Common
    }

    /// Catch chance given how many catchable species are already owned
    pub fn catch_rate(&self, caught: usize, catch_bonus: f64) -> f64 {
        let base = self
            .config
            .catch_rates
            .get(caught)
            .copied()
            .unwrap_or(self.config.catch_rate_floor);
        let rate = base + catch_bonus;
        if rate.is_finite() {
            rate.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn roll_catch(
        &self,
        catch_bonus: f64,
        pets: &PetCollection,
        roller: &mut dyn Roller,
    ) -> Option<String> {
        if pets.is_complete(self.catalog) {
            return None;
        }
        let rate = self.catch_rate(pets.caught_count(self.catalog), catch_bonus);
        if roller.roll() >= rate {
            return None;
        }
        let unowned: Vec<_> = pets.unowned(self.catalog).collect();
        let index = roller.pick(unowned.len());
        unowned.get(index).map(|species| species.id.clone())
    }

    fn pet_effect(&self, duration_secs: f64, pets: &PetCollection) -> Option<BonusEffect> {
        let pet = pets.equipped()?;
        let ability = self.catalog.get(&pet.species_id)?.ability.as_ref()?;
        ability
            .is_active(duration_secs)
            .then(|| ability.effect.scaled(pet.effectiveness()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pets::PetInstance;
    use crate::roll::{RngRoller, ScriptedRoller};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn result(is_valid: bool, duration_secs: f64) -> SprintResult {
        SprintResult {
            session_id: Uuid::new_v4(),
            duration_secs,
            is_valid,
            score: if is_valid { 80.0 } else { 20.0 },
            heart_rate_score: 0.8,
            cadence_score: 0.8,
            hr_derivative_score: 0.8,
            baseline_heart_rate: 80,
            peak_heart_rate: 160,
            average_cadence: 165.0,
            peak_cadence: 175,
            sample_count: 30,
        }
    }

    /// A collection with no equipped pet, so pet bonuses stay out of the way
    fn no_pets() -> PetCollection {
        PetCollection::default()
    }

    #[test]
    fn test_invalid_sprint_consumes_no_rolls() {
        let config = EngineConfig::default();
        let resolver = RewardResolver::from_config(&config);
        let mut roller = ScriptedRoller::new([0.0, 0.0, 0.0]);
        let bundle = resolver.resolve(
            &result(false, 30.0),
            &ProgressionLedger::default(),
            &no_pets(),
            &mut roller,
        );
        assert!(bundle.is_empty());
        assert_eq!(roller.remaining(), 3);
    }

    #[test]
    fn test_base_rewards_without_bonuses() {
        let config = EngineConfig::default();
        let resolver = RewardResolver::from_config(&config);
        // No loot, catch fails
        let mut roller = ScriptedRoller::new([0.9, 0.9]);
        let mut pets = PetCollection::default();
        for species in config.pets.catchable() {
            pets.add(PetInstance::new(&species.id));
        }
        let bundle = resolver.resolve(
            &result(true, 30.0),
            &ProgressionLedger::default(),
            &pets,
            &mut roller,
        );
        assert_eq!(
            bundle,
            RewardBundle {
                rp: 25,
                xp: 50,
                coins: 10,
                loot_rarity: None,
                caught_pet_id: None,
            }
        );
        // Complete collection skips the catch roll
        assert_eq!(roller.remaining(), 1);
    }

    #[test]
    fn test_bonus_stacking() {
        let config = EngineConfig::default();
        let resolver = RewardResolver::from_config(&config);
        let mut ledger = ProgressionLedger::default();
        ledger.reputation_points = 3500; // Gold, +0.10
        ledger.current_streak = 7; // +0.10
        ledger.unlocked_abilities.insert("swift_feet_1".into()); // rp +0.05
        ledger.unlocked_abilities.insert("scholar_1".into()); // xp +0.10
        ledger.unlocked_abilities.insert("no_such_node".into());

        let totals = resolver.collect_bonuses(30.0, &ledger, &no_pets());
        assert!((totals.rp - 0.25).abs() < 1e-9);
        assert!((totals.xp - 0.30).abs() < 1e-9);
        assert!((totals.coins - 0.20).abs() < 1e-9);

        let mut roller = ScriptedRoller::constant(0.99);
        let bundle = resolver.resolve(&result(true, 30.0), &ledger, &no_pets(), &mut roller);
        assert_eq!(bundle.rp, 31); // 31.25
        assert_eq!(bundle.xp, 65);
        assert_eq!(bundle.coins, 12);
    }

    #[test]
    fn test_pet_ability_respects_duration_and_effectiveness() {
        let config = EngineConfig::default();
        let resolver = RewardResolver::from_config(&config);
        let mut pets = PetCollection::with_starter(&config.pets);
        pets.add(PetInstance::new("dash_hare"));
        pets.equip("dash_hare");

        // Stage 1, no upgrades: effectiveness 0.5
        let short = resolver.collect_bonuses(30.0, &ProgressionLedger::default(), &pets);
        assert!((short.coins - 0.05).abs() < 1e-9);
        let long = resolver.collect_bonuses(40.0, &ProgressionLedger::default(), &pets);
        assert_eq!(long.coins, 0.0);
    }

    #[test]
    fn test_encounter_boost_from_equipped_pet() {
        let config = EngineConfig::default();
        let resolver = RewardResolver::from_config(&config);
        let ledger = ProgressionLedger::default();
        let mut pets = PetCollection::with_starter(&config.pets);
        assert_eq!(resolver.encounter_boost(&ledger, &pets), 0.0);

        pets.add(PetInstance::new("beacon_owl"));
        pets.equip("beacon_owl");
        assert!((resolver.encounter_boost(&ledger, &pets) - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_encounter_boost_stacks_unlocked_abilities() {
        let config = EngineConfig::default();
        let resolver = RewardResolver::from_config(&config);
        let mut ledger = ProgressionLedger::default();
        ledger.unlocked_abilities.insert("scout_1".into());
        ledger.unlocked_abilities.insert("scholar_1".into());
        let mut pets = PetCollection::with_starter(&config.pets);
        assert!((resolver.encounter_boost(&ledger, &pets) - 0.01).abs() < 1e-9);

        pets.add(PetInstance::new("beacon_owl"));
        pets.equip("beacon_owl");
        assert!((resolver.encounter_boost(&ledger, &pets) - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_rarity_weights_with_luck() {
        let config = EngineConfig::default();
        let resolver = RewardResolver::from_config(&config);

        let weights = resolver.rarity_weights(0.0);
        assert_eq!(weights, [0.60, 0.25, 0.10, 0.04, 0.01]);

        let weights = resolver.rarity_weights(0.2);
        let expected = [0.40, 0.35, 0.16, 0.07, 0.02];
        for (w, e) in weights.iter().zip(expected) {
            assert!((w - e).abs() < 1e-9);
        }

        // Common weight never drops below the floor
        assert!((resolver.rarity_weights(5.0)[0] - 0.20).abs() < 1e-9);
    }

    #[test]
    fn test_rarity_roll_boundaries() {
        let config = EngineConfig::default();
        let resolver = RewardResolver::from_config(&config);
        let rarity = |roll: f64| resolver.roll_rarity(0.0, &mut ScriptedRoller::new([roll]));
        assert_eq!(rarity(0.0), LootRarity::Common);
        assert_eq!(rarity(0.59), LootRarity::Common);
        assert_eq!(rarity(0.70), LootRarity::Uncommon);
        assert_eq!(rarity(0.90), LootRarity::Rare);
        assert_eq!(rarity(0.97), LootRarity::Epic);
        assert_eq!(rarity(0.995), LootRarity::Legendary);
    }

    #[test]
    fn test_loot_gate() {
        let config = EngineConfig::default();
        let resolver = RewardResolver::from_config(&config);
        let ledger = ProgressionLedger::default();

        // gate 0.1 < 0.30, rarity 0.95 => epic, catch roll misses
        let mut roller = ScriptedRoller::new([0.1, 0.95, 0.99]);
        let bundle = resolver.resolve(&result(true, 30.0), &ledger, &no_pets(), &mut roller);
        assert_eq!(bundle.loot_rarity, Some(LootRarity::Epic));

        // gate 0.30 is not < 0.30, so no rarity roll happens
        let mut roller = ScriptedRoller::new([0.30, 0.99]);
        let bundle = resolver.resolve(&result(true, 30.0), &ledger, &no_pets(), &mut roller);
        assert_eq!(bundle.loot_rarity, None);
        assert_eq!(roller.remaining(), 0);
    }

    #[test]
    fn test_catch_rates() {
        let config = EngineConfig::default();
        let resolver = RewardResolver::from_config(&config);
        assert_eq!(resolver.catch_rate(0, 0.0), 1.0);
        assert_eq!(resolver.catch_rate(1, 0.0), 0.5);
        assert_eq!(resolver.catch_rate(2, 0.0), 0.3);
        assert_eq!(resolver.catch_rate(3, 0.0), 0.15);
        assert_eq!(resolver.catch_rate(9, 0.0), 0.15);
        assert!((resolver.catch_rate(3, 0.1) - 0.25).abs() < 1e-9);
        assert_eq!(resolver.catch_rate(0, 0.5), 1.0);
    }

    #[test]
    fn test_first_catch_is_guaranteed() {
        let config = EngineConfig::default();
        let resolver = RewardResolver::from_config(&config);
        let pets = PetCollection::with_starter(&config.pets);

        // No loot, catch roll 0.999 < 1.0, pick the second unowned species
        let mut roller = ScriptedRoller::new([0.9, 0.999, 0.2]);
        let bundle = resolver.resolve(
            &result(true, 30.0),
            &ProgressionLedger::default(),
            &pets,
            &mut roller,
        );
        let unowned: Vec<_> = pets.unowned(&config.pets).map(|s| s.id.clone()).collect();
        assert_eq!(bundle.caught_pet_id.as_deref(), Some(unowned[1].as_str()));
    }

    #[test]
    fn test_caught_pet_is_never_owned() {
        let config = EngineConfig::default();
        let resolver = RewardResolver::from_config(&config);
        let mut roller = RngRoller::seeded(42);
        let mut pets = PetCollection::with_starter(&config.pets);
        let ledger = ProgressionLedger::default();

        for _ in 0..500 {
            let bundle = resolver.resolve(&result(true, 35.0), &ledger, &pets, &mut roller);
            if let Some(id) = bundle.caught_pet_id {
                assert!(!pets.owns(&id));
                assert!(config.pets.get(&id).is_some_and(|s| !s.starter));
                pets.add(PetInstance::new(&id));
            }
        }
        assert!(pets.is_complete(&config.pets));
    }
}
