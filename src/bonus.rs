//! Reward bonus effects
//!
//! Every bonus source (rank, streak, ability tree nodes, the equipped pet's
//! special ability) is expressed as a [`BonusEffect`]. Effects are folded into
//! a single [`BonusTotals`] once per reward resolution, and the totals are then
//! consumed by the currency, loot and catch steps.

use crate::config::StreakTier;
use serde::{Deserialize, Serialize};

/// A single additive bonus fraction and what it applies to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "target", content = "value", rename_all = "snake_case")]
pub enum BonusEffect {
    /// Extra fraction of reputation points
    Rp(f64),
    /// Extra fraction of experience
    Xp(f64),
    /// Extra fraction of coins
    Coins(f64),
    /// Extra fraction of RP, XP and coins
    All(f64),
    /// Additive pet catch chance
    CatchRate(f64),
    /// Loot luck, shifting weight from common to rarer loot
    Luck(f64),
    /// Additive encounter probability
    EncounterRate(f64),
}

impl BonusEffect {
    /// Add this effect to the running totals
    pub fn apply(&self, totals: &mut BonusTotals) {
        match *self {
            BonusEffect::Rp(v) => totals.rp += finite(v),
            BonusEffect::Xp(v) => totals.xp += finite(v),
            BonusEffect::Coins(v) => totals.coins += finite(v),
            BonusEffect::All(v) => {
                let v = finite(v);
                totals.rp += v;
                totals.xp += v;
                totals.coins += v;
            }
            BonusEffect::CatchRate(v) => totals.catch_rate += finite(v),
            BonusEffect::Luck(v) => totals.luck += finite(v),
            BonusEffect::EncounterRate(v) => totals.encounter_rate += finite(v),
        }
    }

    /// The same effect with its value multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> BonusEffect {
        let factor = finite(factor);
        match *self {
            BonusEffect::Rp(v) => BonusEffect::Rp(v * factor),
            BonusEffect::Xp(v) => BonusEffect::Xp(v * factor),
            BonusEffect::Coins(v) => BonusEffect::Coins(v * factor),
            BonusEffect::All(v) => BonusEffect::All(v * factor),
            BonusEffect::CatchRate(v) => BonusEffect::CatchRate(v * factor),
            BonusEffect::Luck(v) => BonusEffect::Luck(v * factor),
            BonusEffect::EncounterRate(v) => BonusEffect::EncounterRate(v * factor),
        }
    }
}

fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Sum of all bonus fractions gathered for one reward resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BonusTotals {
    pub rp: f64,
    pub xp: f64,
    pub coins: f64,
    pub catch_rate: f64,
    pub luck: f64,
    pub encounter_rate: f64,
}

impl BonusTotals {
    /// Fold a sequence of effects into fresh totals
    pub fn from_effects<'a>(effects: impl IntoIterator<Item = &'a BonusEffect>) -> Self {
        let mut totals = Self::default();
        for effect in effects {
            effect.apply(&mut totals);
        }
        totals
    }
}

/// `floor(base × (1 + fraction))`, never negative
pub fn apply_fraction(base: u32, fraction: f64) -> u32 {
    let multiplier = (1.0 + finite(fraction)).max(0.0);
    let value = (base as f64 * multiplier).floor();
    value.min(u32::MAX as f64) as u32
}

/// Bonus fraction for a consecutive-day streak, from the highest tier reached
pub fn streak_bonus(streak_days: u32, tiers: &[StreakTier]) -> f64 {
    tiers
        .iter()
        .filter(|tier| streak_days >= tier.min_days)
        .map(|tier| tier.bonus)
        .last()
        .unwrap_or(0.0)
}

/// A node in the ability tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityNode {
    pub id: String,
    pub name: String,
    pub effects: Vec<BonusEffect>,
}

impl AbilityNode {
    pub fn new(id: &str, name: &str, effects: Vec<BonusEffect>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            effects,
        }
    }
}

/// Look up an ability node by id
pub fn find_ability<'a>(tree: &'a [AbilityNode], id: &str) -> Option<&'a AbilityNode> {
    tree.iter().find(|node| node.id == id)
}

/// Default ability tree content
pub fn default_ability_tree() -> Vec<AbilityNode> {
    vec![
        AbilityNode::new("swift_feet_1", "Swift Feet I", vec![BonusEffect::Rp(0.05)]),
        AbilityNode::new("swift_feet_2", "Swift Feet II", vec![BonusEffect::Rp(0.05)]),
        AbilityNode::new("scholar_1", "Scholar I", vec![BonusEffect::Xp(0.10)]),
        AbilityNode::new("merchant_1", "Merchant I", vec![BonusEffect::Coins(0.10)]),
        AbilityNode::new(
            "trailblazer",
            "Trailblazer",
            vec![BonusEffect::Rp(0.03), BonusEffect::Xp(0.03)],
        ),
        AbilityNode::new("champion", "Champion", vec![BonusEffect::All(0.05)]),
        AbilityNode::new("fortune_1", "Fortune I", vec![BonusEffect::Luck(0.10)]),
        AbilityNode::new("tamer_1", "Tamer I", vec![BonusEffect::CatchRate(0.05)]),
        AbilityNode::new("scout_1", "Scout I", vec![BonusEffect::EncounterRate(0.01)]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_applies_to_each_currency() {
        let totals = BonusTotals::from_effects(&[BonusEffect::All(0.1), BonusEffect::Rp(0.05)]);
        assert!((totals.rp - 0.15).abs() < 1e-12);
        assert!((totals.xp - 0.1).abs() < 1e-12);
        assert!((totals.coins - 0.1).abs() < 1e-12);
        assert_eq!(totals.luck, 0.0);
    }

    #[test]
    fn test_non_finite_effects_ignored() {
        let totals = BonusTotals::from_effects(&[BonusEffect::Luck(f64::NAN)]);
        assert_eq!(totals.luck, 0.0);
    }

    #[test]
    fn test_scaled_effect() {
        assert_eq!(BonusEffect::Coins(0.2).scaled(0.5), BonusEffect::Coins(0.1));
    }

    #[test]
    fn test_apply_fraction_floors() {
        assert_eq!(apply_fraction(25, 0.0), 25);
        assert_eq!(apply_fraction(25, 0.15), 28); // 28.75
        assert_eq!(apply_fraction(10, -2.0), 0);
    }

    #[test]
    fn test_streak_bonus_tiers() {
        let tiers = crate::config::RewardConfig::default().streak_tiers;
        assert_eq!(streak_bonus(0, &tiers), 0.0);
        assert_eq!(streak_bonus(2, &tiers), 0.0);
        assert_eq!(streak_bonus(3, &tiers), 0.05);
        assert_eq!(streak_bonus(14, &tiers), 0.10);
        assert_eq!(streak_bonus(15, &tiers), 0.20);
        assert_eq!(streak_bonus(400, &tiers), 0.20);
    }

    #[test]
    fn test_effect_serialization() {
        let json = serde_json::to_string(&BonusEffect::CatchRate(0.05)).unwrap();
        assert_eq!(json, r#"{"target":"catch_rate","value":0.05}"#);
        let back: BonusEffect = serde_json::from_str(&json).unwrap();
        assert_eq!(back, BonusEffect::CatchRate(0.05));
    }

    #[test]
    fn test_find_ability() {
        let tree = default_ability_tree();
        assert!(find_ability(&tree, "champion").is_some());
        assert!(find_ability(&tree, "missing").is_none());
    }
}
