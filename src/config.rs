//! Engine configuration
//!
//! Tuning constants and static content tables (probability tiers, base
//! rewards, rank thresholds, ability tree, pet catalog) are read-only
//! configuration. Every table can be loaded from JSON and is validated once
//! at startup; a malformed table is the only error the engine reports.

use crate::bonus::{default_ability_tree, AbilityNode};
use crate::error::EngineError;
use crate::pets::PetCatalog;
use crate::progression::RankTable;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Thresholds used by the sprint scoring functions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Heart rate rise above baseline that earns full increase credit (bpm)
    pub min_hr_increase: f64,
    /// Fraction of max heart rate that counts as reaching the sprint zone
    pub zone_percent: f64,
    /// Fraction of samples that must sit above baseline + margin
    pub min_time_in_zone_fraction: f64,
    /// Margin above baseline for a sample to count as elevated (bpm)
    pub elevated_margin_bpm: f64,
    /// Relative cadence increase that earns full credit (0.15 = 15%)
    pub min_cadence_increase: f64,
    /// Peak cadence that earns full credit (spm)
    pub min_peak_cadence: f64,
    /// Early heart rate rise rate that earns full credit (bpm per second)
    pub target_hr_derivative: f64,
    /// Time between consecutive telemetry samples (seconds)
    pub sample_interval_secs: f64,
    /// Player max heart rate (bpm)
    pub max_heart_rate: u32,
    /// Composite score required for a valid sprint (0-100)
    pub valid_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_hr_increase: 30.0,
            zone_percent: 0.80,
            min_time_in_zone_fraction: 0.60,
            elevated_margin_bpm: 10.0,
            min_cadence_increase: 0.15,
            min_peak_cadence: 160.0,
            target_hr_derivative: 3.0,
            sample_interval_secs: 1.0,
            max_heart_rate: 190,
            valid_threshold: 60.0,
        }
    }
}

impl ScoringConfig {
    fn validate(&self) -> Result<(), EngineError> {
        let positive = [
            ("min_hr_increase", self.min_hr_increase),
            ("zone_percent", self.zone_percent),
            ("min_time_in_zone_fraction", self.min_time_in_zone_fraction),
            ("min_cadence_increase", self.min_cadence_increase),
            ("min_peak_cadence", self.min_peak_cadence),
            ("target_hr_derivative", self.target_hr_derivative),
            ("sample_interval_secs", self.sample_interval_secs),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(format!("scoring.{name} must be positive")));
            }
        }
        if self.max_heart_rate == 0 {
            return Err(invalid("scoring.max_heart_rate must be positive"));
        }
        if !(0.0..=100.0).contains(&self.valid_threshold) {
            return Err(invalid("scoring.valid_threshold must be within 0-100"));
        }
        Ok(())
    }
}

/// Sprint lifecycle timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SprintConfig {
    /// Shortest target duration (seconds, inclusive)
    pub min_target_secs: u32,
    /// Longest target duration (seconds, inclusive)
    pub max_target_secs: u32,
    /// Countdown length before the sprint becomes active (seconds)
    pub countdown_secs: u32,
    /// Delay before a completed session resets to idle (seconds)
    pub completion_reset_secs: f64,
    /// Delay before a cancelled session resets to idle (seconds)
    pub cancel_reset_secs: f64,
    /// Recommended host tick cadence while a sprint is active (milliseconds)
    pub active_tick_ms: u64,
    /// Baseline used when no heart rate has been observed yet (bpm)
    pub default_baseline_hr: u32,
}

impl Default for SprintConfig {
    fn default() -> Self {
        Self {
            min_target_secs: 30,
            max_target_secs: 45,
            countdown_secs: 3,
            completion_reset_secs: 2.0,
            cancel_reset_secs: 1.0,
            active_tick_ms: 100,
            default_baseline_hr: 70,
        }
    }
}

impl SprintConfig {
    pub fn completion_reset(&self) -> Duration {
        secs(self.completion_reset_secs)
    }

    pub fn cancel_reset(&self) -> Duration {
        secs(self.cancel_reset_secs)
    }

    pub fn active_tick(&self) -> Duration {
        Duration::from_millis(self.active_tick_ms.max(1))
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.min_target_secs == 0 || self.min_target_secs > self.max_target_secs {
            return Err(invalid(
                "sprint target range must be non-empty and start above zero",
            ));
        }
        for (name, value) in [
            ("completion_reset_secs", self.completion_reset_secs),
            ("cancel_reset_secs", self.cancel_reset_secs),
        ] {
            if !in_duration_range(value) {
                return Err(invalid(format!(
                    "sprint.{name} must be within 0-{MAX_DURATION_SECS}"
                )));
            }
        }
        Ok(())
    }
}

/// A flat encounter probability for `Δ` in `[from_secs, to_secs)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityTier {
    pub from_secs: f64,
    pub to_secs: f64,
    pub probability: f64,
}

impl ProbabilityTier {
    pub const fn new(from_secs: f64, to_secs: f64, probability: f64) -> Self {
        Self {
            from_secs,
            to_secs,
            probability,
        }
    }

    pub fn contains(&self, delta_secs: f64) -> bool {
        delta_secs >= self.from_secs && delta_secs < self.to_secs
    }
}

/// Encounter scheduling constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    /// Time between encounter checks (seconds of run time)
    pub check_interval_secs: f64,
    /// Run time before the first check may matter (seconds)
    pub warm_up_secs: f64,
    /// `Δ` must exceed this before probability is evaluated (seconds)
    pub min_interval_secs: f64,
    /// Cooldown after an encounter resolves (seconds)
    pub recovery_secs: f64,
    /// `Δ` at which an encounter is guaranteed (seconds)
    pub pity_timer_secs: f64,
    /// Probability once `Δ` is past the last tier
    pub max_probability: f64,
    /// Ordered, disjoint probability tiers
    pub tiers: Vec<ProbabilityTier>,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 10.0,
            warm_up_secs: 60.0,
            min_interval_secs: 60.0,
            recovery_secs: 45.0,
            pity_timer_secs: 420.0,
            max_probability: 0.50,
            tiers: vec![
                ProbabilityTier::new(60.0, 90.0, 0.02),
                ProbabilityTier::new(90.0, 120.0, 0.05),
                ProbabilityTier::new(120.0, 180.0, 0.10),
                ProbabilityTier::new(180.0, 240.0, 0.20),
                ProbabilityTier::new(240.0, 300.0, 0.35),
            ],
        }
    }
}

impl EncounterConfig {
    pub fn check_interval(&self) -> Duration {
        secs(self.check_interval_secs)
    }

    pub fn warm_up(&self) -> Duration {
        secs(self.warm_up_secs)
    }

    pub fn min_interval(&self) -> Duration {
        secs(self.min_interval_secs)
    }

    pub fn recovery(&self) -> Duration {
        secs(self.recovery_secs)
    }

    fn validate(&self) -> Result<(), EngineError> {
        if !(in_duration_range(self.check_interval_secs) && self.check_interval_secs > 0.0) {
            return Err(invalid(format!(
                "encounter.check_interval_secs must be positive and at most {MAX_DURATION_SECS}"
            )));
        }
        for (name, value) in [
            ("warm_up_secs", self.warm_up_secs),
            ("min_interval_secs", self.min_interval_secs),
            ("recovery_secs", self.recovery_secs),
            ("pity_timer_secs", self.pity_timer_secs),
        ] {
            if !in_duration_range(value) {
                return Err(invalid(format!(
                    "encounter.{name} must be within 0-{MAX_DURATION_SECS}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.max_probability) {
            return Err(invalid("encounter.max_probability must be within 0-1"));
        }
        if self.tiers.is_empty() {
            return Err(invalid("encounter.tiers must not be empty"));
        }
        for (i, tier) in self.tiers.iter().enumerate() {
            if !(tier.from_secs < tier.to_secs) {
                return Err(invalid(format!("encounter tier {i} has an empty range")));
            }
            if !(0.0..=1.0).contains(&tier.probability) {
                return Err(invalid(format!(
                    "encounter tier {i} probability must be within 0-1"
                )));
            }
            if let Some(next) = self.tiers.get(i + 1) {
                if next.from_secs < tier.to_secs {
                    return Err(invalid(format!(
                        "encounter tiers {i} and {} overlap or are out of order",
                        i + 1
                    )));
                }
            }
        }
        let last_upper = self.tiers.last().map(|t| t.to_secs).unwrap_or(0.0);
        if self.pity_timer_secs < last_upper {
            return Err(invalid(
                "encounter.pity_timer_secs must not precede the last tier",
            ));
        }
        Ok(())
    }
}

/// Minimum consecutive-day streak that earns a bonus fraction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreakTier {
    pub min_days: u32,
    pub bonus: f64,
}

/// Relative weight of each loot rarity, in increasing-rarity order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LootWeights {
    pub common: f64,
    pub uncommon: f64,
    pub rare: f64,
    pub epic: f64,
    pub legendary: f64,
}

impl LootWeights {
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.common,
            self.uncommon,
            self.rare,
            self.epic,
            self.legendary,
        ]
    }
}

/// Base rewards and roll tables for valid sprints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub base_rp: u32,
    pub base_xp: u32,
    pub base_coins: u32,
    /// Streak bonuses, ordered by `min_days`
    pub streak_tiers: Vec<StreakTier>,
    /// Chance that any loot drops
    pub loot_drop_chance: f64,
    /// Rarity distribution before luck is applied
    pub loot_weights: LootWeights,
    /// How much one unit of luck raises each rarer category
    pub luck_coefficients: LootWeights,
    /// Common weight never drops below this
    pub min_common_weight: f64,
    /// Catch rate indexed by number of pets already caught
    pub catch_rates: Vec<f64>,
    /// Catch rate once the table is exhausted
    pub catch_rate_floor: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            base_rp: 25,
            base_xp: 50,
            base_coins: 10,
            streak_tiers: vec![
                StreakTier {
                    min_days: 3,
                    bonus: 0.05,
                },
                StreakTier {
                    min_days: 7,
                    bonus: 0.10,
                },
                StreakTier {
                    min_days: 15,
                    bonus: 0.20,
                },
            ],
            loot_drop_chance: 0.30,
            loot_weights: LootWeights {
                common: 0.60,
                uncommon: 0.25,
                rare: 0.10,
                epic: 0.04,
                legendary: 0.01,
            },
            // The common coefficient is the amount subtracted per unit of luck
            luck_coefficients: LootWeights {
                common: 1.0,
                uncommon: 0.5,
                rare: 0.3,
                epic: 0.15,
                legendary: 0.05,
            },
            min_common_weight: 0.20,
            catch_rates: vec![1.0, 0.5, 0.3],
            catch_rate_floor: 0.15,
        }
    }
}

impl RewardConfig {
    fn validate(&self) -> Result<(), EngineError> {
        if !(0.0..=1.0).contains(&self.loot_drop_chance) {
            return Err(invalid("rewards.loot_drop_chance must be within 0-1"));
        }
        if self
            .loot_weights
            .as_array()
            .iter()
            .chain(self.luck_coefficients.as_array().iter())
            .any(|w| !(w.is_finite() && *w >= 0.0))
        {
            return Err(invalid("loot weights and luck coefficients must be non-negative"));
        }
        if self
            .catch_rates
            .iter()
            .chain(std::iter::once(&self.catch_rate_floor))
            .any(|r| !(0.0..=1.0).contains(r))
        {
            return Err(invalid("catch rates must be within 0-1"));
        }
        if self
            .streak_tiers
            .windows(2)
            .any(|pair| pair[0].min_days >= pair[1].min_days)
        {
            return Err(invalid("streak tiers must be ordered by min_days"));
        }
        Ok(())
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub sprint: SprintConfig,
    pub encounter: EncounterConfig,
    pub rewards: RewardConfig,
    pub ranks: RankTable,
    /// Ability tree nodes a player can unlock
    pub abilities: Vec<AbilityNode>,
    pub pets: PetCatalog,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            sprint: SprintConfig::default(),
            encounter: EncounterConfig::default(),
            rewards: RewardConfig::default(),
            ranks: RankTable::default(),
            abilities: default_ability_tree(),
            pets: PetCatalog::default(),
        }
    }
}

impl EngineConfig {
    /// Check every table for programmer mistakes
    pub fn validate(&self) -> Result<(), EngineError> {
        self.scoring.validate()?;
        self.sprint.validate()?;
        self.encounter.validate()?;
        self.rewards.validate()?;
        self.ranks.validate()?;
        self.pets.validate()?;
        Ok(())
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Upper bound for any configured delay or interval, one week
pub const MAX_DURATION_SECS: f64 = 604_800.0;

fn in_duration_range(value: f64) -> bool {
    (0.0..=MAX_DURATION_SECS).contains(&value)
}

pub(crate) fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

pub(crate) fn invalid(message: impl Into<String>) -> EngineError {
    EngineError::InvalidConfig(message.into())
}
