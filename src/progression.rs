//! Progression ledger
//!
//! Rank and division are pure functions of reputation points, level is a
//! pure function of experience and a pet's evolution stage is a pure function
//! of its experience. None of them is ever stored. The ledger also owns the
//! calendar rules: consecutive-day streaks, inactivity decay and the weekly
//! RP reset.

use crate::config::invalid;
use crate::error::EngineError;
use crate::roll::Roller;
use crate::types::{LootRarity, RewardBundle};
use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Highest reachable player level
pub const MAX_LEVEL: u32 = 100;

/// XP cost scale of the level curve
const LEVEL_COST_BASE: f64 = 100.0;

/// Exponent of the level curve
const LEVEL_COST_EXPONENT: f64 = 1.5;

/// Highest pet evolution stage
pub const MAX_EVOLUTION_STAGE: u32 = 10;

/// Pet XP scale of the evolution curve
const EVOLUTION_XP_STEP: u64 = 100;

/// Divisions within a rank
pub const DIVISIONS_PER_RANK: u8 = 3;

/// Player rank, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl Rank {
    pub const ALL: [Rank; 5] = [
        Rank::Bronze,
        Rank::Silver,
        Rank::Gold,
        Rank::Platinum,
        Rank::Diamond,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Bronze => "bronze",
            Rank::Silver => "silver",
            Rank::Gold => "gold",
            Rank::Platinum => "platinum",
            Rank::Diamond => "diamond",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static content for one rank
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankTier {
    pub rank: Rank,
    /// RP needed to reach this rank
    pub base_rp: u64,
    /// Reward bonus fraction applied to RP, XP and coins
    pub reward_bonus: f64,
    /// Smallest RP loss per missed day
    pub decay_min: u32,
    /// Largest RP loss per missed day
    pub decay_max: u32,
}

impl RankTier {
    pub fn is_decay_exempt(&self) -> bool {
        self.decay_max == 0
    }
}

/// Rank ladder, ordered from Bronze to Diamond
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankTable {
    pub tiers: Vec<RankTier>,
    /// RP at which the top rank's last division ends
    pub top_rank_ceiling_rp: u64,
}

impl Default for RankTable {
    fn default() -> Self {
        let tier = |rank, base_rp, reward_bonus, decay_min, decay_max| RankTier {
            rank,
            base_rp,
            reward_bonus,
            decay_min,
            decay_max,
        };
        Self {
            tiers: vec![
                tier(Rank::Bronze, 0, 0.0, 0, 0),
                tier(Rank::Silver, 1_000, 0.05, 5, 10),
                tier(Rank::Gold, 3_000, 0.10, 10, 20),
                tier(Rank::Platinum, 6_000, 0.15, 20, 35),
                tier(Rank::Diamond, 10_000, 0.20, 35, 50),
            ],
            top_rank_ceiling_rp: 20_000,
        }
    }
}

/// Where a player sits on the rank ladder
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub rank: Rank,
    /// 1 is the entry division, 3 the top
    pub division: u8,
    /// Progress through the current division (0-1)
    pub division_progress: f64,
}

impl RankTable {
    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        let ranks: Vec<Rank> = self.tiers.iter().map(|t| t.rank).collect();
        if ranks != Rank::ALL {
            return Err(invalid("rank table must list bronze through diamond in order"));
        }
        if self.tiers[0].base_rp != 0 {
            return Err(invalid("the lowest rank must start at 0 RP"));
        }
        if self
            .tiers
            .windows(2)
            .any(|pair| pair[0].base_rp >= pair[1].base_rp)
        {
            return Err(invalid("rank thresholds must be strictly increasing"));
        }
        if self.tiers.iter().any(|t| t.decay_min > t.decay_max) {
            return Err(invalid("rank decay ranges must have min <= max"));
        }
        let top = self.tiers[self.tiers.len() - 1].base_rp;
        if self.top_rank_ceiling_rp <= top {
            return Err(invalid("top_rank_ceiling_rp must exceed the top rank threshold"));
        }
        Ok(())
    }

    fn tier_index(&self, rp: u64) -> usize {
        self.tiers
            .iter()
            .rposition(|tier| tier.base_rp <= rp)
            .unwrap_or(0)
    }

    /// Tier content for the rank held at `rp`
    pub fn tier_for_rp(&self, rp: u64) -> &RankTier {
        &self.tiers[self.tier_index(rp)]
    }

    /// Highest rank whose threshold is at most `rp`
    pub fn rank_for_rp(&self, rp: u64) -> Rank {
        self.tier_for_rp(rp).rank
    }

    /// Division (1-3) within the current rank.
    ///
    /// Lower ranks split the span up to the next rank's threshold into three
    /// equal divisions. The top rank has no next threshold and splits the span
    /// up to `top_rank_ceiling_rp` instead.
    pub fn division_for_rp(&self, rp: u64) -> u8 {
        self.standing(rp).division
    }

    pub fn standing(&self, rp: u64) -> Standing {
        let index = self.tier_index(rp);
        let tier = &self.tiers[index];
        let upper = self
            .tiers
            .get(index + 1)
            .map(|next| next.base_rp)
            .unwrap_or(self.top_rank_ceiling_rp);

        let width = upper.saturating_sub(tier.base_rp) as f64 / DIVISIONS_PER_RANK as f64;
        if width <= 0.0 {
            return Standing {
                rank: tier.rank,
                division: DIVISIONS_PER_RANK,
                division_progress: 1.0,
            };
        }

        let into_rank = rp.saturating_sub(tier.base_rp) as f64;
        let slot = (into_rank / width).floor();
        if slot >= DIVISIONS_PER_RANK as f64 {
            return Standing {
                rank: tier.rank,
                division: DIVISIONS_PER_RANK,
                division_progress: 1.0,
            };
        }

        Standing {
            rank: tier.rank,
            division: slot as u8 + 1,
            division_progress: ((into_rank - slot * width) / width).clamp(0.0, 1.0),
        }
    }
}

/// XP needed to advance from `level` to `level + 1`
pub fn level_cost(level: u32) -> u64 {
    (LEVEL_COST_BASE * (level as f64).powf(LEVEL_COST_EXPONENT)).floor() as u64
}

/// Total XP needed to reach `level`
pub fn xp_for_level(level: u32) -> u64 {
    (1..level.clamp(1, MAX_LEVEL)).map(level_cost).sum()
}

/// Player level for a total amount of experience
pub fn level_for_xp(xp: u64) -> u32 {
    let mut level = 1;
    let mut threshold = 0u64;
    while level < MAX_LEVEL {
        let next = threshold + level_cost(level);
        if next > xp {
            break;
        }
        threshold = next;
        level += 1;
    }
    level
}

/// Total pet XP needed to reach an evolution stage
pub fn xp_for_stage(stage: u32) -> u64 {
    let steps = stage.clamp(1, MAX_EVOLUTION_STAGE) as u64 - 1;
    EVOLUTION_XP_STEP * steps * steps
}

/// Pet evolution stage for a total amount of pet experience
pub fn stage_for_xp(xp: u64) -> u32 {
    let mut stage = 1;
    while stage < MAX_EVOLUTION_STAGE && xp_for_stage(stage + 1) <= xp {
        stage += 1;
    }
    stage
}

/// Next weekly reset boundary strictly after `now` (Monday 00:00 UTC)
pub fn next_weekly_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    let from_monday = today.weekday().num_days_from_monday() as i64;
    let next_monday = today + ChronoDuration::days(7 - from_monday);
    next_monday
        .and_hms_opt(0, 0, 0)
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .unwrap_or(now)
}

/// Summary of one inactivity decay pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecayReport {
    /// Fully missed days that had not been decayed before
    pub missed_days: u32,
    /// RP removed
    pub rp_lost: u64,
}

/// Rank and level before and after a reward was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerChange {
    pub previous_rank: Rank,
    pub rank: Rank,
    pub previous_level: u32,
    pub level: u32,
}

/// Durable progression record for a player
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionLedger {
    pub reputation_points: u64,
    pub weekly_rp: u64,
    pub experience: u64,
    pub coins: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_activity_date: Option<NaiveDate>,
    /// Last missed day already charged by decay
    pub decayed_through: Option<NaiveDate>,
    pub weekly_reset_at: Option<DateTime<Utc>>,
    /// Unlocked ability tree node ids
    pub unlocked_abilities: BTreeSet<String>,
    /// Loot collected, by rarity
    pub loot_inventory: BTreeMap<LootRarity, u32>,
}

impl ProgressionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current level, always derived from experience
    pub fn level(&self) -> u32 {
        level_for_xp(self.experience)
    }

    pub fn rank(&self, ranks: &RankTable) -> Rank {
        ranks.rank_for_rp(self.reputation_points)
    }

    pub fn standing(&self, ranks: &RankTable) -> Standing {
        ranks.standing(self.reputation_points)
    }

    pub fn unlock_ability(&mut self, id: &str) -> bool {
        self.unlocked_abilities.insert(id.to_string())
    }

    /// Add a reward bundle's currencies and loot
    pub fn apply_reward(&mut self, bundle: &RewardBundle, ranks: &RankTable) -> LedgerChange {
        let previous_rank = self.rank(ranks);
        let previous_level = self.level();

        self.reputation_points = self.reputation_points.saturating_add(bundle.rp as u64);
        self.weekly_rp = self.weekly_rp.saturating_add(bundle.rp as u64);
        self.experience = self.experience.saturating_add(bundle.xp as u64);
        self.coins = self.coins.saturating_add(bundle.coins as u64);
        if let Some(rarity) = bundle.loot_rarity {
            *self.loot_inventory.entry(rarity).or_insert(0) += 1;
        }

        LedgerChange {
            previous_rank,
            rank: self.rank(ranks),
            previous_level,
            level: self.level(),
        }
    }

    /// Charge RP for every fully missed day since the last activity.
    ///
    /// The activity day and `today` are never charged, and a day is never
    /// charged twice. Each day draws from the decay range of the rank held at
    /// that point, so decay slows as the player drops down the ladder.
    pub fn apply_daily_decay(
        &mut self,
        today: NaiveDate,
        ranks: &RankTable,
        roller: &mut dyn Roller,
    ) -> DecayReport {
        let Some(last) = self.last_activity_date else {
            return DecayReport::default();
        };

        let first_missed = match self.decayed_through {
            Some(done) if done >= last => done + ChronoDuration::days(1),
            _ => last + ChronoDuration::days(1),
        };
        let missed_days = (today - first_missed).num_days();
        if missed_days <= 0 {
            return DecayReport::default();
        }

        let mut report = DecayReport {
            missed_days: missed_days.min(u32::MAX as i64) as u32,
            rp_lost: 0,
        };
        for _ in 0..missed_days {
            let tier = ranks.tier_for_rp(self.reputation_points);
            if tier.is_decay_exempt() || self.reputation_points == 0 {
                break;
            }
            let amount = roller.range_inclusive(tier.decay_min, tier.decay_max) as u64;
            let lost = amount.min(self.reputation_points);
            self.reputation_points -= lost;
            report.rp_lost += lost;
        }
        self.decayed_through = Some(today - ChronoDuration::days(1));
        report
    }

    /// Update the consecutive-day streak for activity on `today`
    pub fn update_streak(&mut self, today: NaiveDate) {
        match self.last_activity_date {
            None => self.current_streak = 1,
            Some(last) => match (today - last).num_days() {
                1 => self.current_streak = self.current_streak.saturating_add(1),
                days if days > 1 => self.current_streak = 1,
                // Same day, or a clock that went backwards
                _ => {}
            },
        }
        self.current_streak = self.current_streak.max(1);
        self.longest_streak = self.longest_streak.max(self.current_streak);
    }

    /// Record activity on `today`: update the streak and the activity date
    pub fn record_activity(&mut self, today: NaiveDate) {
        self.update_streak(today);
        if self.last_activity_date.map_or(true, |last| today > last) {
            self.last_activity_date = Some(today);
        }
    }

    /// Zero the weekly counter once `now` passes the reset boundary.
    ///
    /// Returns true if a reset happened. A ledger with no boundary yet only
    /// schedules one.
    pub fn weekly_reset(&mut self, now: DateTime<Utc>) -> bool {
        match self.weekly_reset_at {
            Some(reset_at) if now >= reset_at => {
                self.weekly_rp = 0;
                self.weekly_reset_at = Some(next_weekly_boundary(now));
                true
            }
            Some(_) => false,
            None => {
                self.weekly_reset_at = Some(next_weekly_boundary(now));
                false
            }
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
    use crate::roll::{RngRoller, ScriptedRoller};
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_rank_for_rp() {
        let ranks = RankTable::default();
        assert_eq!(ranks.rank_for_rp(0), Rank::Bronze);
        assert_eq!(ranks.rank_for_rp(999), Rank::Bronze);
        for tier in &ranks.tiers {
            assert_eq!(ranks.rank_for_rp(tier.base_rp), tier.rank);
        }
        assert_eq!(ranks.rank_for_rp(1_000_000), Rank::Diamond);
    }

    #[test]
    fn test_divisions_for_lower_ranks() {
        let ranks = RankTable::default();
        // Silver spans 1000..3000, divisions of 666.67
        assert_eq!(ranks.division_for_rp(1_000), 1);
        assert_eq!(ranks.division_for_rp(1_666), 1);
        assert_eq!(ranks.division_for_rp(1_667), 2);
        assert_eq!(ranks.division_for_rp(2_400), 3);
        assert_eq!(ranks.division_for_rp(2_999), 3);
        assert_eq!(ranks.division_for_rp(0), 1);
    }

    #[test]
    fn test_top_rank_divisions_use_ceiling() {
        // Diamond has no next threshold; its divisions split 10000..20000
        // rather than following the next-rank rule used below it.
        let mut ranks = RankTable::default();
        assert_eq!(ranks.division_for_rp(10_000), 1);
        assert_eq!(ranks.division_for_rp(13_334), 2);
        assert_eq!(ranks.division_for_rp(16_667), 3);
        assert_eq!(ranks.division_for_rp(50_000), 3);

        ranks.top_rank_ceiling_rp = 13_000;
        assert_eq!(ranks.division_for_rp(11_000), 2);
        assert_eq!(ranks.division_for_rp(12_500), 3);
    }

    #[test]
    fn test_standing_progress() {
        let ranks = RankTable::default();
        let standing = ranks.standing(500);
        assert_eq!(standing.rank, Rank::Bronze);
        assert_eq!(standing.division, 2);
        assert!((standing.division_progress - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_invalid_rank_tables() {
        let mut ranks = RankTable::default();
        ranks.tiers.swap(1, 2);
        assert!(ranks.validate().is_err());

        let mut ranks = RankTable::default();
        ranks.top_rank_ceiling_rp = 10_000;
        assert!(ranks.validate().is_err());

        let mut ranks = RankTable::default();
        ranks.tiers[2].decay_min = 30;
        assert!(ranks.validate().is_err());
    }

    #[test]
    fn test_level_curve() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_cost(1), 100);
        assert_eq!(level_cost(2), 282);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(100), 2);
        assert_eq!(level_for_xp(381), 2);
        assert_eq!(level_for_xp(382), 3);
        assert_eq!(xp_for_level(3), 382);
        assert_eq!(level_for_xp(u64::MAX), MAX_LEVEL);
        assert_eq!(level_for_xp(xp_for_level(MAX_LEVEL)), MAX_LEVEL);
    }

    #[test]
    fn test_level_is_monotonic() {
        let mut previous = 1;
        for xp in (0..2_000_000u64).step_by(997) {
            let level = level_for_xp(xp);
            assert!(level >= previous);
            assert!(level <= MAX_LEVEL);
            previous = level;
        }
    }

    #[test]
    fn test_evolution_stages() {
        assert_eq!(stage_for_xp(0), 1);
        assert_eq!(stage_for_xp(99), 1);
        assert_eq!(stage_for_xp(100), 2);
        assert_eq!(stage_for_xp(400), 3);
        assert_eq!(stage_for_xp(8_100), 10);
        assert_eq!(stage_for_xp(u64::MAX), MAX_EVOLUTION_STAGE);
    }

    #[test]
    fn test_apply_reward_adds_exact_amounts() {
        let ranks = RankTable::default();
        let mut ledger = ProgressionLedger {
            reputation_points: 990,
            weekly_rp: 40,
            experience: 90,
            ..Default::default()
        };
        let bundle = RewardBundle {
            rp: 25,
            xp: 50,
            coins: 10,
            loot_rarity: Some(LootRarity::Rare),
            caught_pet_id: None,
        };

        let change = ledger.apply_reward(&bundle, &ranks);

        assert_eq!(ledger.reputation_points, 1_015);
        assert_eq!(ledger.weekly_rp, 65);
        assert_eq!(ledger.experience, 140);
        assert_eq!(ledger.coins, 10);
        assert_eq!(ledger.level(), level_for_xp(140));
        assert_eq!(ledger.loot_inventory.get(&LootRarity::Rare), Some(&1));
        assert_eq!(change.previous_rank, Rank::Bronze);
        assert_eq!(change.rank, Rank::Silver);
        assert_eq!(change.previous_level, 1);
        assert_eq!(change.level, 2);
    }

    #[test]
    fn test_bronze_never_decays() {
        let ranks = RankTable::default();
        let mut ledger = ProgressionLedger {
            reputation_points: 900,
            last_activity_date: Some(date(2024, 1, 1)),
            ..Default::default()
        };
        let mut roller = ScriptedRoller::constant(0.99);
        let report = ledger.apply_daily_decay(date(2024, 3, 1), &ranks, &mut roller);
        assert_eq!(ledger.reputation_points, 900);
        assert_eq!(report.rp_lost, 0);
        assert!(report.missed_days > 50);
    }

    #[test]
    fn test_decay_skips_activity_day_and_today() {
        let ranks = RankTable::default();
        let mut ledger = ProgressionLedger {
            reputation_points: 5_000,
            last_activity_date: Some(date(2024, 1, 10)),
            ..Default::default()
        };
        // Gold decays 10-20 per day; 0.0 always draws the minimum
        let mut roller = ScriptedRoller::constant(0.0);

        // Next day: nothing missed
        let report = ledger.apply_daily_decay(date(2024, 1, 11), &ranks, &mut roller);
        assert_eq!(report, DecayReport::default());

        // Three days later: the 11th and 12th were missed
        let report = ledger.apply_daily_decay(date(2024, 1, 13), &ranks, &mut roller);
        assert_eq!(report.missed_days, 2);
        assert_eq!(report.rp_lost, 20);
        assert_eq!(ledger.reputation_points, 4_980);

        // Checking again the same day charges nothing more
        let report = ledger.apply_daily_decay(date(2024, 1, 13), &ranks, &mut roller);
        assert_eq!(report.rp_lost, 0);

        // One more day: only the 13th is new
        let report = ledger.apply_daily_decay(date(2024, 1, 14), &ranks, &mut roller);
        assert_eq!(report.missed_days, 1);
        assert_eq!(ledger.reputation_points, 4_970);
    }

    #[test]
    fn test_decay_floors_at_bronze_boundary_behaviour() {
        let ranks = RankTable::default();
        let mut ledger = ProgressionLedger {
            reputation_points: 1_004,
            last_activity_date: Some(date(2024, 1, 1)),
            ..Default::default()
        };
        let mut roller = RngRoller::seeded(3);
        ledger.apply_daily_decay(date(2024, 2, 1), &ranks, &mut roller);
        // Silver decays at least 5, which drops into exempt Bronze
        assert!(ledger.reputation_points < 1_000);
        assert!(ledger.reputation_points >= 994);
    }

    #[test]
    fn test_decay_without_activity_is_noop() {
        let ranks = RankTable::default();
        let mut ledger = ProgressionLedger {
            reputation_points: 5_000,
            ..Default::default()
        };
        let mut roller = ScriptedRoller::constant(0.5);
        let report = ledger.apply_daily_decay(date(2024, 1, 13), &ranks, &mut roller);
        assert_eq!(report, DecayReport::default());
        assert_eq!(ledger.reputation_points, 5_000);
    }

    #[test]
    fn test_streak_rules() {
        let mut ledger = ProgressionLedger::new();

        ledger.record_activity(date(2024, 1, 1));
        assert_eq!(ledger.current_streak, 1);

        ledger.record_activity(date(2024, 1, 1));
        assert_eq!(ledger.current_streak, 1);

        ledger.record_activity(date(2024, 1, 2));
        ledger.record_activity(date(2024, 1, 3));
        assert_eq!(ledger.current_streak, 3);
        assert_eq!(ledger.longest_streak, 3);

        ledger.record_activity(date(2024, 1, 6));
        assert_eq!(ledger.current_streak, 1);
        assert_eq!(ledger.longest_streak, 3);
        assert_eq!(ledger.last_activity_date, Some(date(2024, 1, 6)));
    }

    #[test]
    fn test_weekly_boundary_is_next_monday() {
        // 2024-01-17 is a Wednesday
        let now = Utc.with_ymd_and_hms(2024, 1, 17, 15, 30, 0).unwrap();
        assert_eq!(
            next_weekly_boundary(now),
            Utc.with_ymd_and_hms(2024, 1, 22, 0, 0, 0).unwrap()
        );

        // A Monday rolls over to the following Monday
        let monday = Utc.with_ymd_and_hms(2024, 1, 22, 0, 0, 0).unwrap();
        assert_eq!(
            next_weekly_boundary(monday),
            Utc.with_ymd_and_hms(2024, 1, 29, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_weekly_reset() {
        let mut ledger = ProgressionLedger {
            weekly_rp: 300,
            reputation_points: 300,
            ..Default::default()
        };

        let wednesday = Utc.with_ymd_and_hms(2024, 1, 17, 12, 0, 0).unwrap();
        assert!(!ledger.weekly_reset(wednesday));
        assert_eq!(ledger.weekly_rp, 300);

        let sunday = Utc.with_ymd_and_hms(2024, 1, 21, 23, 59, 0).unwrap();
        assert!(!ledger.weekly_reset(sunday));

        let monday = Utc.with_ymd_and_hms(2024, 1, 22, 0, 0, 0).unwrap();
        assert!(ledger.weekly_reset(monday));
        assert_eq!(ledger.weekly_rp, 0);
        assert_eq!(ledger.reputation_points, 300);
        assert_eq!(
            ledger.weekly_reset_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 29, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_ledger_serialization() {
        let mut ledger = ProgressionLedger::new();
        ledger.unlock_ability("champion");
        ledger.record_activity(date(2024, 1, 1));
        let json = ledger.to_json().unwrap();
        let loaded = ProgressionLedger::from_json(&json).unwrap();
        assert_eq!(loaded, ledger);
    }
}
