//! Encounter scheduling
//!
//! During a run the scheduler is polled with the run clock. Every
//! `check_interval` it decides whether an encounter fires, based on how long
//! it has been since the run started or since the previous encounter (`Δ`):
//!
//! - nothing fires during warm-up, while an encounter is active, or during
//!   the recovery window after one resolves
//! - `Δ ≤ min_interval` skips the check without consuming a roll
//! - otherwise the tier probability (plus any pet boost) is rolled against,
//!   and `Δ ≥ pity_timer` guarantees a trigger

use crate::config::EncounterConfig;
use crate::roll::Roller;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest check cadence used when a zero interval slips through
const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(1);

/// Per-run encounter bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterState {
    pub is_active: bool,
    pub last_encounter_time: Option<Duration>,
    pub is_in_recovery: bool,
    pub recovery_ends_at: Option<Duration>,
    pub run_start_time: Duration,
}

/// Encounter probability for a given `Δ`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EncounterProbability {
    Chance(f64),
    Guaranteed,
}

/// Outcome of a single encounter check
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EncounterCheck {
    /// No run in progress
    NotRunning,
    /// An encounter is already active
    Active,
    InRecovery,
    WarmingUp,
    /// `Δ` has not passed the minimum interval
    TooSoon { delta_secs: f64 },
    Missed { probability: f64, roll: f64 },
    Triggered {
        probability: f64,
        /// `None` when the pity timer fired without a roll
        roll: Option<f64>,
        guaranteed: bool,
    },
}

impl EncounterCheck {
    pub fn triggered(&self) -> bool {
        matches!(self, EncounterCheck::Triggered { .. })
    }
}

/// Time-gated probabilistic encounter engine
#[derive(Debug, Clone)]
pub struct EncounterScheduler {
    config: EncounterConfig,
    state: EncounterState,
    running: bool,
    next_check_at: Duration,
    probability_boost: f64,
}

impl Default for EncounterScheduler {
    fn default() -> Self {
        Self::new(EncounterConfig::default())
    }
}

impl EncounterScheduler {
    pub fn new(config: EncounterConfig) -> Self {
        Self {
            config,
            state: EncounterState::default(),
            running: false,
            next_check_at: Duration::ZERO,
            probability_boost: 0.0,
        }
    }

    /// Reset all encounter state and begin checking from `now`
    pub fn start_run(&mut self, now: Duration) {
        self.state = EncounterState {
            run_start_time: now,
            ..Default::default()
        };
        self.running = true;
        self.next_check_at = now + self.check_interval();
        tracing::debug!(run_start = now.as_secs_f64(), "encounter scheduler started");
    }

    pub fn end_run(&mut self) {
        self.running = false;
        self.state = EncounterState::default();
    }

    /// Additive probability boost, typically from the equipped pet
    pub fn set_probability_boost(&mut self, boost: f64) {
        self.probability_boost = if boost.is_finite() { boost } else { 0.0 };
    }

    pub fn probability_boost(&self) -> f64 {
        self.probability_boost
    }

    /// Base probability for `Δ`, before any boost
    pub fn probability_for(&self, delta: Duration) -> EncounterProbability {
        let delta_secs = delta.as_secs_f64();
        if delta_secs >= self.config.pity_timer_secs {
            return EncounterProbability::Guaranteed;
        }
        if let Some(tier) = self.config.tiers.iter().find(|t| t.contains(delta_secs)) {
            return EncounterProbability::Chance(tier.probability);
        }
        match self.config.tiers.last() {
            Some(last) if delta_secs >= last.to_secs => {
                EncounterProbability::Chance(self.config.max_probability)
            }
            _ => EncounterProbability::Chance(0.0),
        }
    }

    /// Leave recovery once `recovery_ends_at` has passed. Returns true if
    /// recovery ended on this call.
    pub fn update_recovery(&mut self, now: Duration) -> bool {
        if !self.state.is_in_recovery {
            return false;
        }
        match self.state.recovery_ends_at {
            Some(ends_at) if now < ends_at => false,
            _ => {
                self.state.is_in_recovery = false;
                self.state.recovery_ends_at = None;
                tracing::debug!(at = now.as_secs_f64(), "encounter recovery ended");
                true
            }
        }
    }

    /// Run one encounter check at `now`
    pub fn check(&mut self, now: Duration, roller: &mut dyn Roller) -> EncounterCheck {
        if !self.running {
            return EncounterCheck::NotRunning;
        }
        if self.state.is_active {
            return EncounterCheck::Active;
        }
        if self.state.is_in_recovery {
            return EncounterCheck::InRecovery;
        }

        let run_elapsed = now.saturating_sub(self.state.run_start_time);
        if run_elapsed <= self.config.warm_up() {
            return EncounterCheck::WarmingUp;
        }

        let since = self
            .state
            .last_encounter_time
            .unwrap_or(self.state.run_start_time);
        let delta = now.saturating_sub(since);
        if delta <= self.config.min_interval() {
            return EncounterCheck::TooSoon {
                delta_secs: delta.as_secs_f64(),
            };
        }

        let outcome = match self.probability_for(delta) {
            EncounterProbability::Guaranteed => EncounterCheck::Triggered {
                probability: 1.0,
                roll: None,
                guaranteed: true,
            },
            EncounterProbability::Chance(base) => {
                let probability = base + self.probability_boost;
                let roll = roller.roll();
                if roll < probability {
                    EncounterCheck::Triggered {
                        probability,
                        roll: Some(roll),
                        guaranteed: false,
                    }
                } else {
                    EncounterCheck::Missed { probability, roll }
                }
            }
        };

        if outcome.triggered() {
            self.state.is_active = true;
            self.state.last_encounter_time = Some(now);
            tracing::info!(
                at = now.as_secs_f64(),
                delta_secs = delta.as_secs_f64(),
                ?outcome,
                "encounter triggered"
            );
        } else {
            tracing::trace!(at = now.as_secs_f64(), ?outcome, "encounter check");
        }
        outcome
    }

    /// Run a check if one is due at `now`.
    ///
    /// At most one check runs per call; check boundaries crossed since the
    /// last poll are coalesced.
    pub fn poll(&mut self, now: Duration, roller: &mut dyn Roller) -> Option<EncounterCheck> {
        self.update_recovery(now);
        if !self.running || now < self.next_check_at {
            return None;
        }
        self.next_check_at = next_boundary(self.next_check_at, self.check_interval(), now);
        Some(self.check(now, roller))
    }

    /// Finish the active encounter and enter recovery
    pub fn resolve(&mut self, now: Duration) -> bool {
        if !self.state.is_active {
            tracing::debug!("resolve ignored, no active encounter");
            return false;
        }
        self.state.is_active = false;
        self.state.is_in_recovery = true;
        self.state.recovery_ends_at = Some(now + self.config.recovery());
        true
    }

    pub fn state(&self) -> &EncounterState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn next_check_at(&self) -> Duration {
        self.next_check_at
    }

    fn check_interval(&self) -> Duration {
        self.config.check_interval().max(MIN_CHECK_INTERVAL)
    }
}

/// First boundary `due + k × interval` strictly after `now`, for `due <= now`
fn next_boundary(due: Duration, interval: Duration, now: Duration) -> Duration {
    let step = interval.as_nanos().max(1);
    let skipped = (now - due).as_nanos() / step + 1;
    let Some(offset) = skipped.checked_mul(step) else {
        return Duration::MAX;
    };
    let total = due.as_nanos().saturating_add(offset);
    match u64::try_from(total / 1_000_000_000) {
        Ok(secs) => Duration::new(secs, (total % 1_000_000_000) as u32),
        Err(_) => Duration::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roll::ScriptedRoller;

    fn at(secs: u64) -> Duration {
        Duration::from_secs(secs)
    }

    fn started() -> EncounterScheduler {
        let mut scheduler = EncounterScheduler::default();
        scheduler.start_run(Duration::ZERO);
        scheduler
    }

    #[test]
    fn test_probability_tiers() {
        let scheduler = EncounterScheduler::default();
        let chance = |secs| scheduler.probability_for(at(secs));
        assert_eq!(chance(30), EncounterProbability::Chance(0.0));
        assert_eq!(chance(60), EncounterProbability::Chance(0.02));
        assert_eq!(chance(89), EncounterProbability::Chance(0.02));
        assert_eq!(chance(90), EncounterProbability::Chance(0.05));
        assert_eq!(chance(150), EncounterProbability::Chance(0.10));
        assert_eq!(chance(239), EncounterProbability::Chance(0.20));
        assert_eq!(chance(299), EncounterProbability::Chance(0.35));
        assert_eq!(chance(300), EncounterProbability::Chance(0.50));
        assert_eq!(chance(419), EncounterProbability::Chance(0.50));
        assert_eq!(chance(420), EncounterProbability::Guaranteed);
    }

    #[test]
    fn test_no_trigger_during_warm_up_even_with_zero_roll() {
        let mut scheduler = started();
        let mut roller = ScriptedRoller::constant(0.0);
        for t in (10..=60).step_by(10) {
            let check = scheduler.poll(at(t), &mut roller);
            assert_eq!(check, Some(EncounterCheck::WarmingUp), "t={t}");
        }
        assert!(!scheduler.state().is_active);
    }

    #[test]
    fn test_warm_up_then_trigger_then_recovery() {
        let mut scheduler = started();
        let mut zero = ScriptedRoller::constant(0.0);
        for t in (10..=60).step_by(10) {
            assert!(!scheduler.poll(at(t), &mut zero).unwrap().triggered());
        }

        let mut roller = ScriptedRoller::new([0.01]);
        let check = scheduler.poll(at(70), &mut roller).unwrap();
        assert_eq!(
            check,
            EncounterCheck::Triggered {
                probability: 0.02,
                roll: Some(0.01),
                guaranteed: false
            }
        );
        assert!(scheduler.state().is_active);
        assert_eq!(scheduler.state().last_encounter_time, Some(at(70)));

        // Active encounters block further checks
        assert_eq!(scheduler.poll(at(80), &mut zero), Some(EncounterCheck::Active));

        assert!(scheduler.resolve(at(100)));
        assert_eq!(scheduler.state().recovery_ends_at, Some(at(145)));
        for t in [110, 120, 130, 140] {
            assert_eq!(scheduler.poll(at(t), &mut zero), Some(EncounterCheck::InRecovery));
        }

        // Recovery over at 150, Δ = 80 => tier 0.02
        let check = scheduler.poll(at(150), &mut ScriptedRoller::new([0.5])).unwrap();
        assert_eq!(
            check,
            EncounterCheck::Missed {
                probability: 0.02,
                roll: 0.5
            }
        );
        assert!(!scheduler.state().is_in_recovery);
    }

    #[test]
    fn test_min_interval_skips_without_rolling() {
        let mut scheduler = started();
        scheduler.poll(at(70), &mut ScriptedRoller::new([0.0]));
        scheduler.resolve(at(75));

        let mut roller = ScriptedRoller::new([0.0]);
        // Recovery ends at 120; Δ = 50 at t=120, 60 at t=130
        for t in [120, 130] {
            let check = scheduler.poll(at(t), &mut roller).unwrap();
            assert!(matches!(check, EncounterCheck::TooSoon { .. }), "t={t}");
        }
        assert_eq!(roller.remaining(), 1);
        assert!(scheduler.poll(at(140), &mut roller).unwrap().triggered());
        assert_eq!(roller.remaining(), 0);
    }

    #[test]
    fn test_pity_timer_guarantees_trigger() {
        let mut scheduler = started();
        let mut roller = ScriptedRoller::constant(0.999);
        let mut fired = None;
        for t in (10..=600).step_by(10) {
            if let Some(check) = scheduler.poll(at(t), &mut roller) {
                if check.triggered() {
                    fired = Some((t, check));
                    break;
                }
            }
        }
        let (t, check) = fired.unwrap();
        assert_eq!(t, 420);
        assert_eq!(
            check,
            EncounterCheck::Triggered {
                probability: 1.0,
                roll: None,
                guaranteed: true
            }
        );
    }

    #[test]
    fn test_poll_coalesces_missed_checks() {
        let mut scheduler = started();
        let mut roller = ScriptedRoller::constant(0.999);
        assert_eq!(scheduler.poll(at(5), &mut roller), None);
        assert!(scheduler.poll(at(95), &mut roller).is_some());
        assert_eq!(scheduler.next_check_at(), at(100));
        assert_eq!(scheduler.poll(at(99), &mut roller), None);
    }

    #[test]
    fn test_poll_after_long_gap_lands_on_next_boundary() {
        let mut scheduler = started();
        let mut roller = ScriptedRoller::constant(0.999);
        let gap = at(10_000_000_005);
        assert!(scheduler.poll(gap, &mut roller).is_some());
        assert_eq!(scheduler.next_check_at(), at(10_000_000_010));
        assert_eq!(scheduler.poll(at(10_000_000_009), &mut roller), None);
    }

    #[test]
    fn test_next_boundary() {
        assert_eq!(next_boundary(at(10), at(10), at(10)), at(20));
        assert_eq!(next_boundary(at(10), at(10), at(95)), at(100));
        assert_eq!(
            next_boundary(at(10), Duration::from_millis(1), Duration::from_millis(10_002)),
            Duration::from_millis(10_003)
        );
        assert_eq!(next_boundary(at(10), at(10), Duration::MAX), Duration::MAX);
    }

    #[test]
    fn test_boost_is_not_clamped() {
        let mut scheduler = started();
        scheduler.set_probability_boost(1.5);
        let check = scheduler.poll(at(70), &mut ScriptedRoller::new([0.99])).unwrap();
        match check {
            EncounterCheck::Triggered { probability, .. } => {
                assert!((probability - 1.52).abs() < 1e-9)
            }
            other => panic!("expected trigger, got {other:?}"),
        }
    }

    #[test]
    fn test_not_running() {
        let mut scheduler = EncounterScheduler::default();
        let mut roller = ScriptedRoller::constant(0.0);
        assert_eq!(scheduler.check(at(500), &mut roller), EncounterCheck::NotRunning);
        assert_eq!(scheduler.poll(at(500), &mut roller), None);

        let mut scheduler = started();
        scheduler.end_run();
        assert_eq!(scheduler.poll(at(500), &mut roller), None);
        assert!(!scheduler.resolve(at(500)));
    }

    #[test]
    fn test_run_offset_start() {
        let mut scheduler = EncounterScheduler::default();
        scheduler.start_run(at(1000));
        let mut roller = ScriptedRoller::constant(0.0);
        assert_eq!(scheduler.poll(at(1060), &mut roller), Some(EncounterCheck::WarmingUp));
        assert!(scheduler.poll(at(1070), &mut roller).unwrap().triggered());
    }
}
