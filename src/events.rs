//! Engine events and observers
//!
//! Everything observable about a run is published as an [`EngineEvent`].
//! Hosts register [`EngineObserver`]s on the engine's [`EventBus`]; none are
//! required and observers cannot influence gameplay.

use crate::progression::Rank;
use crate::types::{LootRarity, RewardBundle, SprintResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Something that happened during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    SprintStarted {
        session_id: Uuid,
        target_secs: f64,
        baseline_heart_rate: u32,
    },
    /// Seconds left before the sprint goes active
    CountdownTick { remaining: u32 },
    SprintActive { session_id: Uuid },
    SprintEnded { result: SprintResult },
    SprintCancelled { session_id: Uuid },
    SprintReset,
    EncounterTriggered {
        /// Run clock (seconds since run start)
        at_secs: f64,
        probability: f64,
        guaranteed: bool,
    },
    RecoveryEnded { at_secs: f64 },
    LootDropped { rarity: LootRarity },
    PetCaught { species_id: String },
    PetEvolved { species_id: String, stage: u32 },
    RewardApplied {
        session_id: Uuid,
        bundle: RewardBundle,
    },
    RankChanged { previous: Rank, rank: Rank },
    LevelUp { previous: u32, level: u32 },
    DecayApplied { missed_days: u32, rp_lost: u64 },
    WeeklyReset,
}

impl EngineEvent {
    /// Stable event name, matching the serialized `event` tag
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::SprintStarted { .. } => "sprint_started",
            EngineEvent::CountdownTick { .. } => "countdown_tick",
            EngineEvent::SprintActive { .. } => "sprint_active",
            EngineEvent::SprintEnded { .. } => "sprint_ended",
            EngineEvent::SprintCancelled { .. } => "sprint_cancelled",
            EngineEvent::SprintReset => "sprint_reset",
            EngineEvent::EncounterTriggered { .. } => "encounter_triggered",
            EngineEvent::RecoveryEnded { .. } => "recovery_ended",
            EngineEvent::LootDropped { .. } => "loot_dropped",
            EngineEvent::PetCaught { .. } => "pet_caught",
            EngineEvent::PetEvolved { .. } => "pet_evolved",
            EngineEvent::RewardApplied { .. } => "reward_applied",
            EngineEvent::RankChanged { .. } => "rank_changed",
            EngineEvent::LevelUp { .. } => "level_up",
            EngineEvent::DecayApplied { .. } => "decay_applied",
            EngineEvent::WeeklyReset => "weekly_reset",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Receiver of engine events
pub trait EngineObserver {
    fn on_event(&mut self, event: &EngineEvent);
}

impl<F> EngineObserver for F
where
    F: FnMut(&EngineEvent),
{
    fn on_event(&mut self, event: &EngineEvent) {
        self(event)
    }
}

/// Fan-out of events to registered observers, in registration order
#[derive(Default)]
pub struct EventBus {
    observers: Vec<Box<dyn EngineObserver>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: Box<dyn EngineObserver>) {
        self.observers.push(observer);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn publish(&mut self, event: &EngineEvent) {
        tracing::trace!(event = event.name(), "publish");
        for observer in &mut self.observers {
            observer.on_event(event);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observers.len())
            .finish()
    }
}
