//! Run engine
//!
//! [`RunEngine`] is the application context for a run. It owns the sprint
//! session, the encounter scheduler, the player's ledger and pets, the
//! randomness source, the event bus and the persistence collaborator.
//!
//! Hosts drive it through a FIFO mailbox: [`RunEngine::post`] enqueues an
//! [`EngineMessage`] and [`RunEngine::pump`] drains the queue in order,
//! returning every event produced. A tick posted directly behind another
//! queued tick is merged into it.

use crate::config::EngineConfig;
use crate::encounter::{EncounterCheck, EncounterScheduler};
use crate::error::EngineError;
use crate::events::{EngineEvent, EngineObserver, EventBus};
use crate::pets::{PetCollection, PetInstance};
use crate::progression::ProgressionLedger;
use crate::rewards::RewardResolver;
use crate::roll::Roller;
use crate::sprint::SprintSession;
use crate::store::ProgressStore;
use crate::types::{RewardBundle, SprintResult, SprintState, TelemetrySample};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use uuid::Uuid;

/// Input to the engine's mailbox
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineMessage {
    /// Advance the run clock
    Tick(Duration),
    Sample(TelemetrySample),
    Cancel,
    /// Start a sprint without waiting for an encounter
    StartSprint,
}

/// A finished sprint and what it earned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintRecord {
    pub result: SprintResult,
    pub bundle: RewardBundle,
}

#[derive(Debug, Clone)]
struct RunContext {
    run_id: Uuid,
    /// Time since run start
    clock: Duration,
}

/// Message-driven sprint, encounter and reward engine
pub struct RunEngine {
    config: EngineConfig,
    roller: Box<dyn Roller>,
    session: SprintSession,
    scheduler: EncounterScheduler,
    ledger: ProgressionLedger,
    pets: PetCollection,
    store: Box<dyn ProgressStore>,
    bus: EventBus,
    mailbox: VecDeque<EngineMessage>,
    run: Option<RunContext>,
    last_heart_rate: Option<u32>,
    auto_start: bool,
    history: Vec<SprintRecord>,
}

impl RunEngine {
    /// Validate `config` and load saved state from `store`.
    ///
    /// Unreadable saved state is logged and replaced by a fresh ledger and a
    /// collection holding the starter pet.
    pub fn new(
        config: EngineConfig,
        store: Box<dyn ProgressStore>,
        roller: Box<dyn Roller>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let ledger = match store.load_ledger() {
            Ok(Some(ledger)) => ledger,
            Ok(None) => ProgressionLedger::default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load ledger, starting fresh");
                ProgressionLedger::default()
            }
        };
        let pets = match store.load_pets() {
            Ok(Some(pets)) => pets,
            Ok(None) => PetCollection::with_starter(&config.pets),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load pets, starting fresh");
                PetCollection::with_starter(&config.pets)
            }
        };

        Ok(Self {
            session: SprintSession::new(config.sprint.clone(), config.scoring.clone()),
            scheduler: EncounterScheduler::new(config.encounter.clone()),
            config,
            roller,
            ledger,
            pets,
            store,
            bus: EventBus::new(),
            mailbox: VecDeque::new(),
            run: None,
            last_heart_rate: None,
            auto_start: true,
            history: Vec::new(),
        })
    }

    /// Whether triggered encounters start a sprint on their own (default true)
    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    pub fn subscribe(&mut self, observer: Box<dyn EngineObserver>) {
        self.bus.subscribe(observer);
    }

    /// Begin a run at wall-clock time `now`.
    ///
    /// Daily maintenance happens first: inactivity decay for missed days
    /// (which also lowers pet mood), the weekly reset, then the streak.
    pub fn start_run(&mut self, now: DateTime<Utc>) -> Vec<EngineEvent> {
        if self.run.is_some() {
            tracing::debug!("start_run ignored, run already in progress");
            return Vec::new();
        }
        let today = now.date_naive();
        let mut events = Vec::new();

        let previous_rank = self.ledger.rank(&self.config.ranks);
        let report = self
            .ledger
            .apply_daily_decay(today, &self.config.ranks, self.roller.as_mut());
        if report.missed_days > 0 {
            self.pets.apply_missed_days(report.missed_days);
            tracing::info!(
                missed_days = report.missed_days,
                rp_lost = report.rp_lost,
                "inactivity decay applied"
            );
            events.push(EngineEvent::DecayApplied {
                missed_days: report.missed_days,
                rp_lost: report.rp_lost,
            });
        }
        let rank = self.ledger.rank(&self.config.ranks);
        if rank != previous_rank {
            events.push(EngineEvent::RankChanged {
                previous: previous_rank,
                rank,
            });
        }

        if self.ledger.weekly_reset(now) {
            events.push(EngineEvent::WeeklyReset);
        }
        self.ledger.record_activity(today);

        let run_id = Uuid::new_v4();
        self.run = Some(RunContext {
            run_id,
            clock: Duration::ZERO,
        });
        self.scheduler.start_run(Duration::ZERO);
        self.refresh_encounter_boost();
        tracing::info!(%run_id, streak = self.ledger.current_streak, "run started");

        self.persist();
        self.dispatch(events)
    }

    /// Finish the run, cancelling any sprint in progress
    pub fn end_run(&mut self) -> Vec<EngineEvent> {
        let Some(run) = self.run.take() else {
            tracing::debug!("end_run ignored, no run in progress");
            return Vec::new();
        };
        let mut events = self.session.cancel();
        if self.session.state() != SprintState::Idle {
            self.session =
                SprintSession::new(self.config.sprint.clone(), self.config.scoring.clone());
            events.push(EngineEvent::SprintReset);
        }
        self.scheduler.end_run();
        self.mailbox.clear();
        tracing::info!(
            run_id = %run.run_id,
            elapsed_secs = run.clock.as_secs_f64(),
            sprints = self.history.len(),
            "run ended"
        );
        self.persist();
        self.dispatch(events)
    }

    /// Enqueue a message. Consecutive ticks are merged.
    pub fn post(&mut self, message: EngineMessage) {
        if let EngineMessage::Tick(dt) = message {
            if let Some(EngineMessage::Tick(queued)) = self.mailbox.back_mut() {
                *queued += dt;
                return;
            }
        }
        self.mailbox.push_back(message);
    }

    /// Process every queued message in order
    pub fn pump(&mut self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Some(message) = self.mailbox.pop_front() {
            let produced = self.handle(message);
            events.extend(self.dispatch(produced));
        }
        events
    }

    /// Number of queued messages
    pub fn pending(&self) -> usize {
        self.mailbox.len()
    }

    /// Apply a resolved bundle to the ledger and pets, then persist.
    pub fn apply_reward(
        &mut self,
        result: &SprintResult,
        bundle: &RewardBundle,
    ) -> Vec<EngineEvent> {
        let events = self.apply_bundle(result, bundle);
        self.dispatch(events)
    }

    /// Equip an owned pet
    pub fn equip_pet(&mut self, species_id: &str) -> bool {
        if !self.pets.equip(species_id) {
            tracing::debug!(species_id, "equip ignored, pet not owned");
            return false;
        }
        self.refresh_encounter_boost();
        self.persist();
        true
    }

    /// Unlock an ability tree node. Ids not in the tree are ignored.
    pub fn unlock_ability(&mut self, id: &str) -> bool {
        if crate::bonus::find_ability(&self.config.abilities, id).is_none() {
            tracing::debug!(ability = id, "unlock ignored, unknown ability");
            return false;
        }
        let unlocked = self.ledger.unlock_ability(id);
        if unlocked {
            self.refresh_encounter_boost();
            self.persist();
        }
        unlocked
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &ProgressionLedger {
        &self.ledger
    }

    pub fn pets(&self) -> &PetCollection {
        &self.pets
    }

    pub fn session(&self) -> &SprintSession {
        &self.session
    }

    pub fn scheduler(&self) -> &EncounterScheduler {
        &self.scheduler
    }

    pub fn store(&self) -> &dyn ProgressStore {
        self.store.as_ref()
    }

    pub fn history(&self) -> &[SprintRecord] {
        &self.history
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run.as_ref().map(|run| run.run_id)
    }

    /// Time since run start
    pub fn clock(&self) -> Duration {
        self.run.as_ref().map_or(Duration::ZERO, |run| run.clock)
    }

    fn handle(&mut self, message: EngineMessage) -> Vec<EngineEvent> {
        match message {
            EngineMessage::Tick(dt) => self.on_tick(dt),
            EngineMessage::Sample(sample) => {
                self.last_heart_rate = Some(sample.heart_rate);
                if !self.session.add_sample(sample) {
                    tracing::trace!(state = %self.session.state(), "sample dropped");
                }
                Vec::new()
            }
            EngineMessage::Cancel => {
                let now = self.clock();
                let events = self.session.cancel();
                if !events.is_empty() {
                    self.scheduler.resolve(now);
                }
                events
            }
            EngineMessage::StartSprint => {
                if self.run.is_none() {
                    tracing::debug!("start ignored, no run in progress");
                    return Vec::new();
                }
                self.start_sprint()
            }
        }
    }

    fn on_tick(&mut self, dt: Duration) -> Vec<EngineEvent> {
        let Some(run) = self.run.as_mut() else {
            tracing::debug!("tick ignored, no run in progress");
            return Vec::new();
        };
        run.clock = run.clock.saturating_add(dt);
        let now = run.clock;

        let mut events = Vec::new();
        for event in self.session.advance(dt) {
            let ended = match &event {
                EngineEvent::SprintEnded { result } => Some(result.clone()),
                _ => None,
            };
            events.push(event);
            if let Some(result) = ended {
                events.extend(self.on_sprint_ended(result, now));
            }
        }

        if self.scheduler.update_recovery(now) {
            events.push(EngineEvent::RecoveryEnded {
                at_secs: now.as_secs_f64(),
            });
        }

        if self.session.state() == SprintState::Idle {
            if let Some(EncounterCheck::Triggered {
                probability,
                guaranteed,
                ..
            }) = self.scheduler.poll(now, self.roller.as_mut())
            {
                events.push(EngineEvent::EncounterTriggered {
                    at_secs: now.as_secs_f64(),
                    probability,
                    guaranteed,
                });
                if self.auto_start {
                    events.extend(self.start_sprint());
                }
            }
        }
        events
    }

    fn start_sprint(&mut self) -> Vec<EngineEvent> {
        let baseline = self
            .last_heart_rate
            .unwrap_or(self.config.sprint.default_baseline_hr);
        self.session.start(baseline, self.roller.as_mut())
    }

    fn on_sprint_ended(&mut self, result: SprintResult, now: Duration) -> Vec<EngineEvent> {
        let bundle = RewardResolver::from_config(&self.config).resolve(
            &result,
            &self.ledger,
            &self.pets,
            self.roller.as_mut(),
        );
        let events = self.apply_bundle(&result, &bundle);
        self.scheduler.resolve(now);
        events
    }

    fn apply_bundle(&mut self, result: &SprintResult, bundle: &RewardBundle) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        let change = self.ledger.apply_reward(bundle, &self.config.ranks);

        if result.is_valid {
            if let Some(pet) = self.pets.equipped_mut() {
                pet.adjust_mood(1);
                if let Some(stage) = pet.add_experience(bundle.xp as u64) {
                    events.push(EngineEvent::PetEvolved {
                        species_id: pet.species_id.clone(),
                        stage,
                    });
                }
            }
        }
        if let Some(rarity) = bundle.loot_rarity {
            events.push(EngineEvent::LootDropped { rarity });
        }
        if let Some(species_id) = &bundle.caught_pet_id {
            if self.pets.add(PetInstance::new(species_id)) {
                tracing::info!(%species_id, "pet caught");
                events.push(EngineEvent::PetCaught {
                    species_id: species_id.clone(),
                });
            }
        }

        events.push(EngineEvent::RewardApplied {
            session_id: result.session_id,
            bundle: bundle.clone(),
        });
        if change.rank != change.previous_rank {
            events.push(EngineEvent::RankChanged {
                previous: change.previous_rank,
                rank: change.rank,
            });
        }
        if change.level != change.previous_level {
            events.push(EngineEvent::LevelUp {
                previous: change.previous_level,
                level: change.level,
            });
        }

        self.history.push(SprintRecord {
            result: result.clone(),
            bundle: bundle.clone(),
        });
        self.refresh_encounter_boost();
        self.persist();
        events
    }

    fn refresh_encounter_boost(&mut self) {
        let boost =
            RewardResolver::from_config(&self.config).encounter_boost(&self.ledger, &self.pets);
        self.scheduler.set_probability_boost(boost);
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save_ledger(&self.ledger) {
            tracing::warn!(error = %e, "failed to save ledger");
        }
        if let Err(e) = self.store.save_pets(&self.pets) {
            tracing::warn!(error = %e, "failed to save pets");
        }
    }

    fn dispatch(&mut self, events: Vec<EngineEvent>) -> Vec<EngineEvent> {
        for event in &events {
            self.bus.publish(event);
        }
        events
    }
}

impl std::fmt::Debug for RunEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunEngine")
            .field("run_id", &self.run_id())
            .field("clock", &self.clock())
            .field("sprint_state", &self.session.state())
            .field("pending", &self.mailbox.len())
            .finish()
    }
}
