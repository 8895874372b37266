//! Sprint session state machine
//!
//! ```text
//! Idle --start--> Countdown --1s x3--> Active --target--> Validating --> Completed --2s--> Idle
//!                     \                   /
//!                      +----cancel------+-----> Failed --1s--> Idle
//! ```
//!
//! The session has no clock of its own. Time moves only through
//! [`SprintSession::advance`], and a single call may cross several phase
//! boundaries.

use crate::config::{ScoringConfig, SprintConfig};
use crate::events::EngineEvent;
use crate::roll::Roller;
use crate::scoring::SprintScorer;
use crate::types::{SprintResult, SprintState, TelemetrySample};
use std::time::Duration;
use uuid::Uuid;

const COUNTDOWN_STEP: Duration = Duration::from_secs(1);

/// A single sprint, from countdown to reset
#[derive(Debug, Clone)]
pub struct SprintSession {
    config: SprintConfig,
    scorer: SprintScorer,
    state: SprintState,
    session_id: Option<Uuid>,
    target_duration: Duration,
    baseline_heart_rate: u32,
    samples: Vec<TelemetrySample>,
    /// Time spent in the current phase
    phase_elapsed: Duration,
    countdown_remaining: u32,
    last_result: Option<SprintResult>,
}

impl Default for SprintSession {
    fn default() -> Self {
        Self::new(SprintConfig::default(), ScoringConfig::default())
    }
}

impl SprintSession {
    pub fn new(config: SprintConfig, scoring: ScoringConfig) -> Self {
        Self {
            config,
            scorer: SprintScorer::new(scoring),
            state: SprintState::Idle,
            session_id: None,
            target_duration: Duration::ZERO,
            baseline_heart_rate: 0,
            samples: Vec::new(),
            phase_elapsed: Duration::ZERO,
            countdown_remaining: 0,
            last_result: None,
        }
    }

    /// Start a sprint with a target duration drawn from the configured range
    pub fn start(&mut self, baseline_heart_rate: u32, roller: &mut dyn Roller) -> Vec<EngineEvent> {
        if self.state != SprintState::Idle {
            tracing::debug!(state = %self.state, "start ignored, session busy");
            return Vec::new();
        }
        let target_secs =
            roller.range_inclusive(self.config.min_target_secs, self.config.max_target_secs);
        self.start_with_target(baseline_heart_rate, Duration::from_secs(target_secs as u64))
    }

    /// Start a sprint with an explicit target duration
    pub fn start_with_target(
        &mut self,
        baseline_heart_rate: u32,
        target_duration: Duration,
    ) -> Vec<EngineEvent> {
        if self.state != SprintState::Idle {
            tracing::debug!(state = %self.state, "start ignored, session busy");
            return Vec::new();
        }

        let session_id = Uuid::new_v4();
        self.session_id = Some(session_id);
        self.target_duration = target_duration;
        self.baseline_heart_rate = baseline_heart_rate;
        self.samples.clear();
        self.phase_elapsed = Duration::ZERO;
        self.countdown_remaining = self.config.countdown_secs;
        self.state = SprintState::Countdown;

        tracing::info!(
            %session_id,
            target_secs = target_duration.as_secs_f64(),
            baseline_heart_rate,
            "sprint started"
        );

        let mut events = vec![EngineEvent::SprintStarted {
            session_id,
            target_secs: target_duration.as_secs_f64(),
            baseline_heart_rate,
        }];
        if self.countdown_remaining == 0 {
            events.push(self.go_active());
        } else {
            events.push(EngineEvent::CountdownTick {
                remaining: self.countdown_remaining,
            });
        }
        events
    }

    /// Advance the session clock by `dt`
    pub fn advance(&mut self, dt: Duration) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        let mut budget = dt;

        loop {
            match self.state {
                SprintState::Idle => break,
                SprintState::Countdown => {
                    let to_next = COUNTDOWN_STEP.saturating_sub(self.phase_elapsed);
                    if budget < to_next {
                        self.phase_elapsed += budget;
                        break;
                    }
                    budget -= to_next;
                    self.phase_elapsed = Duration::ZERO;
                    self.countdown_remaining = self.countdown_remaining.saturating_sub(1);
                    if self.countdown_remaining == 0 {
                        events.push(self.go_active());
                    } else {
                        events.push(EngineEvent::CountdownTick {
                            remaining: self.countdown_remaining,
                        });
                    }
                }
                SprintState::Active => {
                    let to_end = self.target_duration.saturating_sub(self.phase_elapsed);
                    if budget < to_end {
                        self.phase_elapsed += budget;
                        break;
                    }
                    budget -= to_end;
                    self.phase_elapsed = self.target_duration;
                    self.state = SprintState::Validating;
                }
                SprintState::Validating => {
                    let result = self.validate();
                    self.phase_elapsed = Duration::ZERO;
                    self.state = SprintState::Completed;
                    events.push(EngineEvent::SprintEnded { result });
                }
                SprintState::Completed | SprintState::Failed => {
                    let delay = if self.state == SprintState::Completed {
                        self.config.completion_reset()
                    } else {
                        self.config.cancel_reset()
                    };
                    let to_reset = delay.saturating_sub(self.phase_elapsed);
                    if budget < to_reset {
                        self.phase_elapsed += budget;
                        break;
                    }
                    self.reset();
                    events.push(EngineEvent::SprintReset);
                    break;
                }
            }
        }
        events
    }

    /// Cancel a sprint in countdown or active phase
    pub fn cancel(&mut self) -> Vec<EngineEvent> {
        if !self.state.is_running() {
            tracing::debug!(state = %self.state, "cancel ignored");
            return Vec::new();
        }
        self.state = SprintState::Failed;
        self.phase_elapsed = Duration::ZERO;

        let Some(session_id) = self.session_id else {
            return Vec::new();
        };
        tracing::info!(%session_id, samples = self.samples.len(), "sprint cancelled");
        vec![EngineEvent::SprintCancelled { session_id }]
    }

    /// Record a telemetry sample. Only accepted while the sprint is active.
    pub fn add_sample(&mut self, sample: TelemetrySample) -> bool {
        if self.state != SprintState::Active {
            return false;
        }
        self.samples.push(sample);
        true
    }

    /// How often the host should deliver ticks in the current phase
    pub fn tick_interval(&self) -> Option<Duration> {
        match self.state {
            SprintState::Countdown => Some(COUNTDOWN_STEP),
            SprintState::Active => Some(self.config.active_tick()),
            SprintState::Completed | SprintState::Failed => Some(COUNTDOWN_STEP),
            SprintState::Idle | SprintState::Validating => None,
        }
    }

    pub fn state(&self) -> SprintState {
        self.state
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn samples(&self) -> &[TelemetrySample] {
        &self.samples
    }

    pub fn target_duration(&self) -> Duration {
        self.target_duration
    }

    pub fn baseline_heart_rate(&self) -> u32 {
        self.baseline_heart_rate
    }

    pub fn countdown_remaining(&self) -> u32 {
        self.countdown_remaining
    }

    /// Result of the most recently completed sprint
    pub fn last_result(&self) -> Option<&SprintResult> {
        self.last_result.as_ref()
    }

    fn go_active(&mut self) -> EngineEvent {
        self.state = SprintState::Active;
        self.phase_elapsed = Duration::ZERO;
        let session_id = self.session_id.unwrap_or_else(Uuid::nil);
        tracing::debug!(%session_id, "sprint active");
        EngineEvent::SprintActive { session_id }
    }

    fn validate(&mut self) -> SprintResult {
        let breakdown = self.scorer.score_window(
            &self.samples,
            self.baseline_heart_rate,
            self.scorer.config().max_heart_rate,
        );
        let result = SprintResult {
            session_id: self.session_id.unwrap_or_else(Uuid::nil),
            duration_secs: self.target_duration.as_secs_f64(),
            is_valid: breakdown.is_valid,
            score: breakdown.score,
            heart_rate_score: breakdown.heart_rate_score,
            cadence_score: breakdown.cadence_score,
            hr_derivative_score: breakdown.hr_derivative_score,
            baseline_heart_rate: self.baseline_heart_rate,
            peak_heart_rate: breakdown.peak_heart_rate,
            average_cadence: breakdown.average_cadence,
            peak_cadence: breakdown.peak_cadence,
            sample_count: self.samples.len(),
        };
        tracing::info!(
            session_id = %result.session_id,
            score = result.score,
            valid = result.is_valid,
            samples = result.sample_count,
            "sprint validated"
        );
        self.last_result = Some(result.clone());
        result
    }

    fn reset(&mut self) {
        self.state = SprintState::Idle;
        self.phase_elapsed = Duration::ZERO;
        self.countdown_remaining = 0;
        self.samples.clear();
    }
}
