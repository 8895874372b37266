//! Runquest - Sprint validation and encounter/reward engine for interval running
//!
//! A run is a long stretch of easy running. At random moments an encounter
//! fires and the runner is asked to sprint; heart rate and cadence telemetry
//! decide whether the sprint was genuine. Valid sprints earn reputation,
//! experience, coins, loot and collectible pets, and reputation drives a
//! ranked ladder that decays with inactivity.
//!
//! ## Modules
//!
//! - **Scoring** ([`scoring`]): telemetry window to a 0-100 validity score
//! - **Sprint** ([`sprint`]): countdown / active / validation state machine
//! - **Encounters** ([`encounter`]): time-gated probability with a pity timer
//! - **Rewards** ([`rewards`], [`bonus`], [`pets`]): stacked bonuses, loot and catches
//! - **Progression** ([`progression`]): ranks, divisions, levels, streaks and decay
//! - **Engine** ([`engine`]): message-driven context tying everything together

pub mod bonus;
pub mod config;
pub mod encounter;
pub mod engine;
pub mod error;
pub mod events;
pub mod pets;
pub mod progression;
pub mod rewards;
pub mod roll;
pub mod scoring;
pub mod sprint;
pub mod store;
pub mod types;

pub use config::EngineConfig;
pub use engine::{EngineMessage, RunEngine, SprintRecord};
pub use error::{EngineError, StoreError};
pub use events::{EngineEvent, EngineObserver};
pub use progression::{ProgressionLedger, Rank, RankTable, Standing};
pub use rewards::RewardResolver;
pub use roll::{RngRoller, Roller, ScriptedRoller};
pub use scoring::{ScoreBreakdown, SprintScorer};
pub use store::{JsonFileStore, MemoryStore, ProgressStore};
pub use types::{LootRarity, RewardBundle, SprintResult, SprintState, TelemetrySample};

/// Runquest version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
