//! Core types for the Runquest engine
//!
//! This module defines the value objects that flow between the stages of a
//! sprint: telemetry samples, the sprint result snapshot and the reward bundle.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A single telemetry reading delivered while a sprint is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Heart rate (bpm)
    pub heart_rate: u32,
    /// Running cadence (steps per minute)
    pub cadence: u32,
}

impl TelemetrySample {
    pub fn new(heart_rate: u32, cadence: u32) -> Self {
        Self {
            heart_rate,
            cadence,
        }
    }

    /// Build a sample from raw sensor values, clamping negatives and NaN to zero.
    pub fn from_raw(heart_rate: f64, cadence: f64) -> Self {
        Self {
            heart_rate: clamp_reading(heart_rate),
            cadence: clamp_reading(cadence),
        }
    }
}

fn clamp_reading(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Sprint lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SprintState {
    Idle,
    Countdown,
    Active,
    Validating,
    Completed,
    Failed,
}

impl SprintState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SprintState::Idle => "idle",
            SprintState::Countdown => "countdown",
            SprintState::Active => "active",
            SprintState::Validating => "validating",
            SprintState::Completed => "completed",
            SprintState::Failed => "failed",
        }
    }

    /// Whether a sprint is currently in progress (countdown or running)
    pub fn is_running(&self) -> bool {
        matches!(self, SprintState::Countdown | SprintState::Active)
    }
}

impl fmt::Display for SprintState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable snapshot produced once per sprint session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintResult {
    /// Session identifier, for history and logging
    pub session_id: Uuid,
    /// Sprint duration (seconds)
    pub duration_secs: f64,
    /// Whether the composite score reached the validity threshold
    pub is_valid: bool,
    /// Composite score (0-100)
    pub score: f64,
    /// Heart rate sub-score (0-1)
    pub heart_rate_score: f64,
    /// Cadence sub-score (0-1)
    pub cadence_score: f64,
    /// Early heart rate derivative sub-score (0-1)
    pub hr_derivative_score: f64,
    /// Heart rate when the sprint started (bpm)
    pub baseline_heart_rate: u32,
    /// Highest heart rate observed (bpm)
    pub peak_heart_rate: u32,
    /// Mean cadence over the sprint (spm)
    pub average_cadence: f64,
    /// Highest cadence observed (spm)
    pub peak_cadence: u32,
    /// Number of samples scored
    pub sample_count: usize,
}

/// Loot rarity, ordered from most to least common
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LootRarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl LootRarity {
    /// All rarities in increasing-rarity order
    pub const ALL: [LootRarity; 5] = [
        LootRarity::Common,
        LootRarity::Uncommon,
        LootRarity::Rare,
        LootRarity::Epic,
        LootRarity::Legendary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LootRarity::Common => "common",
            LootRarity::Uncommon => "uncommon",
            LootRarity::Rare => "rare",
            LootRarity::Epic => "epic",
            LootRarity::Legendary => "legendary",
        }
    }
}

impl fmt::Display for LootRarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rewards earned from a single sprint. Never mutated after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardBundle {
    pub rp: u32,
    pub xp: u32,
    pub coins: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loot_rarity: Option<LootRarity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caught_pet_id: Option<String>,
}

impl RewardBundle {
    /// The bundle awarded for an invalid sprint
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rp == 0
            && self.xp == 0
            && self.coins == 0
            && self.loot_rarity.is_none()
            && self.caught_pet_id.is_none()
    }
}
