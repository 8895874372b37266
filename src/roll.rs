//! Randomness sources
//!
//! Every probabilistic decision in the engine (target duration, encounter
//! rolls, loot, catches, decay amounts) draws from a [`Roller`]. Production
//! code uses [`RngRoller`] over a `rand` generator; tests and replays use
//! [`ScriptedRoller`] to pin exact roll values.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Trait for random roll sources
pub trait Roller {
    /// Uniform draw in `[0, 1)`
    fn roll(&mut self) -> f64;

    /// Uniform integer in `[low, high]`. Returns `low` when `high <= low`.
    fn range_inclusive(&mut self, low: u32, high: u32) -> u32;

    /// Uniform index in `[0, len)`. `len` must be non-zero.
    fn pick(&mut self, len: usize) -> usize;
}

/// Roller backed by any `rand` generator
#[derive(Debug, Clone)]
pub struct RngRoller<R: Rng> {
    rng: R,
}

impl<R: Rng> RngRoller<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngRoller<StdRng> {
    /// Seeded roller for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Roller seeded from operating system entropy
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> Roller for RngRoller<R> {
    fn roll(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn range_inclusive(&mut self, low: u32, high: u32) -> u32 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..=high)
    }

    fn pick(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }
}

/// Roller that replays a fixed script of `[0, 1)` values.
///
/// Integer draws are derived from the next scripted value, so a script fully
/// determines every outcome. When the script runs out, `fallback` is used.
#[derive(Debug, Clone)]
pub struct ScriptedRoller {
    script: VecDeque<f64>,
    fallback: f64,
}

impl ScriptedRoller {
    pub fn new(script: impl IntoIterator<Item = f64>) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback: 0.5,
        }
    }

    /// A roller that always returns `value`
    pub fn constant(value: f64) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: value,
        }
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }

    /// Number of scripted values not yet consumed
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    fn next_value(&mut self) -> f64 {
        let value = self.script.pop_front().unwrap_or(self.fallback);
        // Keep the [0, 1) contract even for sloppy scripts
        if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, 1.0 - f64::EPSILON)
        }
    }
}

impl Roller for ScriptedRoller {
    fn roll(&mut self) -> f64 {
        self.next_value()
    }

    fn range_inclusive(&mut self, low: u32, high: u32) -> u32 {
        let value = self.next_value();
        if high <= low {
            return low;
        }
        let span = (high - low) as f64 + 1.0;
        low + ((value * span).floor() as u32).min(high - low)
    }

    fn pick(&mut self, len: usize) -> usize {
        let value = self.next_value();
        if len <= 1 {
            return 0;
        }
        ((value * len as f64).floor() as usize).min(len - 1)
    }
}
