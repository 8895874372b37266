//! Sprint scoring
//!
//! Pure functions that turn a window of telemetry samples into a validity
//! score:
//! - Heart rate response (rise, zone reach, time elevated)
//! - Cadence response (rise over pre-sprint cadence, peak cadence)
//! - Early heart rate derivative (how fast the heart responded)
//!
//! Sub-scores are always within 0-1 and the composite within 0-100.

use crate::config::ScoringConfig;
use crate::types::TelemetrySample;
use serde::{Deserialize, Serialize};

/// Composite weight of the heart rate sub-score
const HEART_RATE_WEIGHT: f64 = 0.50;

/// Composite weight of the cadence sub-score
const CADENCE_WEIGHT: f64 = 0.35;

/// Composite weight of the heart rate derivative sub-score
const HR_DERIVATIVE_WEIGHT: f64 = 0.15;

/// Samples averaged to estimate pre-sprint cadence
const PRE_CADENCE_SAMPLES: usize = 3;

/// Samples inspected for the early heart rate derivative
const DERIVATIVE_WINDOW: usize = 10;

/// Fewest samples needed for a derivative
const MIN_DERIVATIVE_SAMPLES: usize = 3;

/// Every figure derived from one sample window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub heart_rate_score: f64,
    pub cadence_score: f64,
    pub hr_derivative_score: f64,
    /// Composite score (0-100)
    pub score: f64,
    pub is_valid: bool,
    pub peak_heart_rate: u32,
    pub peak_cadence: u32,
    pub average_cadence: f64,
}

/// Scorer for sprint telemetry windows
#[derive(Debug, Clone, Default)]
pub struct SprintScorer {
    config: ScoringConfig,
}

impl SprintScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score a complete window
    pub fn score_window(
        &self,
        samples: &[TelemetrySample],
        baseline: u32,
        max_hr: u32,
    ) -> ScoreBreakdown {
        let peak_heart_rate = samples.iter().map(|s| s.heart_rate).max().unwrap_or(0);
        let peak_cadence = samples.iter().map(|s| s.cadence).max().unwrap_or(0);
        let average_cadence = if samples.is_empty() {
            0.0
        } else {
            samples.iter().map(|s| s.cadence as f64).sum::<f64>() / samples.len() as f64
        };

        let heart_rate_score = self.heart_rate_score(samples, baseline, peak_heart_rate, max_hr);
        let cadence_score = self.cadence_score(samples, peak_cadence);
        let hr_derivative_score = self.hr_derivative_score(samples);
        let score = composite_score(heart_rate_score, cadence_score, hr_derivative_score);

        ScoreBreakdown {
            heart_rate_score,
            cadence_score,
            hr_derivative_score,
            score,
            is_valid: self.is_valid(score),
            peak_heart_rate,
            peak_cadence,
            average_cadence,
        }
    }

    /// Heart rate response score (0-1).
    ///
    /// - 0.4 × rise over baseline relative to `min_hr_increase`
    /// - 0.4 for reaching `max_hr × zone_percent`, otherwise partial credit
    ///   for the distance covered from baseline toward that zone
    /// - 0.2 × share of samples at least `elevated_margin_bpm` above baseline,
    ///   relative to `min_time_in_zone_fraction`
    pub fn heart_rate_score(
        &self,
        samples: &[TelemetrySample],
        baseline: u32,
        peak: u32,
        max_hr: u32,
    ) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let cfg = &self.config;
        let baseline = baseline as f64;
        let peak = peak as f64;

        let rise = (peak - baseline).max(0.0);
        let increase_term = ratio(rise, cfg.min_hr_increase) * 0.4;

        // Partial zone credit counts from baseline, not from zero: a peak
        // sitting at baseline earns nothing however high the baseline is.
        let zone_target = max_hr as f64 * cfg.zone_percent;
        let zone_term = if peak >= zone_target {
            0.4
        } else {
            ratio(rise, zone_target - baseline) * 0.4
        };

        let threshold = baseline + cfg.elevated_margin_bpm;
        let elevated = samples
            .iter()
            .filter(|s| s.heart_rate as f64 >= threshold)
            .count();
        let elevated_fraction = elevated as f64 / samples.len() as f64;
        let time_term = ratio(elevated_fraction, cfg.min_time_in_zone_fraction) * 0.2;

        (increase_term + zone_term + time_term).clamp(0.0, 1.0)
    }

    /// Cadence response score (0-1).
    ///
    /// Pre-sprint cadence is the mean of the first three samples; the rise
    /// term is skipped when that mean is zero.
    pub fn cadence_score(&self, samples: &[TelemetrySample], peak: u32) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let cfg = &self.config;
        let peak = peak as f64;

        let head = &samples[..samples.len().min(PRE_CADENCE_SAMPLES)];
        let pre = head.iter().map(|s| s.cadence as f64).sum::<f64>() / head.len() as f64;

        let increase_term = if pre > 0.0 {
            let increase = ((peak - pre) / pre).max(0.0);
            ratio(increase, cfg.min_cadence_increase) * 0.5
        } else {
            0.0
        };
        let peak_term = ratio(peak, cfg.min_peak_cadence) * 0.5;

        (increase_term + peak_term).clamp(0.0, 1.0)
    }

    /// Early heart rate derivative score (0-1).
    ///
    /// Largest consecutive rise within the first ten samples, in bpm per
    /// second, relative to `target_hr_derivative`.
    pub fn hr_derivative_score(&self, samples: &[TelemetrySample]) -> f64 {
        if samples.len() < MIN_DERIVATIVE_SAMPLES {
            return 0.0;
        }
        let cfg = &self.config;
        let window = &samples[..samples.len().min(DERIVATIVE_WINDOW)];

        let max_delta = window
            .windows(2)
            .map(|pair| pair[1].heart_rate as f64 - pair[0].heart_rate as f64)
            .filter(|delta| *delta > 0.0)
            .fold(0.0, f64::max);

        let bpm_per_sec = max_delta / cfg.sample_interval_secs;
        ratio(bpm_per_sec, cfg.target_hr_derivative)
    }

    pub fn is_valid(&self, score: f64) -> bool {
        is_valid(score, self.config.valid_threshold)
    }
}

/// Weighted composite of the three sub-scores (0-100)
pub fn composite_score(heart_rate: f64, cadence: f64, hr_derivative: f64) -> f64 {
    let weighted = unit(heart_rate) * HEART_RATE_WEIGHT
        + unit(cadence) * CADENCE_WEIGHT
        + unit(hr_derivative) * HR_DERIVATIVE_WEIGHT;
    (weighted * 100.0).clamp(0.0, 100.0)
}

/// Whether a composite score passes `threshold`
pub fn is_valid(score: f64, threshold: f64) -> bool {
    score >= threshold
}

/// `min(1, value / target)`, with degenerate inputs scoring zero
fn ratio(value: f64, target: f64) -> f64 {
    if !(target > 0.0) || !value.is_finite() {
        return 0.0;
    }
    (value / target).clamp(0.0, 1.0)
}

fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
