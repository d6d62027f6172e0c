//! Composite awkwardness scoring
//!
//! Two stages, always applied in this order:
//!
//! ```text
//! base   = min(max, (Σ duration·severity / total_duration) / ratio_reference · ratio_scale)
//! base   = max(base, friction_floor)            if any moment was flagged
//! final  = min(max, floor(base + dominance + dead_air + interruptions))
//! ```
//!
//! The verdict is taken from the final score, never from the base score.

use crate::config::ScoringConfig;
use crate::types::{ConversationMetrics, FlaggedMoment, ScoreBreakdown, Verdict};

/// Scorer combining friction moments with speaker metrics
#[derive(Debug, Clone, Default)]
pub struct CompositeScorer {
    config: ScoringConfig,
}

impl CompositeScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Compose the score breakdown for one conversation
    pub fn breakdown(
        &self,
        moments: &[FlaggedMoment],
        metrics: &ConversationMetrics,
    ) -> ScoreBreakdown {
        let breakdown = ScoreBreakdown {
            base_score: self.base_score(moments, metrics.total_duration),
            dominance_penalty: self.dominance_penalty(metrics.max_dominance_pct()),
            silence_penalty: self.silence_penalty(metrics.silence.avg_duration),
            interruption_penalty: self.interruption_penalty(metrics.total_interruptions()),
        };

        log::debug!(
            "Score breakdown: base {:.2}, dominance +{:.2}, dead air +{:.2}, interruptions +{:.2}",
            breakdown.base_score,
            breakdown.dominance_penalty,
            breakdown.silence_penalty,
            breakdown.interruption_penalty
        );
        breakdown
    }

    /// Final integer score from a breakdown
    pub fn final_score(&self, breakdown: &ScoreBreakdown) -> u32 {
        breakdown.total().floor().clamp(0.0, self.config.max_score) as u32
    }

    /// Stage A: friction-only score
    pub fn base_score(&self, moments: &[FlaggedMoment], total_duration: f64) -> f64 {
        let cfg = &self.config;
        let weighted_awkward_time = moments
            .iter()
            .fold(0.0, |acc, m| acc + m.weighted_duration());
        let awkward_ratio = weighted_awkward_time / total_duration;

        let base = (awkward_ratio / cfg.ratio_reference * cfg.ratio_scale).min(cfg.max_score);
        if !moments.is_empty() && base < cfg.friction_floor {
            cfg.friction_floor
        } else {
            base
        }
    }

    /// Penalty for one speaker holding the floor
    pub fn dominance_penalty(&self, max_dominance_pct: f64) -> f64 {
        let cfg = &self.config;
        if max_dominance_pct > cfg.dominance_threshold_pct {
            (max_dominance_pct - cfg.dominance_threshold_pct) * cfg.dominance_multiplier
        } else {
            0.0
        }
    }

    /// Penalty for long average dead air
    pub fn silence_penalty(&self, avg_silence_sec: f64) -> f64 {
        let cfg = &self.config;
        if avg_silence_sec > cfg.dead_air_threshold_sec {
            (avg_silence_sec - cfg.dead_air_threshold_sec) * cfg.dead_air_multiplier
        } else {
            0.0
        }
    }

    /// Penalty per fast-latch interruption
    pub fn interruption_penalty(&self, total_interruptions: u32) -> f64 {
        total_interruptions as f64 * self.config.interruption_penalty
    }

    /// Map a final score onto its verdict
    pub fn verdict(&self, score: u32) -> Verdict {
        let bands = &self.config.label_bands;
        if score < bands.slightly_frictioned {
            Verdict::SmoothVibes
        } else if score < bands.awkward {
            Verdict::SlightlyFrictioned
        } else if score < bands.hostage_situation {
            Verdict::Awkward
        } else {
            Verdict::HostageSituation
        }
    }
}
