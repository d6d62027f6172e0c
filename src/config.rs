//! Tunable thresholds and weights for the scoring engine
//!
//! Every constant the detector, aggregator and scorer rely on lives here so
//! that callers can override them per analysis. Defaults reproduce the
//! calibrated values the scores are expected to match.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};

/// Friction detector thresholds and severities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Gaps strictly longer than this (seconds) are flagged as silence
    pub silence_awkward_sec: f64,
    /// Gaps strictly longer than this (seconds) escalate to painful silence
    pub silence_painful_sec: f64,
    /// Overlaps strictly longer than this (seconds) are flagged as interruptions
    pub overlap_bad_sec: f64,
    /// Overlapping utterances with at most this many words are backchannels
    pub backchannel_max_words: usize,
    pub severity_left_hanging: f64,
    pub severity_painful_silence: f64,
    pub severity_awkward_silence: f64,
    pub severity_interruption: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            silence_awkward_sec: 1.5,
            silence_painful_sec: 3.0,
            overlap_bad_sec: 0.2,
            backchannel_max_words: 1,
            severity_left_hanging: 1.0,
            severity_painful_silence: 0.9,
            severity_awkward_silence: 0.6,
            severity_interruption: 0.7,
        }
    }
}

/// Speaker metrics aggregation thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Speaker changes with a gap strictly below this (seconds) are fast latches
    pub fast_latch_gap_sec: f64,
    /// The latching utterance must last strictly longer than this (seconds)
    pub min_interrupter_duration_sec: f64,
    /// A real question contains `?` and strictly more words than this
    pub real_question_min_words: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            fast_latch_gap_sec: 0.15,
            min_interrupter_duration_sec: 1.0,
            real_question_min_words: 3,
        }
    }
}

/// Lower score bounds for each verdict above "Smooth Vibes"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelBands {
    pub slightly_frictioned: u32,
    pub awkward: u32,
    pub hostage_situation: u32,
}

impl Default for LabelBands {
    fn default() -> Self {
        Self {
            slightly_frictioned: 20,
            awkward: 40,
            hostage_situation: 70,
        }
    }
}

/// Composite scorer weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weighted awkward ratio that maps to `ratio_scale` points
    pub ratio_reference: f64,
    pub ratio_scale: f64,
    /// Minimum base score once any friction moment exists
    pub friction_floor: f64,
    pub max_score: f64,
    pub dominance_threshold_pct: f64,
    /// Points per percentage point above the dominance threshold
    pub dominance_multiplier: f64,
    pub dead_air_threshold_sec: f64,
    /// Points per second of average silence above the dead-air threshold
    pub dead_air_multiplier: f64,
    /// Points per fast-latch interruption
    pub interruption_penalty: f64,
    pub label_bands: LabelBands,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            ratio_reference: 0.05,
            ratio_scale: 50.0,
            friction_floor: 20.0,
            max_score: 100.0,
            dominance_threshold_pct: 60.0,
            dominance_multiplier: 2.5,
            dead_air_threshold_sec: 2.5,
            dead_air_multiplier: 15.0,
            interruption_penalty: 5.0,
            label_bands: LabelBands::default(),
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterConfig {
    pub detector: DetectorConfig,
    pub metrics: MetricsConfig,
    pub scoring: ScoringConfig,
}

impl MeterConfig {
    /// Parse a (possibly partial) configuration from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: MeterConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(self).map_err(ComputeError::JsonError)
    }

    /// Reject configurations that would make scores meaningless
    pub fn validate(&self) -> Result<(), ComputeError> {
        let d = &self.detector;
        check_non_negative("detector.silence_awkward_sec", d.silence_awkward_sec)?;
        check_non_negative("detector.silence_painful_sec", d.silence_painful_sec)?;
        check_non_negative("detector.overlap_bad_sec", d.overlap_bad_sec)?;
        if d.silence_painful_sec < d.silence_awkward_sec {
            return Err(ComputeError::InvalidConfig(format!(
                "detector.silence_painful_sec ({}) must not be below silence_awkward_sec ({})",
                d.silence_painful_sec, d.silence_awkward_sec
            )));
        }
        for (name, value) in [
            ("detector.severity_left_hanging", d.severity_left_hanging),
            ("detector.severity_painful_silence", d.severity_painful_silence),
            ("detector.severity_awkward_silence", d.severity_awkward_silence),
            ("detector.severity_interruption", d.severity_interruption),
        ] {
            check_unit_interval(name, value)?;
        }

        let m = &self.metrics;
        check_non_negative("metrics.fast_latch_gap_sec", m.fast_latch_gap_sec)?;
        check_non_negative(
            "metrics.min_interrupter_duration_sec",
            m.min_interrupter_duration_sec,
        )?;

        let s = &self.scoring;
        if !(s.ratio_reference.is_finite() && s.ratio_reference > 0.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "scoring.ratio_reference must be positive, got {}",
                s.ratio_reference
            )));
        }
        check_non_negative("scoring.ratio_scale", s.ratio_scale)?;
        check_non_negative("scoring.friction_floor", s.friction_floor)?;
        check_non_negative("scoring.max_score", s.max_score)?;
        check_non_negative("scoring.dominance_threshold_pct", s.dominance_threshold_pct)?;
        check_non_negative("scoring.dominance_multiplier", s.dominance_multiplier)?;
        check_non_negative("scoring.dead_air_threshold_sec", s.dead_air_threshold_sec)?;
        check_non_negative("scoring.dead_air_multiplier", s.dead_air_multiplier)?;
        check_non_negative("scoring.interruption_penalty", s.interruption_penalty)?;

        let bands = &s.label_bands;
        if !(bands.slightly_frictioned < bands.awkward && bands.awkward < bands.hostage_situation)
        {
            return Err(ComputeError::InvalidConfig(format!(
                "scoring.label_bands must be strictly increasing, got {}/{}/{}",
                bands.slightly_frictioned, bands.awkward, bands.hostage_situation
            )));
        }

        Ok(())
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<(), ComputeError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ComputeError::InvalidConfig(format!(
            "{name} must be a non-negative number, got {value}"
        )))
    }
}

fn check_unit_interval(name: &str, value: f64) -> Result<(), ComputeError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ComputeError::InvalidConfig(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}
