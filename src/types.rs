//! Core types for the awkwardness pipeline
//!
//! This module defines the data that flows between stages: flagged friction
//! moments, per-speaker metrics, the scored report, and the flattened payloads
//! handed to presentation and insight-generation collaborators.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Classification of a friction moment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrictionLabel {
    #[serde(rename = "Awkward Silence")]
    AwkwardSilence,
    #[serde(rename = "Left Hanging")]
    LeftHanging,
    #[serde(rename = "Painful Silence")]
    PainfulSilence,
    #[serde(rename = "Interruption")]
    Interruption,
}

impl FrictionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrictionLabel::AwkwardSilence => "Awkward Silence",
            FrictionLabel::LeftHanging => "Left Hanging",
            FrictionLabel::PainfulSilence => "Painful Silence",
            FrictionLabel::Interruption => "Interruption",
        }
    }

    /// Labels counted in the silence statistics.
    ///
    /// A question left hanging is dead air too, but it is weighted through its
    /// severity only and never enters the silence averages.
    pub fn is_silence(&self) -> bool {
        matches!(
            self,
            FrictionLabel::AwkwardSilence | FrictionLabel::PainfulSilence
        )
    }
}

impl fmt::Display for FrictionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A span of conversational friction found between two utterances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedMoment {
    pub start: f64,
    pub end: f64,
    /// How disruptive the moment is (0-1)
    pub severity: f64,
    pub label: FrictionLabel,
    pub description: String,
}

impl FlaggedMoment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Duration weighted by severity, the unit of the base score
    pub fn weighted_duration(&self) -> f64 {
        self.duration() * self.severity
    }
}

/// Behavioral metrics for one speaker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeakerStats {
    /// Total speaking time (seconds)
    pub speaking_seconds: f64,
    /// Share of the conversation span (percentage, one decimal)
    pub speaking_pct: f64,
    /// Fast-latch interruptions started by this speaker
    pub interruption_count: u32,
    /// Utterances that pass the real-question filter
    pub question_count: u32,
    /// Word count of each utterance, in sequence order
    pub turn_word_counts: Vec<usize>,
}

impl SpeakerStats {
    /// Average words per utterance (unrounded, zero with no utterances)
    pub fn avg_words_per_turn(&self) -> f64 {
        if self.turn_word_counts.is_empty() {
            return 0.0;
        }
        self.turn_word_counts.iter().sum::<usize>() as f64 / self.turn_word_counts.len() as f64
    }
}

/// Statistics over silence-labelled moments (unrounded)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SilenceStats {
    pub count: usize,
    pub avg_duration: f64,
    pub total_duration: f64,
}

/// Everything the aggregator derives from one utterance sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMetrics {
    /// Conversation span used for every ratio (seconds)
    pub total_duration: f64,
    pub speakers: BTreeMap<String, SpeakerStats>,
    pub silence: SilenceStats,
}

impl Default for ConversationMetrics {
    fn default() -> Self {
        Self {
            total_duration: crate::schema::DEGENERATE_SPAN_SEC,
            speakers: BTreeMap::new(),
            silence: SilenceStats::default(),
        }
    }
}

impl ConversationMetrics {
    /// Highest speaking percentage, zero when there are no speakers
    pub fn max_dominance_pct(&self) -> f64 {
        self.speakers
            .values()
            .map(|s| s.speaking_pct)
            .fold(0.0, f64::max)
    }

    /// Fast-latch interruptions across all speakers
    pub fn total_interruptions(&self) -> u32 {
        self.speakers.values().map(|s| s.interruption_count).sum()
    }
}

/// Qualitative verdict for a final score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "Smooth Vibes")]
    SmoothVibes,
    #[serde(rename = "Slightly Frictioned")]
    SlightlyFrictioned,
    #[serde(rename = "Awkward")]
    Awkward,
    #[serde(rename = "Hostage Situation")]
    HostageSituation,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::SmoothVibes => "Smooth Vibes",
            Verdict::SlightlyFrictioned => "Slightly Frictioned",
            Verdict::Awkward => "Awkward",
            Verdict::HostageSituation => "Hostage Situation",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the final score was composed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Friction-only score after the floor, before penalties
    pub base_score: f64,
    pub dominance_penalty: f64,
    pub silence_penalty: f64,
    pub interruption_penalty: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.base_score + self.dominance_penalty + self.silence_penalty + self.interruption_penalty
    }
}

/// Result of one analysis call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Final score (0-100)
    pub score: u32,
    pub label: Verdict,
    /// Flagged moments ordered by start time
    pub moments: Vec<FlaggedMoment>,
    pub metrics: ConversationMetrics,
    pub breakdown: ScoreBreakdown,
}

impl Report {
    /// Neutral report for a transcript with no utterances
    pub fn empty() -> Self {
        Self {
            score: 0,
            label: Verdict::SmoothVibes,
            moments: Vec::new(),
            metrics: ConversationMetrics::default(),
            breakdown: ScoreBreakdown::default(),
        }
    }
}

/// Silence statistics as handed to the insight generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilenceSummary {
    pub count: usize,
    /// Seconds, two decimals
    pub avg_duration: f64,
    /// Seconds, one decimal
    pub total_duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementStats {
    pub questions_asked: BTreeMap<String, u32>,
    /// One decimal
    pub avg_words_per_turn: BTreeMap<String, f64>,
}

/// Flattened metrics payload consumed by the narrative-insight generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedMetrics {
    pub score: u32,
    /// Seconds, one decimal
    pub duration_total: f64,
    /// Speaker → percentage (one decimal)
    pub speaking_distribution: BTreeMap<String, f64>,
    /// Speaker → fast-latch interruptions
    pub interruptions: BTreeMap<String, u32>,
    pub silence_stats: SilenceSummary,
    pub engagement_stats: EngagementStats,
}

/// One flagged moment flattened for timeline rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PainPoint {
    pub start: f64,
    pub end: f64,
    pub label: String,
    pub desc: String,
    pub severity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moment(label: FrictionLabel, start: f64, end: f64, severity: f64) -> FlaggedMoment {
        FlaggedMoment {
            start,
            end,
            severity,
            label,
            description: String::new(),
        }
    }

    #[test]
    fn test_silence_labels() {
        assert!(FrictionLabel::AwkwardSilence.is_silence());
        assert!(FrictionLabel::PainfulSilence.is_silence());
        assert!(!FrictionLabel::LeftHanging.is_silence());
        assert!(!FrictionLabel::Interruption.is_silence());
    }

    #[test]
    fn test_labels_serialize_as_display_text() {
        let json = serde_json::to_string(&FrictionLabel::LeftHanging).unwrap();
        assert_eq!(json, "\"Left Hanging\"");
        let json = serde_json::to_string(&Verdict::HostageSituation).unwrap();
        assert_eq!(json, "\"Hostage Situation\"");
    }

    #[test]
    fn test_weighted_duration() {
        let m = moment(FrictionLabel::PainfulSilence, 10.0, 14.0, 0.9);
        assert!((m.weighted_duration() - 3.6).abs() < 1e-9);
    }

    #[test]
    fn test_avg_words_per_turn() {
        let stats = SpeakerStats {
            turn_word_counts: vec![3, 4, 8],
            ..Default::default()
        };
        assert!((stats.avg_words_per_turn() - 5.0).abs() < 1e-9);
        assert_eq!(SpeakerStats::default().avg_words_per_turn(), 0.0);
    }

    #[test]
    fn test_metric_totals() {
        let mut metrics = ConversationMetrics::default();
        assert_eq!(metrics.max_dominance_pct(), 0.0);

        metrics.speakers.insert(
            "A".to_string(),
            SpeakerStats {
                speaking_pct: 72.5,
                interruption_count: 2,
                ..Default::default()
            },
        );
        metrics.speakers.insert(
            "B".to_string(),
            SpeakerStats {
                speaking_pct: 20.0,
                interruption_count: 1,
                ..Default::default()
            },
        );

        assert_eq!(metrics.max_dominance_pct(), 72.5);
        assert_eq!(metrics.total_interruptions(), 3);
    }

    #[test]
    fn test_empty_report() {
        let report = Report::empty();
        assert_eq!(report.score, 0);
        assert_eq!(report.label, Verdict::SmoothVibes);
        assert!(report.moments.is_empty());
        assert!(report.metrics.speakers.is_empty());
    }
}
