//! Report encoder
//!
//! Flattens a scored [`Report`] into the payloads consumed outside the engine:
//! the detailed metrics handed to the insight generator, the pain-point list
//! and the merged timeline used for rendering.

use crate::aggregator::round_dp;
use crate::error::ComputeError;
use crate::schema::UtteranceSequence;
use crate::timeline::{Timeline, TimelineEntry};
use crate::types::{
    DetailedMetrics, EngagementStats, PainPoint, Report, ScoreBreakdown, SilenceSummary, Verdict,
};
use crate::{METER_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Producer metadata stamped on every encoded report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Complete encoded analysis
#[derive(Debug, Clone, Serialize)]
pub struct ReportPayload {
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub score: u32,
    pub verdict: Verdict,
    pub breakdown: ScoreBreakdown,
    pub detailed_metrics: DetailedMetrics,
    pub pain_points: Vec<PainPoint>,
    pub timeline: Vec<TimelineEntry>,
}

/// Encoder for analysis reports
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Encode a report together with the utterances it was computed from
    pub fn encode(&self, utterances: &UtteranceSequence, report: &Report) -> ReportPayload {
        ReportPayload {
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: METER_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            score: report.score,
            verdict: report.label,
            breakdown: report.breakdown.clone(),
            detailed_metrics: detailed_metrics(report),
            pain_points: pain_points(report),
            timeline: Timeline::new(utterances, report).entries(),
        }
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json(
        &self,
        utterances: &UtteranceSequence,
        report: &Report,
    ) -> Result<String, ComputeError> {
        let payload = self.encode(utterances, report);
        serde_json::to_string_pretty(&payload).map_err(ComputeError::JsonError)
    }
}

/// Flatten report metrics into the insight generator's payload.
///
/// Rounding happens here and nowhere else, except the speaking percentages
/// which are already rounded by the aggregator.
pub fn detailed_metrics(report: &Report) -> DetailedMetrics {
    let metrics = &report.metrics;

    DetailedMetrics {
        score: report.score,
        duration_total: round_dp(metrics.total_duration, 1),
        speaking_distribution: metrics
            .speakers
            .iter()
            .map(|(speaker, stats)| (speaker.clone(), stats.speaking_pct))
            .collect(),
        interruptions: metrics
            .speakers
            .iter()
            .map(|(speaker, stats)| (speaker.clone(), stats.interruption_count))
            .collect(),
        silence_stats: SilenceSummary {
            count: metrics.silence.count,
            avg_duration: round_dp(metrics.silence.avg_duration, 2),
            total_duration: round_dp(metrics.silence.total_duration, 1),
        },
        engagement_stats: EngagementStats {
            questions_asked: metrics
                .speakers
                .iter()
                .map(|(speaker, stats)| (speaker.clone(), stats.question_count))
                .collect(),
            avg_words_per_turn: metrics
                .speakers
                .iter()
                .map(|(speaker, stats)| (speaker.clone(), round_dp(stats.avg_words_per_turn(), 1)))
                .collect(),
        },
    }
}

/// Flagged moments in chronological order, flattened for rendering
pub fn pain_points(report: &Report) -> Vec<PainPoint> {
    report
        .moments
        .iter()
        .map(|m| PainPoint {
            start: m.start,
            end: m.end,
            label: m.label.as_str().to_string(),
            desc: m.description.clone(),
            severity: m.severity,
        })
        .collect()
}

/// `speaker: text` lines for the narrative-insight generator
pub fn transcript_text(utterances: &UtteranceSequence) -> String {
    utterances
        .iter()
        .map(|u| format!("{}: {}", u.speaker, u.text))
        .collect::<Vec<_>>()
        .join("\n")
}
