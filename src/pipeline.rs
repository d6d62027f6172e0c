//! Pipeline orchestration
//!
//! This module provides the public API for the awkwardness meter. It runs a
//! validated utterance sequence through detection, aggregation and scoring,
//! and encodes the result at the output boundary.

use crate::aggregator::SpeakerMetricsAggregator;
use crate::config::MeterConfig;
use crate::detector::FrictionDetector;
use crate::encoder::{self, ReportEncoder};
use crate::error::ComputeError;
use crate::insights::{CoachingInsights, InsightGenerator, InsightRequest};
use crate::schema::{TranscriptAdapter, UtteranceSequence};
use crate::scorer::CompositeScorer;
use crate::timeline::{Timeline, TimelineEntry};
use crate::types::{DetailedMetrics, PainPoint, Report, ScoreBreakdown, Verdict};
use serde::Serialize;
use std::collections::HashMap;

/// Score a JSON array of utterance records with the default configuration.
///
/// # Arguments
/// * `transcript_json` - JSON array of `{start, end, speaker, text?, is_question?}`
///
/// # Returns
/// The encoded report as pretty-printed JSON
///
/// # Example
/// ```ignore
/// let report_json = transcript_to_report(
///     r#"[{"start": 0.0, "end": 5.0, "speaker": "A", "text": "Hi?"}]"#.to_string()
/// )?;
/// ```
pub fn transcript_to_report(transcript_json: String) -> Result<String, ComputeError> {
    AwkwardnessMeter::default().analyze_json(&transcript_json)
}

/// Full result of a coaching session analysis
#[derive(Debug, Clone, Serialize)]
pub struct SessionAnalysis {
    pub main_user: String,
    pub score: u32,
    pub verdict: Verdict,
    pub detailed_metrics: DetailedMetrics,
    pub insights: CoachingInsights,
    /// Set when the insight generator failed and placeholders were used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight_error: Option<String>,
    pub timeline: Vec<TimelineEntry>,
    pub pain_points: Vec<PainPoint>,
    /// Report the session was scored from, with speakers renamed
    #[serde(skip)]
    pub report: Report,
}

/// Scoring engine bound to one configuration.
///
/// Holds no mutable state, so a single meter can be shared across threads
/// and called concurrently.
pub struct AwkwardnessMeter {
    config: MeterConfig,
    detector: FrictionDetector,
    aggregator: SpeakerMetricsAggregator,
    scorer: CompositeScorer,
    encoder: ReportEncoder,
}

impl Default for AwkwardnessMeter {
    fn default() -> Self {
        Self::from_valid_config(MeterConfig::default())
    }
}

impl AwkwardnessMeter {
    /// Create a meter, rejecting invalid configurations
    pub fn new(config: MeterConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: MeterConfig) -> Self {
        Self {
            detector: FrictionDetector::new(config.detector.clone()),
            aggregator: SpeakerMetricsAggregator::new(config.metrics.clone()),
            scorer: CompositeScorer::new(config.scoring.clone()),
            encoder: ReportEncoder::new(),
            config,
        }
    }

    pub fn config(&self) -> &MeterConfig {
        &self.config
    }

    /// Score one conversation.
    ///
    /// Stages:
    /// 1. FrictionDetector - flag gaps and overlaps
    /// 2. SpeakerMetricsAggregator - dominance, latches, silence, engagement
    /// 3. CompositeScorer - base score, penalties, verdict
    ///
    /// A lone utterance has no turn to judge, so it is reported with its
    /// metrics but a zero score.
    pub fn analyze(&self, utterances: &UtteranceSequence) -> Report {
        if utterances.is_empty() {
            log::debug!("Empty transcript, returning neutral report");
            return Report::empty();
        }

        let moments = self.detector.detect(utterances);
        let metrics = self.aggregator.aggregate(utterances, &moments);

        if utterances.len() < 2 {
            log::debug!("Single utterance, skipping scoring");
            return Report {
                score: 0,
                label: Verdict::SmoothVibes,
                moments,
                metrics,
                breakdown: ScoreBreakdown::default(),
            };
        }

        let breakdown = self.scorer.breakdown(&moments, &metrics);
        let score = self.scorer.final_score(&breakdown);
        let label = self.scorer.verdict(score);

        log::debug!("Final score {score} ({label})");

        Report {
            score,
            label,
            moments,
            metrics,
            breakdown,
        }
    }

    /// Parse a JSON array of utterance records, score it and encode the report
    pub fn analyze_json(&self, transcript_json: &str) -> Result<String, ComputeError> {
        let utterances = TranscriptAdapter::parse_array(transcript_json)?;
        let report = self.analyze(&utterances);
        self.encoder.encode_to_json(&utterances, &report)
    }

    /// Score a conversation and flatten the metrics for the insight generator
    pub fn detailed_metrics(&self, utterances: &UtteranceSequence) -> DetailedMetrics {
        encoder::detailed_metrics(&self.analyze(utterances))
    }

    /// Run a full coaching session: rename speakers, score, then ask the
    /// generator for insights.
    ///
    /// A generator failure never fails the analysis; it is recorded in
    /// `insight_error` and placeholder insights are returned.
    pub fn analyze_session(
        &self,
        utterances: &UtteranceSequence,
        speaker_names: &HashMap<String, String>,
        main_user: Option<&str>,
        generator: &dyn InsightGenerator,
    ) -> SessionAnalysis {
        let named = utterances.with_speaker_names(speaker_names);
        let main_user = main_user
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| named.main_user().to_string());

        let report = self.analyze(&named);
        let detailed_metrics = encoder::detailed_metrics(&report);

        let request = InsightRequest::new(
            main_user.clone(),
            &encoder::transcript_text(&named),
            detailed_metrics.clone(),
        );
        let (insights, insight_error) = match generator.generate(&request) {
            Ok(insights) => (insights, None),
            Err(e) => {
                log::warn!("Insight generation failed, using placeholders: {e}");
                (CoachingInsights::failed(), Some(e.to_string()))
            }
        };

        SessionAnalysis {
            main_user,
            score: report.score,
            verdict: report.label,
            detailed_metrics,
            insights,
            insight_error,
            timeline: Timeline::new(&named, &report).entries(),
            pain_points: encoder::pain_points(&report),
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::OfflineInsights;
    use crate::schema::Utterance;
    use crate::types::FrictionLabel;
    use pretty_assertions::assert_eq;

    fn seq(utterances: Vec<Utterance>) -> UtteranceSequence {
        UtteranceSequence::new(utterances).unwrap()
    }

    struct FailingInsights;

    impl InsightGenerator for FailingInsights {
        fn generate(&self, _request: &InsightRequest) -> Result<CoachingInsights, ComputeError> {
            Err(ComputeError::Insight("rate limited".to_string()))
        }
    }

    struct EchoMainUser;

    impl InsightGenerator for EchoMainUser {
        fn generate(&self, request: &InsightRequest) -> Result<CoachingInsights, ComputeError> {
            let mut insights = CoachingInsights::offline();
            insights.analysis.dominance = request.main_user.clone();
            insights.analysis.quality = request.transcript_excerpt.clone();
            Ok(insights)
        }
    }

    #[test]
    fn test_question_left_hanging_scenario() {
        let report = AwkwardnessMeter::default().analyze(&seq(vec![
            Utterance::new(0.0, 5.0, "X", "Hello there friend?"),
            Utterance::new(7.0, 8.0, "Y", "Oh, hi."),
        ]));

        assert_eq!(report.moments.len(), 1);
        assert_eq!(report.moments[0].label, FrictionLabel::LeftHanging);
        assert_eq!(report.moments[0].severity, 1.0);
        assert_eq!((report.moments[0].start, report.moments[0].end), (5.0, 7.0));
        assert!(report.breakdown.base_score >= 20.0);
    }

    #[test]
    fn test_single_utterance_scenario() {
        let meter = AwkwardnessMeter::default();
        let utterances = seq(vec![Utterance::new(0.0, 4.0, "X", "Just me talking")]);
        let report = meter.analyze(&utterances);

        assert_eq!(report.score, 0);
        assert_eq!(report.label, Verdict::SmoothVibes);
        assert!(report.moments.is_empty());
        assert_eq!(report.breakdown, ScoreBreakdown::default());
        assert_eq!(report.metrics.total_duration, 4.0);
        assert_eq!(report.metrics.speakers["X"].speaking_pct, 100.0);

        let metrics = meter.detailed_metrics(&utterances);
        assert_eq!(metrics.speaking_distribution.len(), 1);
        assert_eq!(metrics.speaking_distribution["X"], 100.0);
    }

    #[test]
    fn test_dominance_scenario() {
        let report = AwkwardnessMeter::default().analyze(&seq(vec![
            Utterance::new(0.0, 80.0, "X", "Let me tell you everything"),
            Utterance::new(80.5, 100.0, "Y", "Okay then"),
        ]));

        assert!(report.moments.is_empty());
        assert_eq!(report.breakdown.dominance_penalty, 50.0);
        assert_eq!(report.score, 50);
        assert_eq!(report.label, Verdict::Awkward);
    }

    #[test]
    fn test_fast_latch_scenario() {
        let report = AwkwardnessMeter::default().analyze(&seq(vec![
            Utterance::new(0.0, 2.0, "A", "I was thinking that"),
            Utterance::new(2.1, 4.1, "B", "Right and also"),
            Utterance::new(4.2, 6.2, "A", "Sure but anyway"),
            Utterance::new(6.3, 8.3, "B", "Yes and then"),
        ]));

        assert!(report.moments.is_empty());
        assert_eq!(report.metrics.total_interruptions(), 3);
        assert_eq!(report.breakdown.interruption_penalty, 15.0);
        assert_eq!(report.score, 15);
        assert_eq!(report.label, Verdict::SmoothVibes);
    }

    #[test]
    fn test_empty_transcript_is_neutral() {
        let report = AwkwardnessMeter::default().analyze(&UtteranceSequence::empty());
        assert_eq!(report, Report::empty());
    }

    #[test]
    fn test_scores_bounded_and_labels_consistent() {
        let meter = AwkwardnessMeter::default();
        let cases = vec![
            vec![
                Utterance::new(0.0, 1.0, "A", "Hi?"),
                Utterance::new(30.0, 31.0, "B", "Hello?"),
                Utterance::new(60.0, 61.0, "A", "So?"),
            ],
            vec![
                Utterance::new(0.0, 10.0, "A", "one two three four"),
                Utterance::new(1.0, 12.0, "B", "five six seven eight"),
                Utterance::new(2.0, 14.0, "A", "nine ten eleven twelve"),
            ],
            vec![
                Utterance::new(0.0, 2.0, "A", "Nice weather."),
                Utterance::new(2.5, 4.0, "B", "It is."),
            ],
        ];

        let scorer = CompositeScorer::default();
        for utterances in cases {
            let report = meter.analyze(&seq(utterances));
            assert!(report.score <= 100);
            assert_eq!(report.label, scorer.verdict(report.score));
        }
    }

    #[test]
    fn test_analyze_is_idempotent() {
        let meter = AwkwardnessMeter::default();
        let utterances = seq(vec![
            Utterance::new(0.0, 3.0, "A", "What do you do for fun?"),
            Utterance::new(5.0, 9.0, "B", "I paint, mostly landscapes"),
            Utterance::new(8.5, 12.0, "A", "Oh wow that is great"),
        ]);
        assert_eq!(meter.analyze(&utterances), meter.analyze(&utterances));
    }

    #[test]
    fn test_concurrent_analysis_shares_meter() {
        let meter = AwkwardnessMeter::default();
        let utterances = seq(vec![
            Utterance::new(0.0, 3.0, "A", "Tell me about yourself?"),
            Utterance::new(6.0, 9.0, "B", "Well, where to start"),
        ]);
        let expected = meter.analyze(&utterances);

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| meter.analyze(&utterances)))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn test_custom_config_changes_outcome() {
        let mut config = MeterConfig::default();
        config.scoring.interruption_penalty = 10.0;
        let meter = AwkwardnessMeter::new(config).unwrap();

        let report = meter.analyze(&seq(vec![
            Utterance::new(0.0, 2.0, "A", "I was saying"),
            Utterance::new(2.05, 4.05, "B", "Sorry to jump in"),
        ]));
        assert_eq!(report.breakdown.interruption_penalty, 10.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = MeterConfig::default();
        config.scoring.ratio_reference = -1.0;
        assert!(matches!(
            AwkwardnessMeter::new(config),
            Err(ComputeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_transcript_to_report() {
        let json = r#"[
            {"start": 0.0, "end": 5.0, "speaker": "X", "text": "Hello there friend?"},
            {"start": 7.0, "end": 8.0, "speaker": "Y", "text": "Oh, hi."}
        ]"#;
        let output = transcript_to_report(json.to_string()).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(payload["producer"]["name"], "awkward-meter");
        assert_eq!(payload["pain_points"][0]["label"], "Left Hanging");
        assert_eq!(payload["timeline"][0]["type"], "speech");
        assert_eq!(payload["timeline"][1]["type"], "friction");
        assert_eq!(payload["detailed_metrics"]["duration_total"], 8.0);
    }

    #[test]
    fn test_transcript_to_report_empty_array() {
        let output = transcript_to_report("[]".to_string()).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(payload["score"], 0);
        assert_eq!(payload["verdict"], "Smooth Vibes");
    }

    #[test]
    fn test_transcript_to_report_invalid_input() {
        assert!(matches!(
            transcript_to_report("not json".to_string()),
            Err(ComputeError::JsonError(_))
        ));

        let backwards = r#"[{"start": 3.0, "end": 1.0, "speaker": "X"}]"#;
        assert!(matches!(
            transcript_to_report(backwards.to_string()),
            Err(ComputeError::InvalidSequence(_))
        ));
    }

    #[test]
    fn test_session_renames_without_touching_input() {
        let meter = AwkwardnessMeter::default();
        let utterances = seq(vec![
            Utterance::new(0.0, 2.0, "SPEAKER_00", "How was your week?"),
            Utterance::new(2.5, 5.0, "SPEAKER_01", "Busy but good"),
        ]);
        let names = HashMap::from([
            ("SPEAKER_00".to_string(), "Sam".to_string()),
            ("SPEAKER_01".to_string(), "Alex".to_string()),
        ]);

        let session = meter.analyze_session(&utterances, &names, None, &EchoMainUser);

        assert_eq!(session.main_user, "Sam");
        assert_eq!(session.insights.analysis.dominance, "Sam");
        assert!(session.insights.analysis.quality.starts_with("Sam: How was"));
        assert!(session.detailed_metrics.speaking_distribution.contains_key("Alex"));
        assert_eq!(utterances.speakers(), vec!["SPEAKER_00", "SPEAKER_01"]);
        assert!(session.insight_error.is_none());
    }

    #[test]
    fn test_session_survives_generator_failure() {
        let meter = AwkwardnessMeter::default();
        let utterances = seq(vec![
            Utterance::new(0.0, 2.0, "A", "Anyone there?"),
            Utterance::new(6.0, 7.0, "B", "Yes."),
        ]);

        let session = meter.analyze_session(&utterances, &HashMap::new(), Some("B"), &FailingInsights);

        assert_eq!(session.main_user, "B");
        assert_eq!(session.score, meter.analyze(&utterances).score);
        assert_eq!(session.insights, CoachingInsights::failed());
        assert!(session.insight_error.unwrap().contains("rate limited"));
        assert_eq!(session.pain_points.len(), 1);
    }

    #[test]
    fn test_single_question_is_not_penalised() {
        let json = r#"[{"start": 0.0, "end": 0.5, "speaker": "X", "text": "Anyone?"}]"#;
        let output = transcript_to_report(json.to_string()).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(payload["score"], 0);
        assert_eq!(payload["verdict"], "Smooth Vibes");
        assert_eq!(payload["detailed_metrics"]["speaking_distribution"]["X"], 100.0);
        assert!(!output.contains("-0.0"));
    }

    #[test]
    fn test_session_blank_main_user_falls_back_to_first_speaker() {
        let meter = AwkwardnessMeter::default();
        let utterances = seq(vec![
            Utterance::new(0.0, 2.0, "A", "How was your week?"),
            Utterance::new(2.5, 5.0, "B", "Busy but good"),
        ]);

        for blank in ["", "   "] {
            let session = meter.analyze_session(&utterances, &HashMap::new(), Some(blank), &EchoMainUser);
            assert_eq!(session.main_user, "A");
            assert_eq!(session.insights.analysis.dominance, "A");
        }

        let session = meter.analyze_session(&utterances, &HashMap::new(), Some(" B "), &EchoMainUser);
        assert_eq!(session.main_user, "B");
    }

    #[test]
    fn test_session_carries_renamed_report() {
        let meter = AwkwardnessMeter::default();
        let utterances = seq(vec![
            Utterance::new(0.0, 2.0, "SPEAKER_00", "Did you see it?"),
            Utterance::new(5.0, 6.0, "SPEAKER_01", "Not yet."),
        ]);
        let names = HashMap::from([("SPEAKER_00".to_string(), "Sam".to_string())]);

        let session = meter.analyze_session(&utterances, &names, None, &OfflineInsights);

        assert_eq!(session.report, meter.analyze(&utterances.with_speaker_names(&names)));
        assert_eq!(session.report.score, session.score);
        assert!(session.report.metrics.speakers.contains_key("Sam"));

        let encoded = serde_json::to_value(&session).unwrap();
        assert!(encoded.get("report").is_none());
    }

    #[test]
    fn test_session_with_offline_generator() {
        let session = AwkwardnessMeter::default().analyze_session(
            &UtteranceSequence::empty(),
            &HashMap::new(),
            None,
            &OfflineInsights,
        );
        assert_eq!(session.main_user, "User");
        assert_eq!(session.score, 0);
        assert!(session.timeline.is_empty());
        assert_eq!(session.insights, CoachingInsights::offline());
    }
}
