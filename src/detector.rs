//! Temporal friction detection
//!
//! Scans each consecutive utterance pair for dead air and talk-over. At most
//! one moment is flagged per pair, and the last utterance never produces one.

use crate::config::DetectorConfig;
use crate::schema::{Utterance, UtteranceSequence};
use crate::types::{FlaggedMoment, FrictionLabel};

/// Detector for gaps and overlaps between adjacent utterances
#[derive(Debug, Clone, Default)]
pub struct FrictionDetector {
    config: DetectorConfig,
}

impl FrictionDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Flag friction moments across the whole sequence, ordered by start
    pub fn detect(&self, utterances: &UtteranceSequence) -> Vec<FlaggedMoment> {
        let mut moments: Vec<FlaggedMoment> = utterances
            .pairs()
            .filter_map(|(current, next)| self.classify_pair(current, next))
            .collect();
        moments.sort_by(|a, b| a.start.total_cmp(&b.start));

        log::debug!(
            "Flagged {} friction moments across {} utterances",
            moments.len(),
            utterances.len()
        );
        moments
    }

    /// Classify the gap between `current` and the utterance that follows it.
    ///
    /// Silence is checked before overlap; a question met with silence is
    /// always the worst case regardless of how long the silence lasts.
    pub fn classify_pair(&self, current: &Utterance, next: &Utterance) -> Option<FlaggedMoment> {
        let cfg = &self.config;
        let gap = next.start - current.end;

        if gap > cfg.silence_awkward_sec {
            let (label, severity, description) = if current.is_question {
                (
                    FrictionLabel::LeftHanging,
                    cfg.severity_left_hanging,
                    format!("Question left hanging for {gap:.1}s."),
                )
            } else if gap > cfg.silence_painful_sec {
                (
                    FrictionLabel::PainfulSilence,
                    cfg.severity_painful_silence,
                    format!("Painfully long silence of {gap:.1}s."),
                )
            } else {
                (
                    FrictionLabel::AwkwardSilence,
                    cfg.severity_awkward_silence,
                    format!("Uncomfortable pause of {gap:.1}s."),
                )
            };

            return Some(FlaggedMoment {
                start: current.end,
                end: next.start,
                severity,
                label,
                description,
            });
        }

        // Short overlapping acknowledgements ("yeah") are backchannels
        if gap < -cfg.overlap_bad_sec && next.word_count() > cfg.backchannel_max_words {
            return Some(FlaggedMoment {
                start: next.start,
                end: current.end,
                severity: cfg.severity_interruption,
                label: FrictionLabel::Interruption,
                description: format!("Speech overlap of {:.1}s.", gap.abs()),
            });
        }

        None
    }
}
