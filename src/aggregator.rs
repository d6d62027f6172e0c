//! Per-speaker behavioral metrics
//!
//! Dominance, fast-latch interruptions, silence statistics and engagement are
//! each computed independently from the same utterance sequence.

use crate::config::MetricsConfig;
use crate::schema::{Utterance, UtteranceSequence};
use crate::types::{ConversationMetrics, FlaggedMoment, SilenceStats, SpeakerStats};
use std::collections::BTreeMap;

/// Aggregator for speaker-level conversation metrics
#[derive(Debug, Clone, Default)]
pub struct SpeakerMetricsAggregator {
    config: MetricsConfig,
}

impl SpeakerMetricsAggregator {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Compute every metric group for `utterances`.
    ///
    /// `moments` only feeds the silence statistics.
    pub fn aggregate(
        &self,
        utterances: &UtteranceSequence,
        moments: &[FlaggedMoment],
    ) -> ConversationMetrics {
        let total_duration = utterances.total_duration();

        let mut speakers: BTreeMap<String, SpeakerStats> = BTreeMap::new();
        for (speaker, seconds) in speaking_time(utterances) {
            speakers.insert(
                speaker,
                SpeakerStats {
                    speaking_seconds: seconds,
                    speaking_pct: round_dp(seconds / total_duration * 100.0, 1),
                    ..Default::default()
                },
            );
        }

        for (speaker, count) in self.count_interruptions(utterances) {
            if let Some(stats) = speakers.get_mut(&speaker) {
                stats.interruption_count = count;
            }
        }

        for utterance in utterances {
            if let Some(stats) = speakers.get_mut(&utterance.speaker) {
                if self.is_real_question(utterance) {
                    stats.question_count += 1;
                }
                stats.turn_word_counts.push(utterance.word_count());
            }
        }

        let silence = silence_stats(moments);

        log::debug!(
            "Aggregated {} speakers over {:.1}s ({} interruptions, {} silences)",
            speakers.len(),
            total_duration,
            speakers.values().map(|s| s.interruption_count).sum::<u32>(),
            silence.count
        );

        ConversationMetrics {
            total_duration,
            speakers,
            silence,
        }
    }

    /// Fast-latch interruptions per speaker.
    ///
    /// On every speaker change, the later speaker is charged when they start
    /// within the latch gap (or over the previous turn) and keep talking past
    /// the backchannel duration.
    pub fn count_interruptions(&self, utterances: &UtteranceSequence) -> BTreeMap<String, u32> {
        let mut counts: BTreeMap<String, u32> = BTreeMap::new();
        for (prev, curr) in utterances.pairs() {
            if prev.speaker == curr.speaker {
                continue;
            }
            let gap = curr.start - prev.end;
            let is_latch = gap < self.config.fast_latch_gap_sec;
            let is_substantial = curr.duration() > self.config.min_interrupter_duration_sec;
            if is_latch && is_substantial {
                *counts.entry(curr.speaker.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Engagement filter: contains `?` and has enough words to be more than
    /// a tag question. Independent of the upstream `is_question` flag.
    pub fn is_real_question(&self, utterance: &Utterance) -> bool {
        utterance.text.contains('?') && utterance.word_count() > self.config.real_question_min_words
    }
}

/// Total speaking seconds per speaker
fn speaking_time(utterances: &UtteranceSequence) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for utterance in utterances {
        *totals.entry(utterance.speaker.clone()).or_insert(0.0) += utterance.duration();
    }
    totals
}

/// Count, mean and total duration of silence-labelled moments
fn silence_stats(moments: &[FlaggedMoment]) -> SilenceStats {
    let durations: Vec<f64> = moments
        .iter()
        .filter(|m| m.label.is_silence())
        .map(FlaggedMoment::duration)
        .collect();

    let total_duration: f64 = durations.iter().sum();
    let avg_duration = if durations.is_empty() {
        0.0
    } else {
        total_duration / durations.len() as f64
    };

    SilenceStats {
        count: durations.len(),
        avg_duration,
        total_duration,
    }
}

/// Round to a fixed number of decimal places
pub(crate) fn round_dp(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
