//! Utterance records and the validated utterance sequence
//!
//! An utterance is one continuous speech turn as delivered by the
//! diarization/transcription provider. The sequence type is the only input the
//! scoring engine accepts: it guarantees finite, positive-length turns with a
//! speaker id, sorted by start time.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Conversation span used when the recorded span is zero or negative
pub const DEGENERATE_SPAN_SEC: f64 = 1.0;

/// Speaker used for the main user when the transcript is empty
pub const DEFAULT_MAIN_USER: &str = "User";

/// Marker the provider puts in unnamed speaker ids (e.g. `SPEAKER_00`)
const RAW_SPEAKER_MARKER: &str = "SPEAKER";

/// One speech turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    /// Start time (seconds from the beginning of the recording)
    pub start: f64,
    /// End time (seconds)
    pub end: f64,
    /// Stable speaker identifier
    pub speaker: String,
    /// Transcribed text (empty when unavailable)
    #[serde(default)]
    pub text: String,
    /// Upstream question flag, set by the transcription provider
    #[serde(default)]
    pub is_question: bool,
}

impl Utterance {
    /// Build an utterance, deriving `is_question` the way the provider does
    /// (trimmed text ends with `?`).
    pub fn new(start: f64, end: f64, speaker: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let is_question = ends_with_question(&text);
        Self {
            start,
            end,
            speaker: speaker.into(),
            text,
            is_question,
        }
    }

    /// Override the upstream question flag. Blank text is never a question.
    pub fn with_question(mut self, is_question: bool) -> Self {
        self.is_question = is_question && !self.text.trim().is_empty();
        self
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whitespace-separated word count; empty text has zero words
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Check the record invariants, reporting `index` on failure
    pub fn validate(&self, index: usize) -> Result<(), ValidationError> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(ValidationError::NonFiniteTime { index });
        }
        if self.start >= self.end {
            return Err(ValidationError::NonPositiveDuration {
                index,
                start: self.start,
                end: self.end,
            });
        }
        if self.speaker.trim().is_empty() {
            return Err(ValidationError::EmptySpeaker { index });
        }
        Ok(())
    }
}

/// Upstream convention for the `is_question` flag
pub fn ends_with_question(text: &str) -> bool {
    text.trim().ends_with('?')
}

/// Wire form of an utterance where `text` and `is_question` may be absent
#[derive(Debug, Clone, Deserialize)]
pub struct UtteranceRecord {
    pub start: f64,
    pub end: f64,
    pub speaker: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub is_question: Option<bool>,
}

impl From<UtteranceRecord> for Utterance {
    fn from(record: UtteranceRecord) -> Self {
        let text = record.text.unwrap_or_default();
        let is_question = !text.trim().is_empty()
            && record
                .is_question
                .unwrap_or_else(|| ends_with_question(&text));
        Utterance {
            start: record.start,
            end: record.end,
            speaker: record.speaker,
            text,
            is_question,
        }
    }
}

/// Validation errors for utterance records
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Utterance {index} has a non-finite start or end time")]
    NonFiniteTime { index: usize },

    #[error("Utterance {index} must end after it starts (start {start}, end {end})")]
    NonPositiveDuration { index: usize, start: f64, end: f64 },

    #[error("Utterance {index} has an empty speaker id")]
    EmptySpeaker { index: usize },
}

/// Validated, start-ordered utterances
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UtteranceSequence {
    utterances: Vec<Utterance>,
}

impl UtteranceSequence {
    /// Validate every utterance and stable-sort by start time.
    ///
    /// Utterances sharing a start time keep their original relative order.
    pub fn new(mut utterances: Vec<Utterance>) -> Result<Self, ValidationError> {
        for (index, utterance) in utterances.iter().enumerate() {
            utterance.validate(index)?;
        }
        utterances.sort_by(|a, b| a.start.total_cmp(&b.start));
        Ok(Self { utterances })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[Utterance] {
        &self.utterances
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Utterance> {
        self.utterances.iter()
    }

    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }

    /// Consecutive `(current, next)` pairs in sequence order
    pub fn pairs(&self) -> impl Iterator<Item = (&Utterance, &Utterance)> {
        self.utterances.windows(2).map(|w| (&w[0], &w[1]))
    }

    /// Conversation span used as the denominator for every ratio.
    ///
    /// `last.end - first.start`, or [`DEGENERATE_SPAN_SEC`] when the sequence
    /// is empty or the span is not positive.
    pub fn total_duration(&self) -> f64 {
        match (self.utterances.first(), self.utterances.last()) {
            (Some(first), Some(last)) if last.end - first.start > 0.0 => last.end - first.start,
            _ => DEGENERATE_SPAN_SEC,
        }
    }

    /// Distinct speakers in order of first appearance
    pub fn speakers(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for utterance in &self.utterances {
            if !seen.contains(&utterance.speaker.as_str()) {
                seen.push(&utterance.speaker);
            }
        }
        seen
    }

    /// Provider-assigned speaker ids that still need a human name, sorted
    pub fn raw_speaker_ids(&self) -> Vec<&str> {
        self.utterances
            .iter()
            .map(|u| u.speaker.as_str())
            .filter(|s| s.contains(RAW_SPEAKER_MARKER))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Return a new sequence with speakers renamed.
    ///
    /// Ids missing from `names` or mapped to a blank name are kept. The
    /// receiver is left untouched.
    pub fn with_speaker_names(&self, names: &HashMap<String, String>) -> Self {
        let utterances = self
            .utterances
            .iter()
            .map(|u| {
                let mut renamed = u.clone();
                if let Some(name) = names.get(&u.speaker) {
                    let name = name.trim();
                    if !name.is_empty() {
                        renamed.speaker = name.to_string();
                    }
                }
                renamed
            })
            .collect();
        Self { utterances }
    }

    /// The speaker coaching is addressed to when the caller names nobody
    pub fn main_user(&self) -> &str {
        self.utterances
            .first()
            .map(|u| u.speaker.as_str())
            .unwrap_or(DEFAULT_MAIN_USER)
    }
}

impl<'a> IntoIterator for &'a UtteranceSequence {
    type Item = &'a Utterance;
    type IntoIter = std::slice::Iter<'a, Utterance>;

    fn into_iter(self) -> Self::IntoIter {
        self.utterances.iter()
    }
}

impl TryFrom<Vec<Utterance>> for UtteranceSequence {
    type Error = ValidationError;

    fn try_from(utterances: Vec<Utterance>) -> Result<Self, Self::Error> {
        Self::new(utterances)
    }
}
