//! Chronological merge of speech and friction
//!
//! The timeline borrows the utterance sequence and the report's moments and
//! yields them lazily in start order. Speech comes before friction when both
//! start at the same instant. Calling [`Timeline::iter`] again restarts the
//! walk from the beginning.

use crate::schema::{Utterance, UtteranceSequence};
use crate::types::{FlaggedMoment, Report};
use serde::Serialize;
use std::iter::{FusedIterator, Peekable};
use std::slice;

/// One event on the merged timeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimelineEvent<'a> {
    Speech(&'a Utterance),
    Friction(&'a FlaggedMoment),
}

impl TimelineEvent<'_> {
    pub fn start(&self) -> f64 {
        match self {
            TimelineEvent::Speech(u) => u.start,
            TimelineEvent::Friction(m) => m.start,
        }
    }

    pub fn end(&self) -> f64 {
        match self {
            TimelineEvent::Speech(u) => u.end,
            TimelineEvent::Friction(m) => m.end,
        }
    }

    /// Owned, serializable form for the presentation boundary
    pub fn to_entry(&self) -> TimelineEntry {
        match self {
            TimelineEvent::Speech(u) => TimelineEntry::Speech {
                start: u.start,
                end: u.end,
                speaker: u.speaker.clone(),
                text: u.text.clone(),
            },
            TimelineEvent::Friction(m) => TimelineEntry::Friction {
                start: m.start,
                end: m.end,
                label: m.label.as_str().to_string(),
                desc: m.description.clone(),
                severity: m.severity,
            },
        }
    }
}

/// Serialized timeline event, tagged with `"type": "speech" | "friction"`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimelineEntry {
    Speech {
        start: f64,
        end: f64,
        speaker: String,
        text: String,
    },
    Friction {
        start: f64,
        end: f64,
        label: String,
        desc: String,
        severity: f64,
    },
}

/// Restartable view over speech and friction in chronological order
#[derive(Debug, Clone, Copy)]
pub struct Timeline<'a> {
    utterances: &'a [Utterance],
    moments: &'a [FlaggedMoment],
}

impl<'a> Timeline<'a> {
    /// Both inputs must already be ordered by start time, which
    /// [`UtteranceSequence`] and [`Report`] guarantee.
    pub fn new(utterances: &'a UtteranceSequence, report: &'a Report) -> Self {
        Self {
            utterances: utterances.as_slice(),
            moments: &report.moments,
        }
    }

    pub fn iter(&self) -> TimelineIter<'a> {
        TimelineIter {
            utterances: self.utterances.iter().peekable(),
            moments: self.moments.iter().peekable(),
        }
    }

    pub fn len(&self) -> usize {
        self.utterances.len() + self.moments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materialize the owned entries
    pub fn entries(&self) -> Vec<TimelineEntry> {
        self.iter().map(|event| event.to_entry()).collect()
    }
}

impl<'a> IntoIterator for &Timeline<'a> {
    type Item = TimelineEvent<'a>;
    type IntoIter = TimelineIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator produced by [`Timeline::iter`]
#[derive(Debug, Clone)]
pub struct TimelineIter<'a> {
    utterances: Peekable<slice::Iter<'a, Utterance>>,
    moments: Peekable<slice::Iter<'a, FlaggedMoment>>,
}

impl<'a> Iterator for TimelineIter<'a> {
    type Item = TimelineEvent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let speech_first = match (self.utterances.peek(), self.moments.peek()) {
            (Some(u), Some(m)) => u.start <= m.start,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => return None,
        };

        if speech_first {
            self.utterances.next().map(TimelineEvent::Speech)
        } else {
            self.moments.next().map(TimelineEvent::Friction)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.utterances.len() + self.moments.len();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TimelineIter<'_> {}

impl FusedIterator for TimelineIter<'_> {}
