//! Narrative-insight collaborator seam
//!
//! The engine never talks to a language model itself. It builds an
//! [`InsightRequest`] from the scored report and hands it to whatever
//! [`InsightGenerator`] the caller plugs in.

use crate::error::ComputeError;
use crate::types::DetailedMetrics;
use serde::{Deserialize, Serialize};

/// Maximum transcript characters forwarded to the generator
pub const TRANSCRIPT_EXCERPT_CHARS: usize = 3000;

const OFFLINE_TEXT: &str = "AI Offline.";
const OFFLINE_ACTION: &str = "Please configure an insight generator.";
const FAILED_TEXT: &str = "Error";
const FAILED_ACTION: &str = "AI Analysis Failed.";

/// Everything the generator receives for one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRequest {
    /// Speaker the coaching is addressed to
    pub main_user: String,
    pub transcript_excerpt: String,
    pub metrics: DetailedMetrics,
}

impl InsightRequest {
    /// Build a request, truncating the transcript to
    /// [`TRANSCRIPT_EXCERPT_CHARS`] characters
    pub fn new(main_user: impl Into<String>, transcript: &str, metrics: DetailedMetrics) -> Self {
        Self {
            main_user: main_user.into(),
            transcript_excerpt: excerpt(transcript, TRANSCRIPT_EXCERPT_CHARS),
            metrics,
        }
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Critique for each of the four pillars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PillarAnalysis {
    pub dominance: String,
    pub interruptions: String,
    pub silence: String,
    pub quality: String,
}

impl PillarAnalysis {
    fn uniform(text: &str) -> Self {
        Self {
            dominance: text.to_string(),
            interruptions: text.to_string(),
            silence: text.to_string(),
            quality: text.to_string(),
        }
    }
}

/// One scripted replay of a moment the main user could have handled better
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionStep {
    pub speaker: String,
    pub context: String,
    pub display_text: String,
    pub audio_trigger_speaker: String,
    pub audio_trigger_text: String,
    pub audio_response_text: String,
}

/// Action plan entry: a full replay step, or a plain note when the generator
/// had nothing structured to say
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionItem {
    Step(ActionStep),
    Note(String),
}

/// Generator output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachingInsights {
    pub analysis: PillarAnalysis,
    #[serde(default)]
    pub action_plan: Vec<ActionItem>,
}

impl CoachingInsights {
    /// Placeholder used when no generator is configured
    pub fn offline() -> Self {
        Self {
            analysis: PillarAnalysis::uniform(OFFLINE_TEXT),
            action_plan: vec![ActionItem::Note(OFFLINE_ACTION.to_string())],
        }
    }

    /// Placeholder used when the generator failed
    pub fn failed() -> Self {
        Self {
            analysis: PillarAnalysis::uniform(FAILED_TEXT),
            action_plan: vec![ActionItem::Note(FAILED_ACTION.to_string())],
        }
    }

    /// Parse a generator's JSON reply
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        serde_json::from_str(json).map_err(|e| ComputeError::Insight(e.to_string()))
    }

    /// Structured replay steps only
    pub fn steps(&self) -> impl Iterator<Item = &ActionStep> {
        self.action_plan.iter().filter_map(|item| match item {
            ActionItem::Step(step) => Some(step),
            ActionItem::Note(_) => None,
        })
    }
}

/// Produces coaching insights from scored metrics.
///
/// Implementations must be shareable across threads so a single meter can
/// serve concurrent analyses.
pub trait InsightGenerator: Send + Sync {
    fn generate(&self, request: &InsightRequest) -> Result<CoachingInsights, ComputeError>;
}

/// Generator that always answers with the offline placeholder
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineInsights;

impl InsightGenerator for OfflineInsights {
    fn generate(&self, _request: &InsightRequest) -> Result<CoachingInsights, ComputeError> {
        Ok(CoachingInsights::offline())
    }
}
