//! Error types for the awkwardness meter

use crate::schema::ValidationError;
use thiserror::Error;

/// Errors that can occur while loading transcripts or encoding results.
///
/// Scoring itself never fails; every variant here comes from an input
/// boundary or from a collaborator.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse transcript: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid utterance sequence: {0}")]
    InvalidSequence(#[from] ValidationError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Diarization failed: {0}")]
    Diarization(String),

    #[error("Insight generation failed: {0}")]
    Insight(String),
}
