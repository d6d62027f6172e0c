//! Transcript input schema
//!
//! The output contract of the diarization/transcription provider, and the
//! adapter that turns its payloads into a validated utterance sequence.

pub mod adapter;
pub mod utterance;

pub use adapter::{TranscriptAdapter, ValidationResult, UNINTELLIGIBLE_TEXT};
pub use utterance::{
    ends_with_question, Utterance, UtteranceRecord, UtteranceSequence, ValidationError,
    DEFAULT_MAIN_USER, DEGENERATE_SPAN_SEC,
};
