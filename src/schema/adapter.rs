//! Adapter for transcript inputs
//!
//! Turns plain utterance arrays, NDJSON streams and raw diarization provider
//! output into a validated [`UtteranceSequence`].

use crate::error::ComputeError;
use crate::schema::utterance::{
    ends_with_question, Utterance, UtteranceRecord, UtteranceSequence, ValidationError,
};
use serde::Deserialize;

/// Placeholder text for turns the provider could not transcribe
pub const UNINTELLIGIBLE_TEXT: &str = "[Unintelligible]";

/// Adapter for converting transcript payloads to utterance sequences
pub struct TranscriptAdapter;

impl TranscriptAdapter {
    /// Parse a JSON array of utterance records without validating them
    pub fn parse_array_records(json: &str) -> Result<Vec<Utterance>, ComputeError> {
        let records: Vec<UtteranceRecord> = serde_json::from_str(json)?;
        Ok(records.into_iter().map(Utterance::from).collect())
    }

    /// Parse NDJSON utterance records without validating them
    pub fn parse_ndjson_records(ndjson: &str) -> Result<Vec<Utterance>, ComputeError> {
        let mut utterances = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<UtteranceRecord>(trimmed) {
                Ok(record) => utterances.push(record.into()),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(utterances)
    }

    /// Parse and validate a JSON array of utterances
    pub fn parse_array(json: &str) -> Result<UtteranceSequence, ComputeError> {
        let utterances = Self::parse_array_records(json)?;
        Ok(UtteranceSequence::new(utterances)?)
    }

    /// Parse and validate NDJSON utterances
    pub fn parse_ndjson(ndjson: &str) -> Result<UtteranceSequence, ComputeError> {
        let utterances = Self::parse_ndjson_records(ndjson)?;
        Ok(UtteranceSequence::new(utterances)?)
    }

    /// Parse diarization provider output into utterance records.
    ///
    /// Accepts either the job envelope (`{"status": ..., "output": ...}`) or
    /// the bare output object. Turn-level transcription is preferred; plain
    /// diarization turns are used as a fallback with placeholder text.
    pub fn parse_provider_records(json: &str) -> Result<Vec<Utterance>, ComputeError> {
        let value: serde_json::Value = serde_json::from_str(json)?;

        let output = if value.get("status").is_some() || value.get("output").is_some() {
            let job: ProviderJob = serde_json::from_value(value)?;
            match job.status.as_deref() {
                None | Some("succeeded") => {}
                Some(status @ ("failed" | "canceled")) => {
                    return Err(ComputeError::Diarization(format!(
                        "Job failed with status: {status}"
                    )));
                }
                Some(status) => {
                    return Err(ComputeError::Diarization(format!(
                        "Job has not finished (status: {status})"
                    )));
                }
            }
            job.output.ok_or_else(|| {
                ComputeError::Diarization("Job finished without output".to_string())
            })?
        } else {
            serde_json::from_value::<ProviderOutput>(value)?
        };

        if let Some(turns) = output.turn_level_transcription {
            log::debug!("Provider returned {} transcribed turns", turns.len());
            return Ok(turns
                .into_iter()
                .map(|t| {
                    let text = t.text.unwrap_or_default().trim().to_string();
                    let is_question = ends_with_question(&text);
                    Utterance {
                        start: t.start,
                        end: t.end,
                        speaker: t.speaker,
                        text,
                        is_question,
                    }
                })
                .collect());
        }

        if let Some(turns) = output.diarization {
            log::warn!("Transcription missing from provider output, using diarization turns only");
            return Ok(turns
                .into_iter()
                .map(|t| Utterance {
                    start: t.start,
                    end: t.end,
                    speaker: t.speaker,
                    text: UNINTELLIGIBLE_TEXT.to_string(),
                    is_question: false,
                })
                .collect());
        }

        Err(ComputeError::Diarization(
            "Provider output contains neither transcription nor diarization turns".to_string(),
        ))
    }

    /// Parse and validate diarization provider output
    pub fn parse_provider(json: &str) -> Result<UtteranceSequence, ComputeError> {
        let utterances = Self::parse_provider_records(json)?;
        Ok(UtteranceSequence::new(utterances)?)
    }

    /// Validate a batch of utterances, reporting every failing record
    pub fn validate_utterances(utterances: &[Utterance]) -> Vec<ValidationResult> {
        utterances
            .iter()
            .enumerate()
            .filter_map(|(index, u)| {
                u.validate(index).err().map(|error| ValidationResult {
                    index,
                    speaker: u.speaker.clone(),
                    error,
                })
            })
            .collect()
    }
}

/// A failing record found by [`TranscriptAdapter::validate_utterances`]
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub index: usize,
    pub speaker: String,
    pub error: ValidationError,
}

#[derive(Debug, Deserialize)]
struct ProviderJob {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    output: Option<ProviderOutput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderOutput {
    #[serde(default)]
    turn_level_transcription: Option<Vec<ProviderTurn>>,
    #[serde(default)]
    diarization: Option<Vec<ProviderTurn>>,
}

#[derive(Debug, Deserialize)]
struct ProviderTurn {
    start: f64,
    end: f64,
    speaker: String,
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_array() {
        let json = r#"[
            {"start": 3.0, "end": 4.0, "speaker": "B", "text": "Sure."},
            {"start": 0.0, "end": 2.5, "speaker": "A", "text": "Want to grab coffee?"}
        ]"#;
        let seq = TranscriptAdapter::parse_array(json).unwrap();

        assert_eq!(seq.len(), 2);
        assert_eq!(seq.as_slice()[0].speaker, "A");
        assert!(seq.as_slice()[0].is_question);
    }

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let ndjson = "{\"start\": 0.0, \"end\": 1.0, \"speaker\": \"A\", \"text\": \"hi\"}\n\n{\"start\": 1.2, \"end\": 2.0, \"speaker\": \"B\"}\n";
        let seq = TranscriptAdapter::parse_ndjson(ndjson).unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.as_slice()[1].text, "");
    }

    #[test]
    fn test_parse_ndjson_reports_line_number() {
        let ndjson = "{\"start\": 0.0, \"end\": 1.0, \"speaker\": \"A\"}\nnot json\n";
        let err = TranscriptAdapter::parse_ndjson(ndjson).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_array_rejects_invalid_sequence() {
        let json = r#"[{"start": 2.0, "end": 1.0, "speaker": "A"}]"#;
        assert!(matches!(
            TranscriptAdapter::parse_array(json),
            Err(ComputeError::InvalidSequence(_))
        ));
    }

    #[test]
    fn test_provider_turn_level_transcription() {
        let json = r#"{
            "status": "succeeded",
            "output": {
                "turnLevelTranscription": [
                    {"start": 0.0, "end": 2.0, "speaker": "SPEAKER_00", "text": "  Did you eat?  "},
                    {"start": 2.5, "end": 4.0, "speaker": "SPEAKER_01", "text": "Yes."}
                ]
            }
        }"#;
        let seq = TranscriptAdapter::parse_provider(json).unwrap();

        assert_eq!(seq.as_slice()[0].text, "Did you eat?");
        assert!(seq.as_slice()[0].is_question);
        assert!(!seq.as_slice()[1].is_question);
    }

    #[test]
    fn test_provider_bare_output_diarization_fallback() {
        let json = r#"{
            "diarization": [
                {"start": 0.0, "end": 2.0, "speaker": "SPEAKER_00"},
                {"start": 2.5, "end": 4.0, "speaker": "SPEAKER_01"}
            ]
        }"#;
        let seq = TranscriptAdapter::parse_provider(json).unwrap();

        assert!(seq.iter().all(|u| u.text == UNINTELLIGIBLE_TEXT));
        assert!(seq.iter().all(|u| !u.is_question));
    }

    #[test]
    fn test_provider_failed_job() {
        let json = r#"{"status": "failed"}"#;
        let err = TranscriptAdapter::parse_provider(json).unwrap_err();
        assert!(matches!(err, ComputeError::Diarization(_)));
        assert!(err.to_string().contains("failed"));
    }

    #[test]
    fn test_provider_running_job() {
        let json = r#"{"status": "running"}"#;
        assert!(matches!(
            TranscriptAdapter::parse_provider(json),
            Err(ComputeError::Diarization(_))
        ));
    }

    #[test]
    fn test_provider_output_without_turns() {
        let json = r#"{"status": "succeeded", "output": {}}"#;
        assert!(matches!(
            TranscriptAdapter::parse_provider(json),
            Err(ComputeError::Diarization(_))
        ));
    }

    #[test]
    fn test_validate_utterances_reports_all_failures() {
        let utterances = vec![
            Utterance::new(0.0, 1.0, "A", "fine"),
            Utterance::new(2.0, 1.0, "B", "backwards"),
            Utterance::new(3.0, 4.0, "", "nobody"),
        ];
        let results = TranscriptAdapter::validate_utterances(&utterances);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].index, 1);
        assert_eq!(results[0].speaker, "B");
        assert_eq!(results[1].error, ValidationError::EmptySpeaker { index: 2 });
    }
}
