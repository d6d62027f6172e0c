//! Awkward Meter - conversational friction scoring engine
//!
//! The meter turns a diarized, time-ordered transcript into a 0-100
//! "awkwardness" score through a deterministic pipeline: friction detection →
//! speaker metrics aggregation → composite scoring → report encoding.
//!
//! ## Modules
//!
//! - **Scoring Engine**: detector, aggregator and two-stage scorer
//! - **Output Boundary**: detailed metrics, pain points and the merged timeline
//! - **Insight Seam**: the request handed to a pluggable coaching generator

pub mod aggregator;
pub mod config;
pub mod detector;
pub mod encoder;
pub mod error;
pub mod insights;
pub mod pipeline;
pub mod schema;
pub mod scorer;
pub mod timeline;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::MeterConfig;
pub use error::ComputeError;
pub use pipeline::{transcript_to_report, AwkwardnessMeter, SessionAnalysis};

// Schema exports
pub use schema::{TranscriptAdapter, Utterance, UtteranceSequence};

// Insight exports
pub use insights::{CoachingInsights, InsightGenerator, InsightRequest, OfflineInsights};

pub use types::{FlaggedMoment, FrictionLabel, Report, Verdict};

/// Meter version embedded in all encoded reports
pub const METER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for encoded reports
pub const PRODUCER_NAME: &str = "awkward-meter";
