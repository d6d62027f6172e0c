//! Meter CLI - Command-line interface for the awkwardness meter
//!
//! Commands:
//! - analyze: Score a transcript and print the report
//! - validate: Validate utterance records
//! - speakers: List the speakers found in a transcript
//! - config: Print the scoring configuration
//! - doctor: Diagnose installation and configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use awkward_meter::encoder::ReportEncoder;
use awkward_meter::schema::{TranscriptAdapter, Utterance, UtteranceSequence};
use awkward_meter::types::Report;
use awkward_meter::{
    AwkwardnessMeter, ComputeError, MeterConfig, OfflineInsights, SessionAnalysis, METER_VERSION,
    PRODUCER_NAME,
};

/// Meter - Score the awkwardness of a diarized conversation
#[derive(Parser)]
#[command(name = "meter")]
#[command(version = METER_VERSION)]
#[command(about = "Score conversational friction from a diarized transcript", long_about = None)]
struct Cli {
    /// Enable debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a transcript and print the report
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Scoring configuration file (JSON, partial allowed)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Rename a speaker, e.g. --speaker SPEAKER_00=Sam (repeatable)
        #[arg(long = "speaker", value_name = "ID=NAME")]
        speakers: Vec<String>,

        /// Speaker the coaching is addressed to (defaults to the first speaker)
        #[arg(long)]
        main_user: Option<String>,

        /// Emit the full session analysis instead of the report
        #[arg(long)]
        session: bool,
    },

    /// Validate utterance records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the speakers found in a transcript
    Speakers {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default (or loaded) scoring configuration
    Config {
        /// Configuration file to load and validate
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Diagnose installation and configuration
    Doctor {
        /// Check a configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// JSON array of utterance records
    Json,
    /// Newline-delimited JSON (one utterance per line)
    Ndjson,
    /// Diarization provider job output
    Provider,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Human-readable summary with the timeline of pain
    Text,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), MeterCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            input_format,
            output_format,
            config,
            speakers,
            main_user,
            session,
        } => cmd_analyze(
            &input,
            &output,
            input_format,
            output_format,
            config.as_deref(),
            &speakers,
            main_user.as_deref(),
            session,
        ),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Speakers {
            input,
            input_format,
            json,
        } => cmd_speakers(&input, input_format, json),

        Commands::Config { config } => cmd_config(config.as_deref()),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_analyze(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: Option<&Path>,
    speakers: &[String],
    main_user: Option<&str>,
    session: bool,
) -> Result<(), MeterCliError> {
    let input_data = read_input(input)?;
    let utterances = parse_transcript(&input_data, input_format)?;
    let names = parse_speaker_names(speakers)?;
    let meter = AwkwardnessMeter::new(load_config(config)?)?;

    log::info!(
        "Analyzing {} utterances from {} speakers",
        utterances.len(),
        utterances.speakers().len()
    );

    let output_data = if session {
        let analysis = meter.analyze_session(&utterances, &names, main_user, &OfflineInsights);
        format_session(&analysis, output_format)?
    } else {
        let named = utterances.with_speaker_names(&names);
        let report = meter.analyze(&named);
        let main_user = main_user
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| named.main_user());
        match output_format {
            OutputFormat::Json => {
                serde_json::to_string(&ReportEncoder::new().encode(&named, &report))? + "\n"
            }
            OutputFormat::JsonPretty => ReportEncoder::new().encode_to_json(&named, &report)? + "\n",
            OutputFormat::Text => format_text(&report, main_user),
        }
    };

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), MeterCliError> {
    let input_data = read_input(input)?;
    let utterances = parse_records(&input_data, input_format)?;

    let results = TranscriptAdapter::validate_utterances(&utterances);

    let report = ValidationReport {
        total_utterances: utterances.len(),
        valid_utterances: utterances.len() - results.len(),
        invalid_utterances: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                speaker: r.speaker.clone(),
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total utterances:   {}", report.total_utterances);
        println!("Valid utterances:   {}", report.valid_utterances);
        println!("Invalid utterances: {}", report.invalid_utterances);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Utterance {} (speaker {:?}): {}",
                    err.index, err.speaker, err.error
                );
            }
        }
    }

    if report.invalid_utterances > 0 {
        Err(MeterCliError::ValidationFailed(report.invalid_utterances))
    } else {
        Ok(())
    }
}

fn cmd_speakers(input: &Path, input_format: InputFormat, json: bool) -> Result<(), MeterCliError> {
    let input_data = read_input(input)?;
    let utterances = parse_transcript(&input_data, input_format)?;

    let report = SpeakersReport {
        speakers: utterances
            .speakers()
            .into_iter()
            .map(|speaker| SpeakerSummary {
                speaker: speaker.to_string(),
                utterances: utterances.iter().filter(|u| u.speaker == speaker).count(),
                speaking_seconds: utterances
                    .iter()
                    .filter(|u| u.speaker == speaker)
                    .map(Utterance::duration)
                    .sum(),
            })
            .collect(),
        unnamed: utterances
            .raw_speaker_ids()
            .into_iter()
            .map(str::to_string)
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Speakers");
        println!("========");
        for s in &report.speakers {
            println!(
                "  {:<16} {:>4} turns  {:>8.1}s",
                s.speaker, s.utterances, s.speaking_seconds
            );
        }
        if !report.unnamed.is_empty() {
            println!("\nUnnamed speaker ids (rename with --speaker ID=NAME):");
            for id in &report.unnamed {
                println!("  - {}", id);
            }
        }
    }

    Ok(())
}

fn cmd_config(config: Option<&Path>) -> Result<(), MeterCliError> {
    println!("{}", load_config(config)?.to_json()?);
    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), MeterCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "meter_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Meter version {}", METER_VERSION),
    });

    checks.push(match MeterConfig::default().validate() {
        Ok(()) => DoctorCheck {
            name: "default_config".to_string(),
            status: CheckStatus::Ok,
            message: "Built-in configuration is valid".to_string(),
        },
        Err(e) => DoctorCheck {
            name: "default_config".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        },
    });

    if let Some(config_path) = config {
        let check = if !config_path.exists() {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist".to_string(),
            }
        } else {
            match fs::read_to_string(config_path) {
                Ok(content) => match MeterConfig::from_json(&content) {
                    Ok(_) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: "Config file valid".to_string(),
                    },
                    Err(e) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: e.to_string(),
                    },
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read config file: {}", e),
                },
            }
        };
        checks.push(check);
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass --input <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (--input - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: METER_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Meter Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(MeterCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn read_input(input: &Path) -> Result<String, MeterCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_records(data: &str, format: InputFormat) -> Result<Vec<Utterance>, ComputeError> {
    match format {
        InputFormat::Json => TranscriptAdapter::parse_array_records(data),
        InputFormat::Ndjson => TranscriptAdapter::parse_ndjson_records(data),
        InputFormat::Provider => TranscriptAdapter::parse_provider_records(data),
    }
}

fn parse_transcript(data: &str, format: InputFormat) -> Result<UtteranceSequence, ComputeError> {
    match format {
        InputFormat::Json => TranscriptAdapter::parse_array(data),
        InputFormat::Ndjson => TranscriptAdapter::parse_ndjson(data),
        InputFormat::Provider => TranscriptAdapter::parse_provider(data),
    }
}

fn load_config(path: Option<&Path>) -> Result<MeterConfig, MeterCliError> {
    match path {
        Some(path) => Ok(MeterConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(MeterConfig::default()),
    }
}

fn parse_speaker_names(pairs: &[String]) -> Result<HashMap<String, String>, MeterCliError> {
    let mut names = HashMap::new();
    for pair in pairs {
        match pair.split_once('=') {
            Some((id, name)) if !id.trim().is_empty() => {
                names.insert(id.trim().to_string(), name.trim().to_string());
            }
            _ => return Err(MeterCliError::SpeakerMapping(pair.clone())),
        }
    }
    Ok(names)
}

fn format_session(analysis: &SessionAnalysis, format: OutputFormat) -> Result<String, MeterCliError> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(analysis)? + "\n",
        OutputFormat::JsonPretty => serde_json::to_string_pretty(analysis)? + "\n",
        OutputFormat::Text => format_text(&analysis.report, &analysis.main_user),
    })
}

fn format_text(report: &Report, main_user: &str) -> String {
    let mut out = String::new();
    let b = &report.breakdown;

    let _ = writeln!(out, "Awkwardness Score: {}/100 ({})", report.score, report.label);
    let _ = writeln!(out, "Main user: {}", main_user);
    let _ = writeln!(out, "\nBreakdown:");
    let _ = writeln!(out, "  Base friction:      {:>6.1}", b.base_score);
    let _ = writeln!(out, "  Dominance penalty: +{:>6.1}", b.dominance_penalty);
    let _ = writeln!(out, "  Dead air penalty:  +{:>6.1}", b.silence_penalty);
    let _ = writeln!(out, "  Interruptions:     +{:>6.1}", b.interruption_penalty);

    if !report.metrics.speakers.is_empty() {
        let _ = writeln!(out, "\nSpeakers:");
        for (speaker, stats) in &report.metrics.speakers {
            let _ = writeln!(
                out,
                "  {:<16} {:>5.1}%  {} interruptions, {} questions, {:.1} words/turn",
                speaker,
                stats.speaking_pct,
                stats.interruption_count,
                stats.question_count,
                stats.avg_words_per_turn()
            );
        }
    }

    let _ = writeln!(out, "\nTimeline of pain:");
    if report.moments.is_empty() {
        let _ = writeln!(out, "  (nothing flagged)");
    }
    for m in &report.moments {
        let _ = writeln!(
            out,
            "  [{} - {}] {} (severity {:.1}): {}",
            format_timestamp(m.start),
            format_timestamp(m.end),
            m.label,
            m.severity,
            m.description
        );
    }

    out
}

/// `mm:ss.s` for a time offset in seconds
fn format_timestamp(seconds: f64) -> String {
    let minutes = (seconds / 60.0).floor();
    format!("{:02}:{:04.1}", minutes as u64, seconds - minutes * 60.0)
}

// Error types

#[derive(Debug)]
enum MeterCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    SpeakerMapping(String),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for MeterCliError {
    fn from(e: io::Error) -> Self {
        MeterCliError::Io(e)
    }
}

impl From<ComputeError> for MeterCliError {
    fn from(e: ComputeError) -> Self {
        MeterCliError::Compute(e)
    }
}

impl From<serde_json::Error> for MeterCliError {
    fn from(e: serde_json::Error) -> Self {
        MeterCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<MeterCliError> for CliError {
    fn from(e: MeterCliError) -> Self {
        match e {
            MeterCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            MeterCliError::Compute(e) => {
                let (code, hint) = match &e {
                    ComputeError::InvalidSequence(_) => {
                        ("VALIDATION_ERROR", "Run 'meter validate' for details")
                    }
                    ComputeError::InvalidConfig(_) => {
                        ("CONFIG_ERROR", "Run 'meter config' to see valid keys and defaults")
                    }
                    ComputeError::Diarization(_) => (
                        "DIARIZATION_ERROR",
                        "Check that the provider job finished successfully",
                    ),
                    _ => (
                        "PARSE_ERROR",
                        "Ensure input is a list of {start, end, speaker, text} records",
                    ),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            MeterCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            MeterCliError::SpeakerMapping(pair) => CliError {
                code: "SPEAKER_MAPPING".to_string(),
                message: format!("Invalid speaker mapping '{}'", pair),
                hint: Some("Use --speaker ID=NAME, e.g. --speaker SPEAKER_00=Sam".to_string()),
            },
            MeterCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} utterances failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            MeterCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_utterances: usize,
    valid_utterances: usize,
    invalid_utterances: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    speaker: String,
    error: String,
}

#[derive(serde::Serialize)]
struct SpeakersReport {
    speakers: Vec<SpeakerSummary>,
    unnamed: Vec<String>,
}

#[derive(serde::Serialize)]
struct SpeakerSummary {
    speaker: String,
    utterances: usize,
    speaking_seconds: f64,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_speaker_names() {
        let names = parse_speaker_names(&[
            "SPEAKER_00=Sam".to_string(),
            " SPEAKER_01 = Alex ".to_string(),
        ])
        .unwrap();
        assert_eq!(names["SPEAKER_00"], "Sam");
        assert_eq!(names["SPEAKER_01"], "Alex");

        assert!(parse_speaker_names(&["Sam".to_string()]).is_err());
        assert!(parse_speaker_names(&["=Sam".to_string()]).is_err());
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00.0");
        assert_eq!(format_timestamp(65.5), "01:05.5");
    }

    #[test]
    fn test_format_text_lists_moments() {
        let utterances = UtteranceSequence::new(vec![
            Utterance::new(0.0, 5.0, "X", "Hello there friend?"),
            Utterance::new(7.0, 8.0, "Y", "Oh, hi."),
        ])
        .unwrap();
        let report = AwkwardnessMeter::default().analyze(&utterances);
        let text = format_text(&report, "X");

        assert!(text.contains("Main user: X"));
        assert!(text.contains("Timeline of pain:"));
        assert!(text.contains("[00:05.0 - 00:07.0] Left Hanging"));
    }

    #[test]
    fn test_session_text_uses_renamed_speakers() {
        let utterances = UtteranceSequence::new(vec![
            Utterance::new(0.0, 2.0, "SPEAKER_00", "Did you see it?"),
            Utterance::new(5.0, 6.0, "SPEAKER_01", "Not yet."),
        ])
        .unwrap();
        let names = HashMap::from([("SPEAKER_00".to_string(), "Sam".to_string())]);
        let analysis = AwkwardnessMeter::default().analyze_session(
            &utterances,
            &names,
            None,
            &OfflineInsights,
        );

        let text = format_session(&analysis, OutputFormat::Text).unwrap();

        assert!(text.contains(&format!("Awkwardness Score: {}/100", analysis.score)));
        assert!(text.contains("Main user: Sam"));
        assert!(text.contains("Sam "));
        assert!(text.contains("Left Hanging"));
        assert!(!text.contains("SPEAKER_00"));
    }
}
