//! Meno CLI - Command-line interface for the insights core
//!
//! Commands:
//! - report: Compute an insights report from exported log records
//! - validate: Validate log record schema
//! - schema: Print input/output schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};

use meno_insights::config::InsightsConfig;
use meno_insights::pipeline::InsightsProcessor;
use meno_insights::schema::{LogRecord, LogRecordAdapter, SCHEMA_VERSION};
use meno_insights::{InsightError, INSIGHTS_VERSION};

/// Meno - derived wellness metrics from symptom journal check-ins
#[derive(Parser)]
#[command(name = "meno")]
#[command(version = INSIGHTS_VERSION)]
#[command(about = "Compute journal insights from exported log records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute an insights report
    Report {
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

        /// Settings file (JSON, partial overrides allowed)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Service-computed correlations to merge (JSON array)
        #[arg(long)]
        remote_correlations: Option<PathBuf>,

        /// Load a saved entry store before ingesting
        #[arg(long)]
        load_store: Option<PathBuf>,

        /// Save the entry store after ingesting
        #[arg(long)]
        save_store: Option<PathBuf>,

        /// Fail on the first invalid record instead of skipping it
        #[arg(long)]
        strict: bool,
    },

    /// Validate log record schema
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

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// JSON array of records, as served by /logs
    Json,
    /// Newline-delimited JSON (one record per line)
    Ndjson,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaType {
    /// Input schema (journal.log_record.v1)
    Input,
    /// Output schema (insights report)
    Output,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr; filter from MENO_LOG, then RUST_LOG, defaulting to warn
fn init_tracing() {
    let directives = std::env::var("MENO_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".to_string());
    let filter = tracing_subscriber::EnvFilter::try_new(&directives)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), MenoCliError> {
    match cli.command {
        Commands::Report {
            input,
            output,
            input_format,
            output_format,
            config,
            remote_correlations,
            load_store,
            save_store,
            strict,
        } => cmd_report(ReportArgs {
            input: &input,
            output: &output,
            input_format,
            output_format,
            config: config.as_deref(),
            remote_correlations: remote_correlations.as_deref(),
            load_store: load_store.as_deref(),
            save_store: save_store.as_deref(),
            strict,
        }),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

struct ReportArgs<'a> {
    input: &'a Path,
    output: &'a Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: Option<&'a Path>,
    remote_correlations: Option<&'a Path>,
    load_store: Option<&'a Path>,
    save_store: Option<&'a Path>,
    strict: bool,
}

fn cmd_report(args: ReportArgs<'_>) -> Result<(), MenoCliError> {
    let config = match args.config {
        Some(path) => InsightsConfig::from_json(&fs::read_to_string(path)?)?,
        None => InsightsConfig::default(),
    };
    let mut processor = InsightsProcessor::with_config(config)?;

    if let Some(path) = args.load_store {
        processor.load_store(&fs::read_to_string(path)?)?;
        debug!(entries = processor.entry_count(), "loaded entry store");
    }

    let input_data = read_input(args.input)?;
    let records = parse_records(&input_data, args.input_format)?;
    if records.is_empty() && processor.entry_count() == 0 {
        return Err(MenoCliError::NoRecords);
    }

    let entries = if args.strict {
        LogRecordAdapter::to_entries_strict(&records)?
    } else {
        LogRecordAdapter::to_entries(&records)
    };
    info!(
        records = records.len(),
        accepted = entries.len(),
        "parsed log records"
    );
    let summary = processor.ingest_entries(entries);
    debug!(?summary, "merged into entry store");

    if let Some(path) = args.remote_correlations {
        processor.set_remote_correlations(&fs::read_to_string(path)?)?;
    }

    if let Some(path) = args.save_store {
        fs::write(path, processor.save_store()?)?;
    }

    let output_data = match args.output_format {
        OutputFormat::JsonPretty => processor.report()?,
        OutputFormat::Json => serde_json::to_string(&processor.insights_report())?,
    };
    write_output(args.output, &output_data)
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), MenoCliError> {
    let input_data = read_input(input)?;
    let records = parse_records(&input_data, input_format)?;
    let results = LogRecordAdapter::validate_records(&records);

    let report = ValidationReport {
        schema_version: SCHEMA_VERSION.to_string(),
        total_records: records.len(),
        valid_records: records.len() - results.len(),
        invalid_records: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                record_id: r.record_id.clone(),
                error: r.result.as_ref().map(|e| e.to_string()).unwrap_or_default(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                let id = if err.record_id.is_empty() {
                    "unknown"
                } else {
                    err.record_id.as_str()
                };
                println!("  - Record {} (index {}): {}", id, err.index, err.error);
            }
        }
    }

    if report.invalid_records > 0 {
        Err(MenoCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), MenoCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", input_json_schema());
            } else {
                println!("Input Schema: {}", SCHEMA_VERSION);
                println!();
                println!("A JSON array of log records as returned by GET /logs. Required:");
                println!("  - id: string or number");
                println!("  - date: YYYY-MM-DD (an RFC 3339 timestamp is accepted)");
                println!();
                println!("Optional (null or missing is fine):");
                println!("  - logType: morning | evening");
                println!("  - loggedAt: RFC 3339 timestamp");
                println!("  - symptomsJson: {{key: severity}} or {{key: {{severity, comparison}}}}, object or encoded string");
                println!("  - mood (1-5), energy (1-3), sleepHours, disruptions");
                println!("  - sleepQuality: terrible | poor | ok | good | great");
                println!("  - contextTags: array, JSON-encoded array, or comma list");
                println!("  - notes: free text or JSON {{grateful, intention}} / {{highlight, learned}}");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", output_json_schema());
            } else {
                println!("Output Schema: insights report");
                println!();
                println!("- report_version: Schema version (1.0.0)");
                println!("- producer: {{ name, version, instance_id }}");
                println!("- provenance: {{ entry_count, newest_date, oldest_date, computed_at_utc }}");
                println!("- quality: {{ coverage, flags }}");
                println!("- readiness: 5-99 or null, with readiness_breakdown");
                println!("- symptom_trends: up to 6 {{ key, name, average_severity, occurrence_count, trend_percent, sparkline }}");
                println!("- sleep: {{ score, avg_hours, avg_disruptions, weekly_bars, ... }} or null");
                println!("- correlations: up to 4 factor/symptom associations");
                println!("- weekly_story: {{ text, best_day_label, worst_day_label, ... }} or null");
            }
        }
    }

    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, MenoCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), MenoCliError> {
    if output.to_string_lossy() == "-" {
        println!("{data}");
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn parse_records(data: &str, format: InputFormat) -> Result<Vec<LogRecord>, MenoCliError> {
    let records = match format {
        InputFormat::Json => LogRecordAdapter::parse_array(data)?,
        InputFormat::Ndjson => LogRecordAdapter::parse_ndjson(data)?,
    };
    Ok(records)
}

fn input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": SCHEMA_VERSION,
        "description": "Symptom journal log record",
        "type": "array",
        "items": {
            "type": "object",
            "required": ["id", "date"],
            "properties": {
                "id": { "type": ["string", "integer"] },
                "date": { "type": "string", "description": "YYYY-MM-DD" },
                "logType": { "type": ["string", "null"], "enum": ["morning", "evening", null] },
                "loggedAt": { "type": ["string", "null"], "format": "date-time" },
                "symptomsJson": {
                    "type": ["object", "string", "null"],
                    "additionalProperties": {
                        "oneOf": [
                            { "type": "integer", "minimum": 1, "maximum": 3 },
                            {
                                "type": "object",
                                "required": ["severity"],
                                "properties": {
                                    "severity": { "type": "integer", "minimum": 1, "maximum": 3 },
                                    "comparison": { "enum": ["better", "same", "worse"] }
                                }
                            }
                        ]
                    }
                },
                "mood": { "type": ["number", "null"], "minimum": 1, "maximum": 5 },
                "energy": { "type": ["number", "null"], "minimum": 1, "maximum": 3 },
                "sleepHours": { "type": ["number", "null"], "minimum": 0 },
                "sleepQuality": { "type": ["string", "null"] },
                "disruptions": { "type": ["number", "null"], "minimum": 0 },
                "contextTags": { "type": ["array", "string", "null"] },
                "notes": { "type": ["string", "null"] }
            }
        }
    })
    .to_string()
}

fn output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "insights report",
        "type": "object",
        "required": [
            "report_version", "producer", "provenance", "quality",
            "symptom_trends", "correlations"
        ],
        "properties": {
            "report_version": { "type": "string" },
            "producer": {
                "type": "object",
                "required": ["name", "version", "instance_id"]
            },
            "provenance": {
                "type": "object",
                "required": ["entry_count", "computed_at_utc"]
            },
            "quality": {
                "type": "object",
                "properties": {
                    "coverage": { "type": "number", "minimum": 0, "maximum": 1 },
                    "flags": {
                        "type": "array",
                        "items": {
                            "enum": [
                                "no_entries", "missing_sleep_data", "missing_mood_data",
                                "insufficient_for_correlations", "insufficient_for_narrative"
                            ]
                        }
                    }
                }
            },
            "readiness": { "type": ["integer", "null"], "minimum": 5, "maximum": 99 },
            "symptom_trends": { "type": "array", "maxItems": 6 },
            "sleep": { "type": ["object", "null"] },
            "correlations": { "type": "array" },
            "weekly_story": { "type": ["object", "null"] }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum MenoCliError {
    Io(io::Error),
    Insight(InsightError),
    Json(serde_json::Error),
    NoRecords,
    ValidationFailed(usize),
}

impl From<io::Error> for MenoCliError {
    fn from(e: io::Error) -> Self {
        MenoCliError::Io(e)
    }
}

impl From<InsightError> for MenoCliError {
    fn from(e: InsightError) -> Self {
        MenoCliError::Insight(e)
    }
}

impl From<serde_json::Error> for MenoCliError {
    fn from(e: serde_json::Error) -> Self {
        MenoCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<MenoCliError> for CliError {
    fn from(e: MenoCliError) -> Self {
        match e {
            MenoCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            MenoCliError::Insight(InsightError::InvalidConfig(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Fix the settings file passed with --config".to_string()),
            },
            MenoCliError::Insight(
                e @ (InsightError::InvalidDate(_) | InsightError::InvalidRecord(_)),
            ) => CliError {
                code: "INVALID_RECORD".to_string(),
                message: e.to_string(),
                hint: Some("Run `meno validate` to list every invalid record".to_string()),
            },
            MenoCliError::Insight(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches the {SCHEMA_VERSION} schema")),
            },
            MenoCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            MenoCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No log records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            MenoCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    schema_version: String,
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    record_id: String,
    error: String,
}
