//! Runquest CLI - Command-line interface for the Runquest engine
//!
//! Commands:
//! - simulate: Replay NDJSON telemetry through a full run (encounters, sprints, rewards)
//! - score: Score a single telemetry window
//! - standing: Show rank, division and level for a ledger or an RP value
//! - config: Print the default configuration or validate a config file

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use runquest::config::MAX_DURATION_SECS;
use runquest::engine::{EngineMessage, RunEngine, SprintRecord};
use runquest::pets::PetCollection;
use runquest::progression::{ProgressionLedger, Standing};
use runquest::roll::{RngRoller, Roller};
use runquest::scoring::SprintScorer;
use runquest::store::{JsonFileStore, MemoryStore, ProgressStore};
use runquest::{EngineConfig, EngineError, StoreError, TelemetrySample, VERSION};

/// Runquest - Sprint validation and encounter/reward engine
#[derive(Parser)]
#[command(name = "runquest")]
#[command(version = VERSION)]
#[command(about = "Replay and score interval-running telemetry", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay telemetry through a full run
    Simulate {
        /// Telemetry NDJSON file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Engine configuration JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory holding ledger.json and pets.json (in-memory if omitted)
        #[arg(long)]
        state_dir: Option<PathBuf>,

        /// Seed for reproducible rolls
        #[arg(long)]
        seed: Option<u64>,

        /// Run start time (RFC 3339, defaults to now)
        #[arg(long)]
        start: Option<String>,

        /// Output format
        #[arg(long, default_value = "events")]
        output_format: SimulateOutput,
    },

    /// Score a telemetry window
    Score {
        /// Telemetry NDJSON file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Baseline heart rate (defaults to the first sample)
        #[arg(long)]
        baseline: Option<u32>,

        /// Engine configuration JSON
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show rank standing
    Standing {
        /// Ledger JSON file
        #[arg(long, conflicts_with = "rp")]
        ledger: Option<PathBuf>,

        /// Reputation points
        #[arg(long)]
        rp: Option<u64>,

        /// Engine configuration JSON
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print or validate configuration
    Config {
        /// Validate this file instead of printing the defaults
        #[arg(long)]
        validate: Option<PathBuf>,
    },
}

#[derive(Clone, ValueEnum)]
enum SimulateOutput {
    /// One engine event per line
    Events,
    /// Pretty-printed run summary
    Summary,
}

/// One telemetry record: seconds since run start, heart rate, cadence
#[derive(Debug, Deserialize)]
struct TelemetryRecord {
    t: f64,
    hr: f64,
    #[serde(default)]
    cadence: f64,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

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

fn run(cli: Cli) -> Result<(), RunquestCliError> {
    match cli.command {
        Commands::Simulate {
            input,
            config,
            state_dir,
            seed,
            start,
            output_format,
        } => cmd_simulate(
            &input,
            config.as_deref(),
            state_dir.as_deref(),
            seed,
            start.as_deref(),
            output_format,
        ),

        Commands::Score {
            input,
            baseline,
            config,
        } => cmd_score(&input, baseline, config.as_deref()),

        Commands::Standing { ledger, rp, config } => {
            cmd_standing(ledger.as_deref(), rp, config.as_deref())
        }

        Commands::Config { validate } => cmd_config(validate.as_deref()),
    }
}

#[derive(Serialize)]
struct RunSummary<'a> {
    sprints: &'a [SprintRecord],
    standing: Standing,
    level: u32,
    ledger: &'a ProgressionLedger,
    pets: &'a PetCollection,
}

fn cmd_simulate(
    input: &Path,
    config: Option<&Path>,
    state_dir: Option<&Path>,
    seed: Option<u64>,
    start: Option<&str>,
    output_format: SimulateOutput,
) -> Result<(), RunquestCliError> {
    let config = load_config(config)?;
    let records = read_telemetry(input)?;
    let started_at = match start {
        Some(s) => DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc),
        None => Utc::now(),
    };

    let store: Box<dyn ProgressStore> = match state_dir {
        Some(dir) => {
            // Refuse to start over unreadable state rather than overwrite it
            let store = JsonFileStore::in_dir(dir);
            store.load_ledger()?;
            store.load_pets()?;
            Box::new(store)
        }
        None => Box::new(MemoryStore::new()),
    };
    let roller: Box<dyn Roller> = match seed {
        Some(seed) => Box::new(RngRoller::seeded(seed)),
        None => Box::new(RngRoller::from_entropy()),
    };

    let mut engine = RunEngine::new(config, store, roller)?;
    let mut stdout = io::stdout();
    let print_events = matches!(output_format, SimulateOutput::Events);

    let mut events = engine.start_run(started_at);
    let mut last_t = 0.0;
    for record in records {
        let dt = record.t - last_t;
        if dt.is_finite() && dt > 0.0 {
            engine.post(EngineMessage::Tick(Duration::from_secs_f64(dt)));
            last_t = record.t;
        }
        engine.post(EngineMessage::Sample(TelemetrySample::from_raw(
            record.hr,
            record.cadence,
        )));
        events.extend(engine.pump());

        if print_events {
            for event in events.drain(..) {
                writeln!(stdout, "{}", event.to_json()?)?;
            }
        }
    }
    events.extend(engine.end_run());

    match output_format {
        SimulateOutput::Events => {
            for event in &events {
                writeln!(stdout, "{}", event.to_json()?)?;
            }
        }
        SimulateOutput::Summary => {
            let summary = RunSummary {
                sprints: engine.history(),
                standing: engine.ledger().standing(&engine.config().ranks),
                level: engine.ledger().level(),
                ledger: engine.ledger(),
                pets: engine.pets(),
            };
            writeln!(stdout, "{}", serde_json::to_string_pretty(&summary)?)?;
        }
    }
    stdout.flush()?;
    Ok(())
}

fn cmd_score(
    input: &Path,
    baseline: Option<u32>,
    config: Option<&Path>,
) -> Result<(), RunquestCliError> {
    let config = load_config(config)?;
    let samples: Vec<TelemetrySample> = read_telemetry(input)?
        .into_iter()
        .map(|r| TelemetrySample::from_raw(r.hr, r.cadence))
        .collect();

    let Some(first) = samples.first() else {
        return Err(RunquestCliError::NoSamples);
    };
    let baseline = baseline.unwrap_or(first.heart_rate);

    let max_hr = config.scoring.max_heart_rate;
    let breakdown = SprintScorer::new(config.scoring).score_window(&samples, baseline, max_hr);
    println!("{}", serde_json::to_string_pretty(&breakdown)?);
    Ok(())
}

#[derive(Serialize)]
struct StandingReport {
    reputation_points: u64,
    #[serde(flatten)]
    standing: Standing,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<u32>,
}

fn cmd_standing(
    ledger: Option<&Path>,
    rp: Option<u64>,
    config: Option<&Path>,
) -> Result<(), RunquestCliError> {
    let config = load_config(config)?;
    let (reputation_points, level) = match (ledger, rp) {
        (Some(path), _) => {
            let ledger = ProgressionLedger::from_json(&fs::read_to_string(path)?)?;
            (ledger.reputation_points, Some(ledger.level()))
        }
        (None, Some(rp)) => (rp, None),
        (None, None) => {
            return Err(RunquestCliError::InvalidArgs(
                "either --ledger or --rp is required".to_string(),
            ))
        }
    };

    let report = StandingReport {
        reputation_points,
        standing: config.ranks.standing(reputation_points),
        level,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_config(validate: Option<&Path>) -> Result<(), RunquestCliError> {
    match validate {
        Some(path) => {
            let config = EngineConfig::from_file(path)?;
            config.validate()?;
            println!("Configuration OK: {}", path.display());
        }
        None => println!("{}", EngineConfig::default().to_json_pretty()?),
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, RunquestCliError> {
    let config = match path {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn read_telemetry(input: &Path) -> Result<Vec<TelemetryRecord>, RunquestCliError> {
    let reader: Box<dyn BufRead> = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Box::new(io::Cursor::new(buffer))
    } else {
        Box::new(BufReader::new(fs::File::open(input)?))
    };

    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record = parse_record(trimmed)
            .map_err(|e| RunquestCliError::ParseError(format!("line {}: {}", index + 1, e)))?;
        records.push(record);
    }
    Ok(records)
}

fn parse_record(line: &str) -> Result<TelemetryRecord, String> {
    let record: TelemetryRecord = serde_json::from_str(line).map_err(|e| e.to_string())?;
    if !(0.0..=MAX_DURATION_SECS).contains(&record.t) {
        return Err(format!(
            "t must be within 0-{MAX_DURATION_SECS} seconds, got {}",
            record.t
        ));
    }
    Ok(record)
}

#[derive(Debug)]
enum RunquestCliError {
    Io(io::Error),
    Engine(EngineError),
    Store(StoreError),
    Json(serde_json::Error),
    Time(chrono::ParseError),
    NoSamples,
    InvalidArgs(String),
    ParseError(String),
}

impl From<io::Error> for RunquestCliError {
    fn from(e: io::Error) -> Self {
        RunquestCliError::Io(e)
    }
}

impl From<EngineError> for RunquestCliError {
    fn from(e: EngineError) -> Self {
        RunquestCliError::Engine(e)
    }
}

impl From<StoreError> for RunquestCliError {
    fn from(e: StoreError) -> Self {
        RunquestCliError::Store(e)
    }
}

impl From<serde_json::Error> for RunquestCliError {
    fn from(e: serde_json::Error) -> Self {
        RunquestCliError::Json(e)
    }
}

impl From<chrono::ParseError> for RunquestCliError {
    fn from(e: chrono::ParseError) -> Self {
        RunquestCliError::Time(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<RunquestCliError> for CliError {
    fn from(e: RunquestCliError) -> Self {
        match e {
            RunquestCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            RunquestCliError::Engine(EngineError::InvalidConfig(msg)) => CliError {
                code: "INVALID_CONFIG".to_string(),
                message: msg,
                hint: Some("Run 'runquest config' to see a valid configuration".to_string()),
            },
            RunquestCliError::Engine(e) => CliError {
                code: "ENGINE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            RunquestCliError::Store(e) => CliError {
                code: "STORE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the state directory contents".to_string()),
            },
            RunquestCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            RunquestCliError::Time(e) => CliError {
                code: "TIME_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Use RFC 3339, e.g. 2026-03-10T07:30:00Z".to_string()),
            },
            RunquestCliError::NoSamples => CliError {
                code: "NO_SAMPLES".to_string(),
                message: "No telemetry samples found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            RunquestCliError::InvalidArgs(msg) => CliError {
                code: "INVALID_ARGS".to_string(),
                message: msg,
                hint: Some("See 'runquest --help'".to_string()),
            },
            RunquestCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some(
                    r#"Each line must look like {"t": 12.0, "hr": 142, "cadence": 168}"#
                        .to_string(),
                ),
            },
        }
    }
}
