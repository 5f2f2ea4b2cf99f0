//! Wellness CLI - Command-line interface for Wellness Core
//!
//! Commands:
//! - submit: Anonymize and record one reflection
//! - insights / risk / plan: Read-side views for one account
//! - team: Assess a precomputed team roll-up
//! - labor / analytics: Record emotional labor and summarize it
//! - attest / verify: Issue and check attestation receipts
//! - doctor: Diagnose configuration and storage

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use wellness_core::attestation::{AttestationType, Comparison, ThresholdCriterion};
use wellness_core::burnout::{InsufficientDataPolicy, TeamRiskRollup};
use wellness_core::emotional_labor::EmotionalLaborSession;
use wellness_core::identity::{IdentityHasher, MIN_SECRET_LEN};
use wellness_core::types::{MetricName, TimeRange};
use wellness_core::{
    AnalyticsError, SqliteStore, WellnessAnalytics, WellnessConfig, PRODUCER_NAME,
    WELLNESS_VERSION,
};

/// Database file used when the configuration names none
const DEFAULT_DATABASE: &str = "wellness.db";

/// Environment variable holding the log filter
const LOG_ENV: &str = "WELLNESS_LOG";

/// Wellness - privacy-preserving wellness analytics for interpreters
#[derive(Parser)]
#[command(name = "wellness")]
#[command(version = WELLNESS_VERSION)]
#[command(about = "De-identified wellness analytics for interpreter reflections", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./wellness.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides the configuration)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Anonymize and record one reflection
    Submit {
        /// Account identifier (hashed before anything is stored)
        #[arg(short, long)]
        account: String,

        /// Reflection type hint, e.g. "pre_assignment_prep"
        #[arg(short = 't', long = "type")]
        type_hint: String,

        /// JSON object with the raw fields (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Recent buckets, pattern codes, and the latest week's summary
    Insights {
        #[arg(short, long)]
        account: String,
    },

    /// Burnout risk assessment
    Risk {
        #[arg(short, long)]
        account: String,

        /// Behavior with fewer than three weeks of history
        #[arg(long)]
        policy: Option<PolicyArg>,
    },

    /// Intervention plan derived from the current risk assessment
    Plan {
        #[arg(short, long)]
        account: String,
    },

    /// Assess a team roll-up (JSON, use - for stdin)
    Team {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Quantify and record one emotional labor session
    Labor {
        #[arg(short, long)]
        account: String,

        /// Session JSON (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Summarize recorded emotional labor
    Analytics {
        #[arg(short, long)]
        account: String,

        /// Days to look back from now
        #[arg(long, default_value = "30")]
        days: i64,
    },

    /// Issue an attestation receipt
    Attest {
        #[arg(short, long)]
        account: String,

        /// Attestation type
        #[arg(short = 't', long = "type", value_parser = parse_attestation_type)]
        attestation_type: AttestationType,

        /// Validity window in hours (defaults to the configured window)
        #[arg(long)]
        validity_hours: Option<u32>,

        /// Metric for a threshold proof
        #[arg(long, value_parser = parse_metric)]
        metric: Option<MetricName>,

        /// Comparison for a threshold proof
        #[arg(long, default_value = "below")]
        comparison: ComparisonArg,

        /// Threshold value for a threshold proof
        #[arg(long)]
        threshold: Option<f64>,

        /// Consecutive weeks for a threshold proof
        #[arg(long, default_value = "4")]
        weeks: u32,
    },

    /// Verify an attestation receipt
    Verify {
        /// Receipt identifier
        receipt_id: String,

        /// Verifier account identifier (hashed)
        #[arg(long)]
        verifier: Option<String>,
    },

    /// Diagnose configuration and storage
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum PolicyArg {
    /// Report that history is insufficient
    Report,
    /// Return a provisional moderate default
    Provisional,
}

impl From<PolicyArg> for InsufficientDataPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Report => InsufficientDataPolicy::Report,
            PolicyArg::Provisional => InsufficientDataPolicy::ProvisionalDefault,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum ComparisonArg {
    Below,
    Above,
}

impl From<ComparisonArg> for Comparison {
    fn from(arg: ComparisonArg) -> Self {
        match arg {
            ComparisonArg::Below => Comparison::Below,
            ComparisonArg::Above => Comparison::Above,
        }
    }
}

fn parse_attestation_type(label: &str) -> Result<AttestationType, String> {
    AttestationType::parse(label).ok_or_else(|| {
        let known: Vec<&str> = AttestationType::ALL.iter().map(|t| t.as_str()).collect();
        format!("unknown attestation type '{label}' (expected one of {})", known.join(", "))
    })
}

fn parse_metric(key: &str) -> Result<MetricName, String> {
    MetricName::parse(key).ok_or_else(|| format!("unknown metric '{key}'"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), WellnessCliError> {
    let config = load_config(cli.config.as_deref())?;

    if let Commands::Doctor { json } = cli.command {
        return cmd_doctor(&config, cli.database.as_deref(), json);
    }

    let service = open_service(config, cli.database.as_deref())?;

    match cli.command {
        Commands::Submit {
            account,
            type_hint,
            input,
        } => {
            let fields: serde_json::Value = serde_json::from_str(&read_input(&input)?)?;
            print_json(&service.submit_reflection(&account, &type_hint, &fields)?)
        }
        Commands::Insights { account } => print_json(&service.get_wellness_insights(&account)?),
        Commands::Risk { account, policy } => {
            print_json(&service.get_burnout_risk(&account, policy.map(Into::into))?)
        }
        Commands::Plan { account } => match service.get_intervention_plan(&account)? {
            Some(plan) => print_json(&plan),
            None => Err(WellnessCliError::NoAssessment),
        },
        Commands::Team { input } => {
            let rollup: TeamRiskRollup = serde_json::from_str(&read_input(&input)?)?;
            print_json(&service.assess_team_risk(&rollup)?)
        }
        Commands::Labor { account, input } => {
            let session: EmotionalLaborSession = serde_json::from_str(&read_input(&input)?)?;
            print_json(&service.record_emotional_labor(&account, &session)?)
        }
        Commands::Analytics { account, days } => {
            if days <= 0 {
                return Err(WellnessCliError::InvalidArgument(format!(
                    "--days must be positive, got {days}"
                )));
            }
            let range = TimeRange::last_days(Utc::now(), days);
            print_json(&service.get_emotional_labor_analytics(&account, range)?)
        }
        Commands::Attest {
            account,
            attestation_type,
            validity_hours,
            metric,
            comparison,
            threshold,
            weeks,
        } => {
            let receipt = if attestation_type == AttestationType::ThresholdProof {
                let (Some(metric), Some(threshold)) = (metric, threshold) else {
                    return Err(WellnessCliError::InvalidArgument(
                        "threshold proofs need --metric and --threshold".to_string(),
                    ));
                };
                let criterion = ThresholdCriterion {
                    metric,
                    comparison: comparison.into(),
                    threshold,
                    weeks,
                };
                service.issue_threshold_attestation(&account, &criterion, validity_hours)?
            } else {
                service.issue_attestation(&account, attestation_type, validity_hours)?
            };
            print_json(&receipt)
        }
        Commands::Verify {
            receipt_id,
            verifier,
        } => print_json(&service.verify_attestation(&receipt_id, verifier.as_deref())?),
        Commands::Doctor { .. } => Ok(()),
    }
}

fn load_config(path: Option<&Path>) -> Result<WellnessConfig, WellnessCliError> {
    let config = match path {
        Some(path) => {
            if !path.exists() {
                return Err(WellnessCliError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("config file {} not found", path.display()),
                )));
            }
            WellnessConfig::load_from_path(path)?
        }
        None => WellnessConfig::load()?,
    };
    Ok(config)
}

fn database_path(config: &WellnessConfig, override_path: Option<&Path>) -> PathBuf {
    override_path
        .map(Path::to_path_buf)
        .or_else(|| config.database_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE))
}

fn open_service(
    config: WellnessConfig,
    database: Option<&Path>,
) -> Result<WellnessAnalytics<SqliteStore>, WellnessCliError> {
    let path = database_path(&config, database);
    tracing::debug!(database = %path.display(), "Opening store");
    let store = SqliteStore::open(&path)?;
    Ok(WellnessAnalytics::init(config, store)?)
}

fn read_input(input: &Path) -> Result<String, WellnessCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), WellnessCliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_doctor(
    config: &WellnessConfig,
    database: Option<&Path>,
    json: bool,
) -> Result<(), WellnessCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Wellness Core version {}", WELLNESS_VERSION),
    });

    // Secret problems are reported without echoing the value
    let secret_check = match IdentityHasher::new(config.deployment_secret.as_deref()) {
        Ok(_) => DoctorCheck {
            name: "deployment_secret".to_string(),
            status: CheckStatus::Ok,
            message: "Deployment secret configured".to_string(),
        },
        Err(e) => DoctorCheck {
            name: "deployment_secret".to_string(),
            status: CheckStatus::Error,
            message: format!("{} (minimum length {})", e, MIN_SECRET_LEN),
        },
    };
    checks.push(secret_check);

    checks.push(match config.validate() {
        Ok(()) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "Attestation validity {}h, base rate {}, insufficient data policy {:?}",
                config.attestation.default_validity_hours,
                config.labor.default_base_rate,
                config.insufficient_data
            ),
        },
        Err(e) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        },
    });

    let path = database_path(config, database);
    let exists = path.exists();
    checks.push(match SqliteStore::open(&path) {
        Ok(_) if exists => DoctorCheck {
            name: "database".to_string(),
            status: CheckStatus::Ok,
            message: format!("Database {} is readable", path.display()),
        },
        Ok(_) => DoctorCheck {
            name: "database".to_string(),
            status: CheckStatus::Warning,
            message: format!("Database {} was created empty", path.display()),
        },
        Err(e) => DoctorCheck {
            name: "database".to_string(),
            status: CheckStatus::Error,
            message: format!("Cannot open database {}: {}", path.display(), e),
        },
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: WELLNESS_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Wellness Doctor Report");
        println!("======================");
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

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(WellnessCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum WellnessCliError {
    Io(io::Error),
    Analytics(AnalyticsError),
    Json(serde_json::Error),
    InvalidArgument(String),
    NoAssessment,
    DoctorFailed,
}

impl From<io::Error> for WellnessCliError {
    fn from(e: io::Error) -> Self {
        WellnessCliError::Io(e)
    }
}

impl From<AnalyticsError> for WellnessCliError {
    fn from(e: AnalyticsError) -> Self {
        WellnessCliError::Analytics(e)
    }
}

impl From<serde_json::Error> for WellnessCliError {
    fn from(e: serde_json::Error) -> Self {
        WellnessCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<WellnessCliError> for CliError {
    fn from(e: WellnessCliError) -> Self {
        match e {
            WellnessCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            WellnessCliError::Analytics(e) => {
                let (code, hint) = match &e {
                    AnalyticsError::Configuration(_) => (
                        "CONFIG_ERROR",
                        Some("Set WELLNESS_DEPLOYMENT_SECRET or deployment_secret in wellness.toml"),
                    ),
                    AnalyticsError::Validation(_) => ("VALIDATION_ERROR", None),
                    AnalyticsError::InsufficientData { .. } => (
                        "INSUFFICIENT_DATA",
                        Some("Submit check-ins over at least three weeks"),
                    ),
                    AnalyticsError::ThresholdNotMet(_) => ("THRESHOLD_NOT_MET", None),
                    AnalyticsError::Storage(_) => (
                        "STORAGE_ERROR",
                        Some("Run 'wellness doctor' to check the database"),
                    ),
                    AnalyticsError::Json(_) => ("JSON_ERROR", Some("Check JSON syntax")),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: hint.map(str::to_string),
                }
            }
            WellnessCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            WellnessCliError::InvalidArgument(msg) => CliError {
                code: "INVALID_ARGUMENT".to_string(),
                message: msg,
                hint: Some("Run 'wellness --help' for usage".to_string()),
            },
            WellnessCliError::NoAssessment => CliError {
                code: "INSUFFICIENT_DATA".to_string(),
                message: "Not enough weekly history for a risk assessment".to_string(),
                hint: Some("Submit check-ins over at least three weeks".to_string()),
            },
            WellnessCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

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
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
