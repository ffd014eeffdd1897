//! Churn CLI - Command-line interface for churn-flux
//!
//! Commands:
//! - predict: Score one customer record (JSON or interactive prompt)
//! - batch: Score every row of a CSV file
//! - fit: Produce scaling parameters and training schema from a labeled CSV
//! - evaluate: Compare model artifacts on a labeled CSV
//! - importance: Rank schema columns by model importance
//! - doctor: Diagnose artifact health and configuration
//! - schema: Print the expected raw record fields

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use churn_flux::dataset;
use churn_flux::importance::FeatureImportance;
use churn_flux::metrics::compare_models;
use churn_flux::schema::{FieldKind, FieldSpec, RECORD_FIELDS, TOTAL_CHARGES};
use churn_flux::{
    fit_preprocessing, ArtifactBundle, ChurnConfig, ChurnError, ChurnPredictor, CustomerRecord,
    FieldValue, ModelAdapter, ScalingParameters, TrainingSchema, CHURN_VERSION, PRODUCER_NAME,
};

/// Churn - Customer churn inference against frozen training artifacts
#[derive(Parser)]
#[command(name = "churn")]
#[command(version = CHURN_VERSION)]
#[command(about = "Predict telecom customer churn", long_about = None)]
struct Cli {
    /// Configuration file (JSON); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Model artifact path (overrides the configuration)
    #[arg(long, global = true)]
    model_path: Option<PathBuf>,

    /// Scaling parameters path (overrides the configuration)
    #[arg(long, global = true)]
    scaler_path: Option<PathBuf>,

    /// Training schema path (overrides the configuration)
    #[arg(long, global = true)]
    schema_path: Option<PathBuf>,

    /// Fail on records missing a numeric column instead of skipping scaling
    #[arg(long, global = true)]
    strict_scaling: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one customer record
    Predict {
        /// JSON record file (use - for stdin); prompts interactively when omitted on a TTY
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output the full JSON report
        #[arg(long)]
        json: bool,
    },

    /// Score every row of a CSV file
    Batch {
        /// Input CSV with a header row
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Fit scaling parameters and the training schema from a labeled CSV
    Fit {
        /// Training CSV with a header row
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the scaling parameters
        #[arg(long, default_value = "models/scaler.json")]
        scaler_out: PathBuf,

        /// Where to write the training schema
        #[arg(long, default_value = "models/feature_columns.json")]
        schema_out: PathBuf,
    },

    /// Compare model artifacts on a labeled CSV
    Evaluate {
        /// Labeled CSV with a Churn column
        #[arg(short, long)]
        input: PathBuf,

        /// Model to evaluate as NAME=PATH (repeatable); defaults to the configured model
        #[arg(long = "model", value_parser = parse_named_model)]
        models: Vec<(String, PathBuf)>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rank schema columns by model importance
    Importance {
        /// Number of columns to list
        #[arg(long, default_value = "10")]
        top: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose artifact health and configuration
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the expected raw record fields and allowed values
    Schema {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    init_tracing();
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

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("churn_flux=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), ChurnCliError> {
    let config = resolve_config(&cli)?;

    match cli.command {
        Commands::Predict { input, json } => cmd_predict(&config, input.as_deref(), json),
        Commands::Batch { input, output } => cmd_batch(&config, &input, &output),
        Commands::Fit {
            input,
            scaler_out,
            schema_out,
        } => cmd_fit(&input, &scaler_out, &schema_out),
        Commands::Evaluate {
            input,
            models,
            json,
        } => cmd_evaluate(&config, &input, models, json),
        Commands::Importance { top, json } => cmd_importance(&config, top, json),
        Commands::Doctor { json } => cmd_doctor(&config, cli.config.as_deref(), json),
        Commands::Schema { json } => cmd_schema(json),
    }
}

/// Configuration file values with command-line overrides applied
fn resolve_config(cli: &Cli) -> Result<ChurnConfig, ChurnCliError> {
    let mut config = ChurnConfig::load_or_default(cli.config.as_deref())?;
    if let Some(path) = &cli.model_path {
        config.artifacts.model = path.clone();
    }
    if let Some(path) = &cli.scaler_path {
        config.artifacts.scaling = path.clone();
    }
    if let Some(path) = &cli.schema_path {
        config.artifacts.schema = path.clone();
    }
    if cli.strict_scaling {
        config.strict_scaling = true;
    }
    Ok(config)
}

fn cmd_predict(
    config: &ChurnConfig,
    input: Option<&Path>,
    json: bool,
) -> Result<(), ChurnCliError> {
    let predictor = ChurnPredictor::from_config(config)?;

    let record = match input {
        Some(path) if path != Path::new("-") => {
            CustomerRecord::from_json(&fs::read_to_string(path)?)?
        }
        None if atty::is(atty::Stream::Stdin) => prompt_record()?,
        _ => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            CustomerRecord::from_json(&buffer)?
        }
    };

    let report = predictor.report(record)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let result = &report.result;
        println!("Prediction:        {}", result.label);
        println!("Churn probability: {:.1}%", result.churn_probability * 100.0);
        println!("Stay probability:  {:.1}%", result.no_churn_probability * 100.0);
        println!("Risk tier:         {}", report.risk_tier.as_str());
        if !report.unscaled.is_empty() {
            println!(
                "Note: numeric values left unscaled, missing {}",
                report.unscaled.join(", ")
            );
        }
    }

    Ok(())
}

fn cmd_batch(config: &ChurnConfig, input: &Path, output: &Path) -> Result<(), ChurnCliError> {
    let predictor = ChurnPredictor::from_config(config)?;
    let records = dataset::read_records(input)?;
    if records.is_empty() {
        return Err(ChurnCliError::NoRecords);
    }

    let rows = predictor.predict_batch(records)?;

    if output == Path::new("-") {
        dataset::write_predictions(io::stdout().lock(), &rows)?;
    } else {
        dataset::write_predictions(fs::File::create(output)?, &rows)?;
    }
    info!(rows = rows.len(), output = %output.display(), "Wrote predictions");

    Ok(())
}

fn cmd_fit(input: &Path, scaler_out: &Path, schema_out: &Path) -> Result<(), ChurnCliError> {
    let records = dataset::read_records(input)?;
    let (scaling, schema) = fit_preprocessing(records)?;

    for path in [scaler_out, schema_out] {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
    }
    scaling.save(scaler_out)?;
    schema.save(schema_out)?;

    println!("Scaling parameters: {}", scaler_out.display());
    for column in scaling.columns() {
        println!("  {:<16} mean {:>10.4}  scale {:>10.4}", column.column, column.mean, column.scale);
    }
    println!("Training schema:    {} ({} columns)", schema_out.display(), schema.len());

    Ok(())
}

fn cmd_evaluate(
    config: &ChurnConfig,
    input: &Path,
    models: Vec<(String, PathBuf)>,
    json: bool,
) -> Result<(), ChurnCliError> {
    let scaling = ScalingParameters::load(&config.artifacts.scaling)?;
    let schema = TrainingSchema::load(&config.artifacts.schema)?;

    let models = if models.is_empty() {
        vec![("model".to_string(), config.artifacts.model.clone())]
    } else {
        models
    };
    let models = models
        .into_iter()
        .map(|(name, path)| Ok((name, ModelAdapter::load(&path)?)))
        .collect::<Result<Vec<_>, ChurnError>>()?;

    let (records, labels) = dataset::read_labeled(input)?;
    if records.is_empty() {
        return Err(ChurnCliError::NoRecords);
    }

    let rows = compare_models(
        &models,
        &records,
        &labels,
        &scaling,
        &schema,
        config.strict_scaling,
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!(
            "{:<20} {:>9} {:>9} {:>9} {:>9} {:>9}",
            "model", "accuracy", "precision", "recall", "f1", "auc"
        );
        for row in &rows {
            let m = &row.metrics;
            let auc = m.auc.map_or_else(|| "n/a".to_string(), |a| format!("{a:.4}"));
            println!(
                "{:<20} {:>9.4} {:>9.4} {:>9.4} {:>9.4} {:>9}",
                row.name, m.accuracy, m.precision, m.recall, m.f1, auc
            );
        }
    }

    Ok(())
}

fn cmd_importance(config: &ChurnConfig, top: usize, json: bool) -> Result<(), ChurnCliError> {
    let bundle = ArtifactBundle::load(&config.artifacts)?;
    let ranking = FeatureImportance::from_model(&bundle.model, &bundle.schema)?;

    if json {
        let report = ImportanceReport {
            model: bundle.model.kind().to_string(),
            top: ranking.top(top).to_vec(),
            numeric_share: ranking.numeric_share(),
            categorical_share: ranking.categorical_share(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Top {} features ({} model)", top, bundle.model.kind());
        for (i, feature) in ranking.top(top).iter().enumerate() {
            println!("  {:>2}. {:<40} {:.4}", i + 1, feature.column, feature.importance);
        }
        println!();
        println!("Numeric share:     {:.1}%", ranking.numeric_share() * 100.0);
        println!("Categorical share: {:.1}%", ranking.categorical_share() * 100.0);
    }

    Ok(())
}

fn cmd_doctor(
    config: &ChurnConfig,
    config_file: Option<&Path>,
    json: bool,
) -> Result<(), ChurnCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "churn_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("churn-flux version {}", CHURN_VERSION),
    });

    checks.push(match config_file {
        Some(path) => DoctorCheck::ok("config", format!("loaded {}", path.display())),
        None => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: "No configuration file, using default artifact paths".to_string(),
        },
    });

    let model = match ModelAdapter::load(&config.artifacts.model) {
        Ok(model) => {
            checks.push(DoctorCheck::ok(
                "model",
                format!("{} model, {} features", model.kind(), model.feature_count()),
            ));
            Some(model)
        }
        Err(e) => {
            checks.push(DoctorCheck::error("model", e.to_string()));
            None
        }
    };

    match ScalingParameters::load(&config.artifacts.scaling) {
        Ok(scaling) => {
            let columns: Vec<&str> = scaling.columns().iter().map(|c| c.column.as_str()).collect();
            checks.push(DoctorCheck::ok("scaler", format!("scales {}", columns.join(", "))));
        }
        Err(e) => checks.push(DoctorCheck::error("scaler", e.to_string())),
    }

    let schema = match TrainingSchema::load(&config.artifacts.schema) {
        Ok(schema) => {
            checks.push(DoctorCheck::ok("schema", format!("{} columns", schema.len())));
            Some(schema)
        }
        Err(e) => {
            checks.push(DoctorCheck::error("schema", e.to_string()));
            None
        }
    };

    if let (Some(model), Some(schema)) = (&model, &schema) {
        if model.feature_count() == schema.len() {
            checks.push(DoctorCheck::ok(
                "feature_count",
                "model and schema agree on feature count".to_string(),
            ));
        } else {
            checks.push(DoctorCheck::error(
                "feature_count",
                format!(
                    "model expects {} features but schema lists {}",
                    model.feature_count(),
                    schema.len()
                ),
            ));
        }
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck::ok("stdin", "stdin is a TTY (interactive predict available)".to_string())
    } else {
        DoctorCheck::ok("stdin", "stdin is a pipe (JSON records read from input)".to_string())
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: CHURN_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Churn Doctor Report");
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

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(ChurnCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(json: bool) -> Result<(), ChurnCliError> {
    if json {
        let fields: Vec<serde_json::Value> = RECORD_FIELDS
            .iter()
            .map(|field| match field.kind {
                FieldKind::Categorical(choices) => serde_json::json!({
                    "name": field.name,
                    "label": field.label,
                    "type": "categorical",
                    "values": choices,
                }),
                FieldKind::Numeric { min, max, default } => serde_json::json!({
                    "name": field.name,
                    "label": field.label,
                    "type": "numeric",
                    "min": min,
                    "max": max,
                    "default": default,
                }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&fields)?);
        return Ok(());
    }

    println!("Customer record fields");
    println!();
    for field in RECORD_FIELDS {
        match field.kind {
            FieldKind::Categorical(choices) => {
                println!("  {:<18} {}", field.name, choices.join(" | "));
            }
            FieldKind::Numeric { min, max, .. } => {
                println!("  {:<18} number in [{}, {}]", field.name, min, max);
            }
        }
    }
    println!();
    println!("{TOTAL_CHARGES} is optional; the interactive prompt derives it as tenure × MonthlyCharges.");
    println!("customerID is accepted and ignored for prediction.");

    Ok(())
}

// Interactive input

fn prompt_record() -> Result<CustomerRecord, ChurnCliError> {
    let stdin = io::stdin();
    let mut stderr = io::stderr();
    let mut record = CustomerRecord::new();

    for field in RECORD_FIELDS {
        let default = field.default_value();
        match field.kind {
            FieldKind::Categorical(choices) => {
                write!(stderr, "{} [{}] ({}): ", field.label, choices.join("/"), default)?
            }
            FieldKind::Numeric { min, max, .. } => {
                write!(stderr, "{} [{}-{}] ({}): ", field.label, min, max, default)?
            }
        }
        stderr.flush()?;

        let mut line = String::new();
        stdin.lock().read_line(&mut line)?;
        let answer = match line.trim() {
            "" => default.as_str(),
            answer => answer,
        };
        record.insert(field.name, parse_answer(field, answer)?);
    }

    let number = |name: &str| record.get(name).and_then(FieldValue::as_number).unwrap_or(0.0);
    let total = number("tenure") * number("MonthlyCharges");
    record.insert(TOTAL_CHARGES, total);

    Ok(record)
}

fn parse_answer(field: &FieldSpec, answer: &str) -> Result<FieldValue, ChurnCliError> {
    match field.kind {
        FieldKind::Categorical(choices) => choices
            .iter()
            .find(|c| c.eq_ignore_ascii_case(answer))
            .map(|c| FieldValue::from(*c))
            .ok_or_else(|| {
                ChurnCliError::InvalidInput(format!(
                    "{} must be one of: {}",
                    field.label,
                    choices.join(", ")
                ))
            }),
        FieldKind::Numeric { min, max, .. } => {
            let value: f64 = answer.parse().map_err(|_| {
                ChurnCliError::InvalidInput(format!("{} must be a number", field.label))
            })?;
            if !(min..=max).contains(&value) {
                return Err(ChurnCliError::InvalidInput(format!(
                    "{} must be between {} and {}",
                    field.label, min, max
                )));
            }
            Ok(FieldValue::Number(value))
        }
    }
}

fn parse_named_model(s: &str) -> Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=PATH, got {s:?}")),
    }
}

// Error types

#[derive(Debug)]
enum ChurnCliError {
    Io(io::Error),
    Churn(ChurnError),
    Json(serde_json::Error),
    InvalidInput(String),
    NoRecords,
    DoctorFailed,
}

impl From<io::Error> for ChurnCliError {
    fn from(e: io::Error) -> Self {
        ChurnCliError::Io(e)
    }
}

impl From<ChurnError> for ChurnCliError {
    fn from(e: ChurnError) -> Self {
        ChurnCliError::Churn(e)
    }
}

impl From<serde_json::Error> for ChurnCliError {
    fn from(e: serde_json::Error) -> Self {
        ChurnCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(code: &str, message: String, hint: &str) -> Self {
        CliError {
            code: code.to_string(),
            message,
            hint: Some(hint.to_string()),
        }
    }
}

impl From<ChurnCliError> for CliError {
    fn from(e: ChurnCliError) -> Self {
        match e {
            ChurnCliError::Io(e) => {
                CliError::new("IO_ERROR", e.to_string(), "Check file paths and permissions")
            }
            ChurnCliError::Json(e) => CliError::new("JSON_ERROR", e.to_string(), "Check JSON syntax"),
            ChurnCliError::InvalidInput(msg) => {
                CliError::new("INVALID_INPUT", msg, "Run 'churn schema' for allowed values")
            }
            ChurnCliError::NoRecords => CliError::new(
                "NO_RECORDS",
                "No records found in input".to_string(),
                "Ensure the CSV has a header row and at least one data row",
            ),
            ChurnCliError::DoctorFailed => CliError::new(
                "DOCTOR_FAILED",
                "One or more health checks failed".to_string(),
                "Review the doctor report for details",
            ),
            ChurnCliError::Churn(e) => {
                let message = e.to_string();
                match e {
                    ChurnError::ModelLoad { .. } => CliError::new(
                        "MODEL_LOAD_ERROR",
                        message,
                        "Point --model-path at an exported model artifact",
                    ),
                    ChurnError::ArtifactLoad { .. } | ChurnError::InvalidArtifact(_) => {
                        CliError::new(
                            "ARTIFACT_ERROR",
                            message,
                            "Run 'churn fit' to regenerate the scaler and schema artifacts",
                        )
                    }
                    ChurnError::FeatureCount { .. } => CliError::new(
                        "FEATURE_MISMATCH",
                        message,
                        "Model and schema must come from the same training run",
                    ),
                    ChurnError::IncompleteNumeric(_) => CliError::new(
                        "INCOMPLETE_NUMERIC",
                        message,
                        "Provide tenure, MonthlyCharges and TotalCharges or drop --strict-scaling",
                    ),
                    ChurnError::InvalidLabel { .. } => CliError::new(
                        "INVALID_LABEL",
                        message,
                        "Churn labels must be Yes/No or 1/0",
                    ),
                    ChurnError::Dataset(_) => {
                        CliError::new("DATASET_ERROR", message, "Check the CSV file format")
                    }
                    ChurnError::Config(_) => {
                        CliError::new("CONFIG_ERROR", message, "Check the configuration file")
                    }
                    ChurnError::Json(_) | ChurnError::InvalidRecord(_) => CliError::new(
                        "INVALID_RECORD",
                        message,
                        "Records must be flat JSON objects of customer fields",
                    ),
                    ChurnError::Io(_) => {
                        CliError::new("IO_ERROR", message, "Check file paths and permissions")
                    }
                }
            }
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ImportanceReport {
    model: String,
    top: Vec<churn_flux::importance::RankedFeature>,
    numeric_share: f64,
    categorical_share: f64,
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

impl DoctorCheck {
    fn ok(name: &str, message: String) -> Self {
        DoctorCheck {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message,
        }
    }

    fn error(name: &str, message: String) -> Self {
        DoctorCheck {
            name: name.to_string(),
            status: CheckStatus::Error,
            message,
        }
    }
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
