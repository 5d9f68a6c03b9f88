use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use yafv::{FhirValidator, FhirVersion, IssueSeverity, OperationOutcome, TypeKind, ValidatorConfig};

#[derive(Parser)]
#[command(name = "yafv")]
#[command(about = "Structural validator for FHIR resources")]
#[command(version)]
struct Cli {
    /// Configuration file (JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// FHIR version (r4, r4b, r5)
    #[arg(long, global = true)]
    fhir_version: Option<String>,
    /// Directory of schema documents to use instead of the embedded catalog
    #[arg(long, global = true)]
    catalog_dir: Option<PathBuf>,
    /// Report unknown properties as errors
    #[arg(long, global = true)]
    strict: bool,
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate FHIR resources stored as JSON files
    Validate {
        /// Resource files
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// List the types known to the catalog
    Types {
        /// Only list resource types
        #[arg(long)]
        resources: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;
    let validator = FhirValidator::from_config(&config).context("failed to load schema catalog")?;

    match cli.command {
        Commands::Validate { files, format } => {
            let mut failed = false;
            for file in &files {
                let outcome = validate_file(&validator, file)?;
                failed |= !outcome.is_valid();
                print_outcome(file, &outcome, format)?;
            }
            if failed {
                std::process::exit(1);
            }
        }
        Commands::Types { resources } => {
            let catalog = validator.catalog();
            for name in catalog.type_names() {
                let Some(schema) = catalog.get(name) else {
                    continue;
                };
                if resources && schema.kind() != TypeKind::Resource {
                    continue;
                }
                println!("{name} ({})", schema.kind().as_str());
            }
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<ValidatorConfig> {
    let mut config = match &cli.config {
        Some(path) => ValidatorConfig::from_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => ValidatorConfig::default(),
    };

    if let Some(version) = &cli.fhir_version {
        match FhirVersion::parse(version) {
            Some(version) => config.fhir_version = version,
            None => bail!("unsupported FHIR version '{version}' (expected r4, r4b or r5)"),
        }
    }
    if let Some(dir) = &cli.catalog_dir {
        config = config.with_catalog_dir(dir);
    }
    if cli.strict {
        config = config.with_strict_mode(true);
    }
    Ok(config)
}

fn validate_file(validator: &FhirValidator, file: &Path) -> Result<OperationOutcome> {
    let content =
        std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
    let resource: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;
    Ok(validator.validate(&resource)?)
}

fn print_outcome(file: &Path, outcome: &OperationOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(outcome)?),
        OutputFormat::Text => {
            if outcome.issue.is_empty() {
                println!("✅ {}: valid", file.display());
                return Ok(());
            }
            let marker = if outcome.is_valid() { "⚠️" } else { "❌" };
            println!(
                "{marker} {}: {} error(s), {} warning(s)",
                file.display(),
                outcome.error_count(),
                outcome.warning_count()
            );
            for issue in &outcome.issue {
                let severity = match issue.severity {
                    IssueSeverity::Fatal => "FATAL",
                    IssueSeverity::Error => "ERROR",
                    IssueSeverity::Warning => "WARN",
                    IssueSeverity::Information => "INFO",
                };
                println!("  {severity} [{}]: {}", issue.code, issue.diagnostics());
                for expression in &issue.expression {
                    println!("    at: {expression}");
                }
            }
        }
    }
    Ok(())
}
