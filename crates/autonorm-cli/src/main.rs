//! autonorm CLI - automated 3NF schema synthesis from raw tabular files.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use autonorm::config::ProfilingConfig;
use autonorm::ddl::{dialect_for, render_ddl};
use autonorm::erd::render_mermaid;
use autonorm::profile::{find_candidate_keys, profile_columns};
use autonorm::{load_dir, Config, NormalizeError, NormalizedTable, Pipeline, RunResult};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "autonorm")]
#[command(about = "Automated 3NF schema synthesis from raw tabular files")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output the JSON run report to stdout
    #[arg(long)]
    output_json: bool,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a directory of CSV/JSON files into a 3NF schema
    Run {
        /// Directory of input files
        #[arg(short, long)]
        input: PathBuf,

        /// Directory for normalized tables, DDL script, ERD and run report
        #[arg(short, long, default_value = "./normalized_output")]
        output: PathBuf,

        /// Target SQL dialect: postgres or oracle
        #[arg(long, default_value = "postgres")]
        dialect: String,
    },

    /// Load and profile input files without rewriting them
    Profile {
        /// Directory of input files
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> Result<(), NormalizeError> {
    let cli = Cli::parse();
    setup_logging(&cli.verbosity)?;

    let config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::default(),
    };

    match cli.command {
        Commands::Run {
            input,
            output,
            dialect,
        } => run_pipeline(&config, &input, &output, &dialect, cli.output_json),
        Commands::Profile { input } => profile_inputs(&config, &input),
    }
}

fn run_pipeline(
    config: &Config,
    input: &Path,
    output: &Path,
    dialect_name: &str,
    output_json: bool,
) -> Result<(), NormalizeError> {
    let dialect = dialect_for(dialect_name).ok_or_else(|| {
        NormalizeError::Config(format!(
            "unknown dialect '{}', expected postgres or oracle",
            dialect_name
        ))
    })?;

    let loaded = load_dir(input)?;
    if loaded.tables.is_empty() {
        return Err(NormalizeError::input(
            input.display().to_string(),
            "no readable CSV/JSON tables found",
        ));
    }

    let result = Pipeline::new(config.clone()).run(loaded.tables);

    fs::create_dir_all(output)?;
    write_tables(&result.tables, &output.join("tables"))?;
    fs::write(
        output.join("schema.sql"),
        render_ddl(&result.tables, &result.relationships, dialect.as_ref()),
    )?;
    fs::write(
        output.join("schema.mmd"),
        render_mermaid(&result.tables, &result.relationships),
    )?;
    fs::write(
        output.join("report.json"),
        serde_json::to_string_pretty(&result)?,
    )?;

    print_summary(&result, loaded.failures.len());
    if output_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    if result.status == "failed" {
        return Err(NormalizeError::Verification(format!(
            "run {} failed: {} attribute(s) lost, failed tables: {}",
            result.run_id,
            result.attributes_lost,
            result.failed_tables.join(", ")
        )));
    }
    Ok(())
}

fn write_tables(tables: &[NormalizedTable], dir: &Path) -> Result<(), NormalizeError> {
    fs::create_dir_all(dir)?;
    for table in tables {
        let mut writer = csv::Writer::from_path(dir.join(format!("{}.csv", table.name)))?;
        writer.write_record(table.column_names())?;
        for row in &table.rows {
            writer.write_record(row.iter().map(|v| v.key()))?;
        }
        writer.flush()?;
    }
    Ok(())
}

fn profile_inputs(config: &Config, input: &Path) -> Result<(), NormalizeError> {
    let loaded = load_dir(input)?;
    if loaded.tables.is_empty() {
        return Err(NormalizeError::input(
            input.display().to_string(),
            "no readable CSV/JSON tables found",
        ));
    }

    let profiling: &ProfilingConfig = &config.profiling;
    let mut report = Vec::new();
    for table in &loaded.tables {
        let profiles = profile_columns(table, profiling);
        let keys = find_candidate_keys(table, &profiles, profiling);
        report.push(serde_json::json!({
            "table": table.name,
            "rows": table.row_count(),
            "columns": profiles,
            "candidate_keys": keys,
        }));
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn print_summary(result: &RunResult, load_failures: usize) {
    eprintln!("Run {} ({})", result.run_id, result.status);
    eprintln!(
        "  tables: {} in, {} out ({} failed, {} unreadable file(s))",
        result.tables_in,
        result.tables_out,
        result.failed_tables.len(),
        load_failures
    );
    eprintln!(
        "  foreign keys: {} accepted, {} skipped",
        result.foreign_keys_accepted, result.foreign_keys_skipped
    );
    eprintln!(
        "  attributes: {} preserved, {} lost",
        result.attributes_preserved, result.attributes_lost
    );
    for skipped in &result.skipped_relationships {
        eprintln!(
            "  skipped {}.{} → {}.{}: {}",
            skipped.table, skipped.column, skipped.ref_table, skipped.ref_column, skipped.reason
        );
    }
    if !result.verification.errors.is_empty() {
        eprintln!("  verification errors:");
        for error in &result.verification.errors {
            eprintln!("    {}", error);
        }
    }
}

fn setup_logging(verbosity: &str) -> Result<(), NormalizeError> {
    let filter = match verbosity {
        "debug" | "info" | "warn" | "error" => format!("autonorm={}", verbosity),
        other => {
            return Err(NormalizeError::Config(format!(
                "invalid verbosity '{}', expected debug, info, warn or error",
                other
            )))
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
