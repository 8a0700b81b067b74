//! div2csv CLI - extract HTML records into a CSV file.
//!
//! Usage: `div2csv <HTML_FILE> <SPEC_FILE> <OUTPUT_FILE>`

use std::fs;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use div2csv::{
    extract_file, ExtractOptions, RecordPolicy, Specification, DEFAULT_CONTEXT_LIMIT,
    DEFAULT_MISSING_VALUE,
};

#[derive(Parser)]
#[command(name = "div2csv")]
#[command(
    version,
    about = "Extract repeated HTML records into CSV using an XPath column specification",
    long_about = None
)]
struct Cli {
    /// HTML file containing the records
    html_file: PathBuf,

    /// JSON specification mapping columns to XPaths
    spec_file: PathBuf,

    /// CSV file to write
    output_file: PathBuf,

    /// Skip records missing a required column instead of failing the run
    #[arg(long)]
    skip_invalid: bool,

    /// Cell value for optional columns with no match
    #[arg(long, default_value = DEFAULT_MISSING_VALUE)]
    missing_value: String,

    /// Maximum characters of record text shown in missing-column errors
    #[arg(long, default_value_t = DEFAULT_CONTEXT_LIMIT)]
    context_limit: usize,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stdout().is_terminal())
        .without_time()
        .init();
}

fn run(cli: &Cli) -> div2csv::Result<()> {
    let spec = Specification::from_path(&cli.spec_file)?;
    info!(
        "Loaded specification with {} columns.",
        spec.visible_column_count()
    );

    let options = ExtractOptions {
        missing_value: cli.missing_value.clone(),
        on_invalid_record: if cli.skip_invalid {
            RecordPolicy::Skip
        } else {
            RecordPolicy::Abort
        },
        context_limit: cli.context_limit,
        ..ExtractOptions::default()
    };

    let table = extract_file(&cli.html_file, &spec, &options)?;
    info!("Parsed {} records from HTML.", table.len());

    // The whole table is serialized before the output file is touched.
    let csv = table.to_csv_string()?;
    fs::write(&cli.output_file, csv)?;
    info!("CSV saved to {}", cli.output_file.display());
    Ok(())
}
